//! Parameterized query construction for the metadata index.
//!
//! The filter is lowered into a list of predicate descriptors, one per
//! restricted dimension, in the fixed order years → months → agencies. A
//! single renderer numbers the placeholders across all descriptors, so the
//! argument vector and the SQL text can never disagree about positions.
//!
//! Category is intentionally absent: every archive holds rows of all
//! categories, so narrowing in SQL would not save any fetch.

use std::fmt::Write as _;

use serde::Serialize;

use super::filter::Filter;

/// Columns selected from the index, aliased to the names `CandidateRecord` maps.
const BASE_QUERY: &str = "SELECT id_orgao AS orgao, mes, ano, \
linhas_descontos AS descontos, linhas_base AS base, linhas_outras AS outras, \
zip_url FROM remuneracoes_zips";

/// Index column holding the year.
pub const YEAR_COLUMN: &str = "ano";
/// Index column holding the month.
pub const MONTH_COLUMN: &str = "mes";
/// Index column holding the agency identifier.
pub const AGENCY_COLUMN: &str = "id_orgao";

/// One positional argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum QueryArg {
    /// Integer column value (year, month).
    Int(i32),
    /// Text column value (agency).
    Text(String),
}

/// SQL text plus its positional arguments, in placeholder order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuiltQuery {
    /// Rendered SQL with `$n` placeholders.
    pub sql: String,
    /// Arguments; `args[i]` binds `$i+1`.
    pub args: Vec<QueryArg>,
}

/// An `IN (...)` predicate over one column.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Predicate {
    column: &'static str,
    values: Vec<QueryArg>,
}

impl Predicate {
    fn placeholder_count(&self) -> usize {
        self.values.len()
    }
}

/// Build the index query for an optional filter.
pub fn build_query(filter: Option<&Filter>) -> BuiltQuery {
    let predicates = filter.map(predicates_for).unwrap_or_default();
    render(&predicates)
}

fn predicates_for(filter: &Filter) -> Vec<Predicate> {
    let ints = |values: &[i32]| -> Vec<QueryArg> {
        values.iter().copied().map(QueryArg::Int).collect()
    };
    [
        Predicate {
            column: YEAR_COLUMN,
            values: ints(&filter.years),
        },
        Predicate {
            column: MONTH_COLUMN,
            values: ints(&filter.months),
        },
        Predicate {
            column: AGENCY_COLUMN,
            values: filter.agencies.iter().cloned().map(QueryArg::Text).collect(),
        },
    ]
    .into_iter()
    .filter(|p| p.placeholder_count() > 0)
    .collect()
}

fn render(predicates: &[Predicate]) -> BuiltQuery {
    let mut sql = String::from(BASE_QUERY);
    let mut args: Vec<QueryArg> = Vec::new();

    for (i, predicate) in predicates.iter().enumerate() {
        sql.push_str(if i == 0 { " WHERE " } else { " AND " });
        let first = args.len() + 1;
        let placeholders = (first..first + predicate.placeholder_count())
            .map(|n| format!("${n}"))
            .collect::<Vec<_>>()
            .join(",");
        // Writing into a String cannot fail.
        let _ = write!(sql, "{} IN ({})", predicate.column, placeholders);
        args.extend(predicate.values.iter().cloned());
    }

    BuiltQuery { sql, args }
}
