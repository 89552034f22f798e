//! Query-parameter parsing into a typed filter.

use serde::Serialize;

use crate::error::ValidationError;

/// Remuneration category a search is restricted to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum Category {
    /// Every category.
    #[default]
    All,
    /// Base salary (`base`).
    Base,
    /// Additional remuneration and benefits (`outras`).
    Other,
    /// Deductions (`descontos`).
    Discount,
    /// Any other token. Tokens are case-sensitive, so `Base` lands here and
    /// matches no row.
    Unrecognized,
}

impl Category {
    /// Interpret a `categorias` token. Matching is case-sensitive and never fails.
    pub fn parse(token: &str) -> Self {
        match token {
            "" | "tudo" | "all" => Category::All,
            "base" => Category::Base,
            "outras" | "other" => Category::Other,
            "descontos" | "discount" => Category::Discount,
            _ => Category::Unrecognized,
        }
    }

    /// Label used in the archives' `categoria_contracheque` column.
    ///
    /// `All` and `Unrecognized` have no label of their own.
    pub fn label(self) -> Option<&'static str> {
        match self {
            Category::All | Category::Unrecognized => None,
            Category::Base => Some("base"),
            Category::Other => Some("outras"),
            Category::Discount => Some("descontos"),
        }
    }

    /// Whether a row carrying `label` belongs to this category.
    pub fn matches(self, label: &str) -> bool {
        match self {
            Category::All => true,
            Category::Unrecognized => false,
            known => known.label() == Some(label),
        }
    }
}

/// Validated search filter. Empty dimensions are unrestricted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Filter {
    /// Years (`anos`).
    pub years: Vec<i32>,
    /// Months (`meses`).
    pub months: Vec<i32>,
    /// Agency identifiers (`orgaos`).
    pub agencies: Vec<String>,
    /// Category (`categorias`).
    pub category: Category,
    /// Raw `tipos` value. Accepted but not used for filtering.
    pub types: Option<String>,
}

/// Parse the five raw query parameters.
///
/// Returns `Ok(None)` when every parameter is empty, which matches everything.
pub fn parse_filter(
    years: &str,
    months: &str,
    agencies: &str,
    category: &str,
    types: &str,
) -> Result<Option<Filter>, ValidationError> {
    if [years, months, agencies, category, types]
        .iter()
        .all(|value| value.is_empty())
    {
        return Ok(None);
    }

    Ok(Some(Filter {
        years: parse_int_list(years, "anos", "ano")?,
        months: parse_int_list(months, "meses", "mês")?,
        agencies: dedup(split_csv(agencies).map(str::to_string)),
        category: Category::parse(category),
        types: (!types.is_empty()).then(|| types.to_string()),
    }))
}

/// Resolve the category of an optional filter.
pub fn category_of(filter: Option<&Filter>) -> Category {
    filter.map(|f| f.category).unwrap_or_default()
}

fn split_csv(raw: &str) -> impl Iterator<Item = &str> {
    // An empty parameter means "unrestricted", not one empty token.
    raw.split(',').filter(move |_| !raw.is_empty())
}

fn parse_int_list(
    raw: &str,
    field: &'static str,
    label: &'static str,
) -> Result<Vec<i32>, ValidationError> {
    let values = split_csv(raw)
        .map(|token| {
            token
                .parse::<i32>()
                .map_err(|_| ValidationError::InvalidParameter {
                    field,
                    label,
                    token: token.to_string(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(dedup(values))
}

fn dedup<T: PartialEq>(values: impl IntoIterator<Item = T>) -> Vec<T> {
    let mut out: Vec<T> = Vec::new();
    for value in values {
        if !out.contains(&value) {
            out.push(value);
        }
    }
    out
}
