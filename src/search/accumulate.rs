//! Category filtering and cap enforcement over decoded archives.
//!
//! Decoding and accumulation form one pull-based loop: rows are pulled from
//! the current archive only while the output is below the cap, and archives
//! after the one that fills the cap are never opened.

use bytes::Bytes;
use tracing::debug;

use crate::error::DecodeError;
use crate::models::PayRow;

use super::decode::{ArchiveDecoder, ArchiveFormat};
use super::filter::Category;

/// Collect up to `cap` rows of `category`, in archive order then file order.
pub fn accumulate<I>(
    archives: I,
    format: ArchiveFormat,
    category: Category,
    cap: usize,
) -> Result<Vec<PayRow>, DecodeError>
where
    I: IntoIterator<Item = Bytes>,
{
    let mut kept = Vec::new();
    if cap == 0 {
        return Ok(kept);
    }

    for (opened, buffer) in archives.into_iter().enumerate() {
        let mut decoder = ArchiveDecoder::open(buffer, format)?;
        for row in decoder.rows()? {
            let row = row?;
            if category.matches(&row.category_label) {
                kept.push(row);
                if kept.len() == cap {
                    debug!(archives_opened = opened + 1, cap, "row cap reached");
                    return Ok(kept);
                }
            }
        }
    }

    Ok(kept)
}
