//! Zip + CSV decoding of fetched archives.
//!
//! Each archive is a zip holding exactly one CSV file. The decoder opens the
//! resident buffer, checks the entry count, and hands out a lazy row iterator
//! over the single entry, so callers that stop early never inflate or parse
//! the rest of the file.

use std::io::Cursor;

use bytes::Bytes;
use zip::ZipArchive;

use crate::error::DecodeError;
use crate::models::PayRow;

/// Declared CSV dialect of an archive.
///
/// Older exports are comma-separated, current exports use semicolons. The
/// format is chosen by the retrieval path, never sniffed from the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArchiveFormat {
    /// Comma-delimited exports.
    Legacy,
    /// Semicolon-delimited exports.
    #[default]
    Current,
}

impl ArchiveFormat {
    /// Field delimiter byte.
    pub fn delimiter(self) -> u8 {
        match self {
            ArchiveFormat::Legacy => b',',
            ArchiveFormat::Current => b';',
        }
    }
}

/// An opened, validated archive.
pub struct ArchiveDecoder {
    archive: ZipArchive<Cursor<Bytes>>,
    format: ArchiveFormat,
}

impl std::fmt::Debug for ArchiveDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveDecoder")
            .field("entries", &self.archive.len())
            .field("format", &self.format)
            .finish()
    }
}

impl ArchiveDecoder {
    /// Open `buffer` as a single-entry zip archive.
    pub fn open(buffer: Bytes, format: ArchiveFormat) -> Result<Self, DecodeError> {
        let archive = ZipArchive::new(Cursor::new(buffer))?;
        if archive.len() != 1 {
            return Err(DecodeError::EntryCount(archive.len()));
        }
        Ok(Self { archive, format })
    }

    /// Lazily decode the embedded CSV. Rows come out in file order.
    pub fn rows(
        &mut self,
    ) -> Result<impl Iterator<Item = Result<PayRow, DecodeError>> + '_, DecodeError> {
        let entry = self.archive.by_index(0)?;
        let reader = csv::ReaderBuilder::new()
            .delimiter(self.format.delimiter())
            .has_headers(true)
            .from_reader(entry);
        Ok(reader
            .into_deserialize::<PayRow>()
            .map(|row| row.map_err(DecodeError::from)))
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Builders for in-memory test archives.

    use std::io::Write;

    use bytes::Bytes;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    use super::ArchiveFormat;
    use crate::models::PayRow;

    pub use crate::models::CSV_HEADER as HEADER;

    pub fn row(agency: &str, name: &str, category: &str, amount: f64) -> PayRow {
        PayRow {
            agency: agency.into(),
            month: 1,
            year: 2020,
            registration: Some(format!("{name}-id")),
            name: name.into(),
            role: Some("Juiz".into()),
            workplace: None,
            category_label: category.into(),
            line_item_label: "Subsídio".into(),
            amount,
        }
    }

    pub fn csv_text(rows: &[PayRow], format: ArchiveFormat) -> Vec<u8> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(format.delimiter())
            .has_headers(false)
            .from_writer(Vec::new());
        writer.write_record(HEADER).unwrap();
        for r in rows {
            writer.serialize(r).unwrap();
        }
        writer.into_inner().unwrap()
    }

    pub fn zip_entries(entries: &[(&str, &[u8])]) -> Bytes {
        let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
        for (name, body) in entries {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(body).unwrap();
        }
        Bytes::from(zip.finish().unwrap().into_inner())
    }

    pub fn archive(rows: &[PayRow], format: ArchiveFormat) -> Bytes {
        let body = csv_text(rows, format);
        zip_entries(&[("remuneracoes.csv", body.as_slice())])
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::{archive, row, zip_entries};
    use super::*;

    fn decode_all(buffer: Bytes, format: ArchiveFormat) -> Result<Vec<PayRow>, DecodeError> {
        let mut decoder = ArchiveDecoder::open(buffer, format)?;
        let rows: Result<Vec<_>, _> = decoder.rows()?.collect();
        rows
    }

    #[test]
    fn decodes_current_semicolon_archive() {
        let rows = vec![row("tjal", "Ana", "base", 10.5), row("tjal", "Bia", "outras", 2.0)];
        let decoded = decode_all(archive(&rows, ArchiveFormat::Current), ArchiveFormat::Current)
            .unwrap();
        assert_eq!(decoded, rows);
    }

    #[test]
    fn decodes_legacy_comma_archive() {
        let rows = vec![row("tjba", "Caio", "descontos", -300.0)];
        let decoded =
            decode_all(archive(&rows, ArchiveFormat::Legacy), ArchiveFormat::Legacy).unwrap();
        assert_eq!(decoded, rows);
    }

    #[test]
    fn empty_optional_columns_become_none() {
        let mut r = row("tjal", "Ana", "base", 1.0);
        r.registration = None;
        r.role = None;
        let decoded =
            decode_all(archive(&[r.clone()], ArchiveFormat::Current), ArchiveFormat::Current)
                .unwrap();
        assert_eq!(decoded[0].registration, None);
        assert_eq!(decoded[0].role, None);
    }

    #[test]
    fn wrong_delimiter_is_a_decode_error() {
        let rows = vec![row("tjal", "Ana", "base", 1.0)];
        let result = decode_all(archive(&rows, ArchiveFormat::Current), ArchiveFormat::Legacy);
        assert!(matches!(result, Err(DecodeError::Row(_))));
    }

    #[test]
    fn rejects_archives_without_exactly_one_entry() {
        let empty = zip_entries(&[]);
        assert!(matches!(
            ArchiveDecoder::open(empty, ArchiveFormat::Current),
            Err(DecodeError::EntryCount(0))
        ));

        let two = zip_entries(&[("a.csv", b"x".as_slice()), ("b.csv", b"y".as_slice())]);
        assert!(matches!(
            ArchiveDecoder::open(two, ArchiveFormat::Current),
            Err(DecodeError::EntryCount(2))
        ));
    }

    #[test]
    fn rejects_non_zip_buffers() {
        let result = ArchiveDecoder::open(Bytes::from_static(b"not a zip"), ArchiveFormat::Current);
        assert!(matches!(result, Err(DecodeError::Zip(_))));
    }

    #[test]
    fn malformed_row_surfaces_after_good_rows() {
        let body = b"orgao;mes;ano;matricula;nome;cargo;lotacao;categoria_contracheque;detalhamento_contracheque;valor\n\
tjal;1;2020;;Ana;;;base;Subsidio;10\n\
tjal;1;2020;;Bia;;;base;Subsidio;not-a-number\n";
        let buffer = zip_entries(&[("remuneracoes.csv", body.as_slice())]);
        let mut decoder = ArchiveDecoder::open(buffer, ArchiveFormat::Current).unwrap();
        let mut rows = decoder.rows().unwrap();
        assert_eq!(rows.next().unwrap().unwrap().name, "Ana");
        assert!(matches!(rows.next(), Some(Err(DecodeError::Row(_)))));
    }
}
