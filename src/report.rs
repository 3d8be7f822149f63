use std::fmt::{self, Write as _};
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone};
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use tracing::info;

use crate::error::ReportError;
use crate::model::record::{Record, RecordField};

/// Extra characters added to the widest value of each column.
pub const WIDTH_PADDING: usize = 2;
/// Excel refuses column widths above 255 characters.
const WIDTH_MAX: usize = 255;

const SHEET_NAME: &str = "Report";
const EXTENSION: &str = "xlsx";

/// Header plus display rows, ready for any tabular sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ReportTable {
    pub fn from_records(records: &[Record]) -> Self {
        Self {
            header: RecordField::EXPORT
                .iter()
                .map(|field| field.as_str().to_string())
                .collect(),
            rows: records.iter().map(Record::values).collect(),
        }
    }
}

/// Per-column width: the longest of the header and every value, in characters, plus
/// `padding`.
pub fn column_widths(table: &ReportTable, padding: usize) -> Vec<usize> {
    let mut widths: Vec<usize> = table.header.iter().map(|h| h.chars().count()).collect();
    for row in &table.rows {
        for (width, value) in widths.iter_mut().zip(row) {
            *width = usize::max(*width, value.chars().count());
        }
    }
    widths.into_iter().map(|w| w + padding).collect()
}

/// `<template rendered at now><suffix>.xlsx`, under `dir` when given. Offset items such as
/// `%z` render from `now`'s zone.
pub fn output_path<Tz>(
    template: &str,
    now: &DateTime<Tz>,
    suffix: &str,
    dir: Option<&Path>,
) -> Result<PathBuf, ReportError>
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let mut file_name = String::new();
    write!(file_name, "{}", now.format(template)).map_err(|_| ReportError::InvalidFormat {
        key: "output_filename".to_string(),
        format: template.to_string(),
    })?;
    let file_name = format!("{file_name}{suffix}.{EXTENSION}");
    Ok(match dir {
        Some(dir) => dir.join(file_name),
        None => PathBuf::from(file_name),
    })
}

/// Write `records` as a single-sheet workbook at `path`.
///
/// An empty slice writes nothing and returns [`ReportError::EmptyResultSet`]; callers treat
/// that as a non-fatal outcome.
pub fn write_report(records: &[Record], path: &Path) -> Result<usize, ReportError> {
    if records.is_empty() {
        return Err(ReportError::EmptyResultSet);
    }

    let table = ReportTable::from_records(records);
    let widths = column_widths(&table, WIDTH_PADDING);

    let mut workbook = Workbook::new();
    let fmt_header = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    for (n_idx_col, name) in table.header.iter().enumerate() {
        worksheet.write_string_with_format(0, cast_col_num(n_idx_col)?, name, &fmt_header)?;
    }
    for (n_idx_row, row) in table.rows.iter().enumerate() {
        let n_row = cast_row_num(n_idx_row + 1)?;
        for (n_idx_col, value) in row.iter().enumerate() {
            worksheet.write_string(n_row, cast_col_num(n_idx_col)?, value)?;
        }
    }
    for (n_idx_col, width) in widths.iter().enumerate() {
        let width = usize::min(*width, WIDTH_MAX);
        worksheet.set_column_width(cast_col_num(n_idx_col)?, width as f64)?;
    }
    worksheet.set_freeze_panes(1, 0)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(XlsxError::IoError)?;
    }
    workbook.save(path)?;

    info!(path = %path.display(), rows = table.rows.len(), "report written");
    Ok(table.rows.len())
}

fn cast_row_num(value: usize) -> Result<u32, XlsxError> {
    u32::try_from(value).map_err(|_| XlsxError::RowColumnLimitError)
}

fn cast_col_num(value: usize) -> Result<u16, XlsxError> {
    u16::try_from(value).map_err(|_| XlsxError::RowColumnLimitError)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::record::RecordKind;
    use crate::util::time::TimeNormalizer;

    fn normalizer() -> TimeNormalizer {
        TimeNormalizer::new("%Y-%m-%d %H:%M:%S%z", "UTC", "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn issue(subject: &str, status: &str) -> Record {
        let values = [
            "12", "3", subject, "erin", status, "True", "", "", "", "", "", "", "True",
        ];
        Record::from_values(RecordKind::Issue, &values, &normalizer()).unwrap()
    }

    #[test]
    fn table_has_fixed_header_and_one_row_per_record() {
        let table = ReportTable::from_records(&[issue("a", "New"), issue("b", "Done")]);
        assert_eq!(table.header.len(), 16);
        assert_eq!(table.header[0], "id");
        assert_eq!(table.header[15], "type");
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1][2], "b");
        assert_eq!(table.rows[1][7], "True");
        assert_eq!(table.rows[1][15], "IS");
    }

    #[test]
    fn widths_cover_header_and_values() {
        let table = ReportTable {
            header: vec!["id".into(), "subject".into()],
            rows: vec![
                vec!["1".into(), "short".into()],
                vec!["12345".into(), "a much longer subject".into()],
            ],
        };
        assert_eq!(column_widths(&table, 2), vec![7, 23]);
    }

    #[test]
    fn widths_count_characters_not_bytes() {
        let table = ReportTable {
            header: vec!["s".into()],
            rows: vec![vec!["задача".into()]],
        };
        assert_eq!(column_widths(&table, 0), vec![6]);
    }

    fn moscow_evening() -> DateTime<chrono::FixedOffset> {
        chrono::FixedOffset::east_opt(3 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 2, 29, 17, 5, 0)
            .unwrap()
    }

    #[test]
    fn output_path_renders_template_and_suffix() {
        let now = moscow_evening();
        assert_eq!(
            output_path("taiga_%Y-%m-%d_%H-%M", &now, "_bob_closed", None).unwrap(),
            PathBuf::from("taiga_2024-02-29_17-05_bob_closed.xlsx")
        );
        assert_eq!(
            output_path("out", &now, "", Some(Path::new("reports"))).unwrap(),
            PathBuf::from("reports").join("out.xlsx")
        );
    }

    #[test]
    fn output_path_renders_offset_items() {
        crate::util::time::validate_strftime("output_filename", "taiga_%z").unwrap();
        assert_eq!(
            output_path("taiga_%z", &moscow_evening(), "", None).unwrap(),
            PathBuf::from("taiga_+0300.xlsx")
        );
    }

    #[test]
    fn empty_records_write_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.xlsx");
        let err = write_report(&[], &path).unwrap_err();
        assert!(matches!(err, ReportError::EmptyResultSet));
        assert!(!path.exists());
    }

    #[test]
    fn writes_workbook_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("report.xlsx");
        let rows = write_report(&[issue("Fix login", "Done")], &path).unwrap();
        assert_eq!(rows, 1);
        assert!(path.exists());
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }
}
