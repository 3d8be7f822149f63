use std::collections::HashSet;

use csv::StringRecord;
use tracing::{debug, warn};

use crate::error::ReportError;
use crate::model::record::{Record, RecordField, RecordKind};
use crate::util::time::TimeNormalizer;

/// Kind and column mask derived from a CSV header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub kind: RecordKind,
    pub mask: Vec<bool>,
}

impl Detection {
    pub fn surviving_columns(&self) -> usize {
        self.mask.iter().filter(|keep| **keep).count()
    }
}

/// Decide which export a header belongs to. A user-story marker wins over a task marker
/// when both are present; a header with neither is an issue export.
pub fn detect_kind<'a>(header: impl IntoIterator<Item = &'a str>) -> RecordKind {
    let mut has_task_marker = false;
    for column in header {
        if column == RecordField::AssignedUsers.as_str() {
            return RecordKind::UserStory;
        }
        if column == RecordField::UserStory.as_str() {
            has_task_marker = true;
        }
    }
    if has_task_marker {
        RecordKind::Task
    } else {
        RecordKind::Issue
    }
}

pub fn column_mask<'a>(
    header: impl IntoIterator<Item = &'a str>,
    allow_list: &HashSet<String>,
) -> Vec<bool> {
    header
        .into_iter()
        .map(|column| allow_list.contains(column))
        .collect()
}

/// Keep the masked-in values in the row's own left-to-right order. Columns past the end
/// of a short row are simply missing.
pub fn filter_columns<'r>(row: &'r StringRecord, mask: &[bool]) -> Vec<&'r str> {
    row.iter()
        .zip(mask)
        .filter_map(|(value, keep)| keep.then_some(value))
        .collect()
}

/// Turns raw CSV rows into [`Record`]s for one configured allow-list.
#[derive(Debug, Clone)]
pub struct RowMapper {
    allow_list: HashSet<String>,
    normalizer: TimeNormalizer,
}

impl RowMapper {
    pub fn new(allow_list: HashSet<String>, normalizer: TimeNormalizer) -> Self {
        Self {
            allow_list,
            normalizer,
        }
    }

    pub fn detect(&self, header: &StringRecord) -> Detection {
        let kind = detect_kind(header.iter());
        let detection = Detection {
            kind,
            mask: column_mask(header.iter(), &self.allow_list),
        };
        let expected = kind.layout().len();
        let found = detection.surviving_columns();
        if found != expected {
            warn!(
                %kind,
                expected,
                found,
                "allow-list does not match this export's columns; rows will be rejected"
            );
        }
        detection
    }

    pub fn map_row(&self, detection: &Detection, row: &StringRecord) -> Result<Record, ReportError> {
        let values = filter_columns(row, &detection.mask);
        Record::from_values(detection.kind, &values, &self.normalizer)
    }

    /// Lazily map a header row followed by data rows.
    pub fn map_rows<I>(&self, rows: I) -> MappedRows<'_, I::IntoIter>
    where
        I: IntoIterator<Item = Result<StringRecord, csv::Error>>,
    {
        MappedRows {
            mapper: self,
            rows: rows.into_iter(),
            detection: None,
            failed: false,
        }
    }

    /// Parse a whole CSV document and map every data row.
    pub fn map_document(&self, text: &str) -> Result<Vec<Record>, ReportError> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(text.as_bytes());
        let mut mapped = self.map_rows(reader.into_records());
        let records: Vec<Record> = mapped.by_ref().collect::<Result<_, _>>()?;
        if let Some(detection) = mapped.detection() {
            debug!(kind = %detection.kind, rows = records.len(), "mapped document");
        }
        Ok(records)
    }
}

/// Iterator returned by [`RowMapper::map_rows`]. Stops after the first error.
pub struct MappedRows<'m, I> {
    mapper: &'m RowMapper,
    rows: I,
    detection: Option<Detection>,
    failed: bool,
}

impl<I> MappedRows<'_, I> {
    pub fn detection(&self) -> Option<&Detection> {
        self.detection.as_ref()
    }
}

impl<I> Iterator for MappedRows<'_, I>
where
    I: Iterator<Item = Result<StringRecord, csv::Error>>,
{
    type Item = Result<Record, ReportError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            let row = match self.rows.next()? {
                Ok(row) => row,
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e.into()));
                }
            };
            let Some(detection) = &self.detection else {
                self.detection = Some(self.mapper.detect(&row));
                continue;
            };
            let mapped = self.mapper.map_row(detection, &row);
            self.failed = mapped.is_err();
            return Some(mapped);
        }
    }
}
