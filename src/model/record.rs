use std::borrow::Cow;
use std::fmt;

use crate::error::ReportError;
use crate::util::time::TimeNormalizer;

/// Which tracker export a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    UserStory,
    Task,
    Issue,
}

impl RecordKind {
    pub const ALL: [RecordKind; 3] = [RecordKind::UserStory, RecordKind::Task, RecordKind::Issue];

    /// Discriminator written to the `type` column.
    pub fn code(&self) -> &'static str {
        match self {
            RecordKind::UserStory => "US",
            RecordKind::Task => "TK",
            RecordKind::Issue => "IS",
        }
    }

    /// Order in which allow-listed CSV columns are expected for this kind.
    pub fn layout(&self) -> &'static [RecordField] {
        use RecordField::*;
        match self {
            RecordKind::UserStory => &[
                Id,
                Ref,
                Subject,
                AssignedTo,
                AssignedUsers,
                Status,
                IsClosed,
                CreatedDate,
                ModifiedDate,
                FinishDate,
                DueDate,
                DueDateReason,
                TimeSpent,
                Paid,
            ],
            RecordKind::Task => &[
                Id,
                Ref,
                Subject,
                UserStory,
                AssignedTo,
                Status,
                IsClosed,
                CreatedDate,
                ModifiedDate,
                FinishDate,
                DueDate,
                DueDateReason,
                TimeSpent,
                Paid,
            ],
            RecordKind::Issue => &[
                Id,
                Ref,
                Subject,
                AssignedTo,
                Status,
                IsClosed,
                CreatedDate,
                ModifiedDate,
                FinishDate,
                DueDate,
                DueDateReason,
                TimeSpent,
                Paid,
            ],
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::UserStory => f.write_str("user story"),
            RecordKind::Task => f.write_str("task"),
            RecordKind::Issue => f.write_str("issue"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordField {
    Id,
    Ref,
    Subject,
    UserStory,
    AssignedTo,
    AssignedUsers,
    Status,
    IsClosed,
    CreatedDate,
    ModifiedDate,
    FinishDate,
    DueDate,
    DueDateReason,
    TimeSpent,
    Paid,
    Type,
}

impl RecordField {
    /// Column order of the exported report, shared by every kind.
    pub const EXPORT: [RecordField; 16] = [
        RecordField::Id,
        RecordField::Ref,
        RecordField::Subject,
        RecordField::UserStory,
        RecordField::AssignedTo,
        RecordField::AssignedUsers,
        RecordField::Status,
        RecordField::IsClosed,
        RecordField::CreatedDate,
        RecordField::ModifiedDate,
        RecordField::FinishDate,
        RecordField::DueDate,
        RecordField::DueDateReason,
        RecordField::TimeSpent,
        RecordField::Paid,
        RecordField::Type,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordField::Id => "id",
            RecordField::Ref => "ref",
            RecordField::Subject => "subject",
            RecordField::UserStory => "user_story",
            RecordField::AssignedTo => "assigned_to",
            RecordField::AssignedUsers => "assigned_users",
            RecordField::Status => "status",
            RecordField::IsClosed => "is_closed",
            RecordField::CreatedDate => "created_date",
            RecordField::ModifiedDate => "modified_date",
            RecordField::FinishDate => "finish_date",
            RecordField::DueDate => "due_date",
            RecordField::DueDateReason => "due_date_reason",
            RecordField::TimeSpent => "time_spent",
            RecordField::Paid => "paid",
            RecordField::Type => "type",
        }
    }

    fn is_date(&self) -> bool {
        matches!(
            self,
            RecordField::CreatedDate
                | RecordField::ModifiedDate
                | RecordField::FinishDate
                | RecordField::DueDate
        )
    }
}

impl fmt::Display for RecordField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One tracker item. `parent_story` is only set for tasks and `assigned_users` only for
/// user stories; everything else is present for every kind.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    kind: RecordKind,
    id: String,
    reference: String,
    subject: String,
    parent_story: Option<String>,
    assigned_to: String,
    assigned_users: Option<String>,
    status: String,
    is_closed: String,
    created_date: String,
    modified_date: String,
    finish_date: String,
    due_date: String,
    due_date_reason: String,
    time_spent: String,
    paid: String,
}

impl Record {
    /// Build a record from allow-listed values laid out per [`RecordKind::layout`].
    /// Date fields are normalized here, so raw timestamps never reach a `Record`.
    pub fn from_values<S: AsRef<str>>(
        kind: RecordKind,
        values: &[S],
        normalizer: &TimeNormalizer,
    ) -> Result<Self, ReportError> {
        let layout = kind.layout();
        if values.len() != layout.len() {
            return Err(ReportError::FieldCountMismatch {
                kind,
                expected: layout.len(),
                found: values.len(),
            });
        }

        let mut record = Record {
            kind,
            id: String::new(),
            reference: String::new(),
            subject: String::new(),
            parent_story: None,
            assigned_to: String::new(),
            assigned_users: None,
            status: String::new(),
            is_closed: String::new(),
            created_date: String::new(),
            modified_date: String::new(),
            finish_date: String::new(),
            due_date: String::new(),
            due_date_reason: String::new(),
            time_spent: String::new(),
            paid: String::new(),
        };

        for (field, value) in layout.iter().zip(values) {
            let value = value.as_ref();
            let value = if field.is_date() {
                normalizer.normalize(value)?
            } else {
                value.to_string()
            };
            match field {
                RecordField::Id => record.id = value,
                RecordField::Ref => record.reference = value,
                RecordField::Subject => record.subject = value,
                RecordField::UserStory => record.parent_story = Some(value),
                RecordField::AssignedTo => record.assigned_to = value,
                RecordField::AssignedUsers => record.assigned_users = Some(value),
                RecordField::Status => record.status = value,
                RecordField::IsClosed => record.is_closed = value,
                RecordField::CreatedDate => record.created_date = value,
                RecordField::ModifiedDate => record.modified_date = value,
                RecordField::FinishDate => record.finish_date = value,
                RecordField::DueDate => record.due_date = value,
                RecordField::DueDateReason => record.due_date_reason = value,
                RecordField::TimeSpent => record.time_spent = value,
                RecordField::Paid => record.paid = value,
                RecordField::Type => {}
            }
        }

        Ok(record)
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    pub fn parent_story(&self) -> Option<&str> {
        self.parent_story.as_deref()
    }

    pub fn assigned_to(&self) -> &str {
        &self.assigned_to
    }

    pub fn assigned_users(&self) -> Option<&str> {
        self.assigned_users.as_deref()
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn time_spent(&self) -> &str {
        &self.time_spent
    }

    pub fn paid(&self) -> &str {
        &self.paid
    }

    /// Display string for one export column. Absent optionals render empty.
    pub fn value(&self, field: RecordField) -> Cow<'_, str> {
        match field {
            RecordField::Id => Cow::Borrowed(&self.id),
            RecordField::Ref => Cow::Borrowed(&self.reference),
            RecordField::Subject => Cow::Borrowed(&self.subject),
            RecordField::UserStory => Cow::Borrowed(self.parent_story().unwrap_or_default()),
            RecordField::AssignedTo => Cow::Borrowed(&self.assigned_to),
            RecordField::AssignedUsers => {
                Cow::Borrowed(self.assigned_users().unwrap_or_default())
            }
            RecordField::Status => Cow::Borrowed(&self.status),
            RecordField::IsClosed => Cow::Borrowed(&self.is_closed),
            RecordField::CreatedDate => Cow::Borrowed(&self.created_date),
            RecordField::ModifiedDate => Cow::Borrowed(&self.modified_date),
            RecordField::FinishDate => Cow::Borrowed(&self.finish_date),
            RecordField::DueDate => Cow::Borrowed(&self.due_date),
            RecordField::DueDateReason => Cow::Borrowed(&self.due_date_reason),
            RecordField::TimeSpent => Cow::Borrowed(&self.time_spent),
            RecordField::Paid => Cow::Borrowed(&self.paid),
            RecordField::Type => Cow::Borrowed(self.kind().code()),
        }
    }

    /// All export columns in [`RecordField::EXPORT`] order.
    pub fn values(&self) -> Vec<String> {
        RecordField::EXPORT
            .iter()
            .map(|field| self.value(*field).into_owned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer() -> TimeNormalizer {
        TimeNormalizer::new("%Y-%m-%d %H:%M:%S%.f%z", "UTC", "%Y-%m-%d %H:%M").unwrap()
    }

    fn story_values() -> Vec<&'static str> {
        vec![
            "101",
            "7",
            "Login page",
            "alice",
            "alice,bob",
            "In progress",
            "False",
            "2023-05-01 09:15:00.5+0300",
            "",
            "",
            "",
            "",
            "4.5",
            "False",
        ]
    }

    #[test]
    fn layouts_have_expected_lengths() {
        assert_eq!(RecordKind::UserStory.layout().len(), 14);
        assert_eq!(RecordKind::Task.layout().len(), 14);
        assert_eq!(RecordKind::Issue.layout().len(), 13);
    }

    #[test]
    fn layouts_follow_export_order() {
        for kind in RecordKind::ALL {
            let positions: Vec<usize> = kind
                .layout()
                .iter()
                .map(|f| RecordField::EXPORT.iter().position(|e| e == f).unwrap())
                .collect();
            assert!(positions.windows(2).all(|w| w[0] < w[1]), "{kind}");
        }
    }

    #[test]
    fn user_story_fields_land_in_place() {
        let record =
            Record::from_values(RecordKind::UserStory, &story_values(), &normalizer()).unwrap();
        assert_eq!(record.kind(), RecordKind::UserStory);
        assert_eq!(record.value(RecordField::Id), "101");
        assert_eq!(record.value(RecordField::Ref), "7");
        assert_eq!(record.assigned_to(), "alice");
        assert_eq!(record.assigned_users(), Some("alice,bob"));
        assert_eq!(record.parent_story(), None);
        assert_eq!(record.value(RecordField::IsClosed), "False");
        assert_eq!(record.value(RecordField::CreatedDate), "2023-05-01 06:15");
        assert_eq!(record.value(RecordField::ModifiedDate), "");
        assert_eq!(record.time_spent(), "4.5");
        assert_eq!(record.paid(), "False");
    }

    #[test]
    fn task_keeps_parent_story() {
        let values = [
            "5", "12", "Write tests", "US #7", "bob", "Done", "True", "", "", "", "", "", "",
            "True",
        ];
        let record = Record::from_values(RecordKind::Task, &values, &normalizer()).unwrap();
        assert_eq!(record.parent_story(), Some("US #7"));
        assert_eq!(record.assigned_users(), None);
        assert_eq!(record.value(RecordField::IsClosed), "True");
        assert_eq!(record.value(RecordField::Type), "TK");
    }

    #[test]
    fn flags_export_as_written() {
        for flag in ["", "true", "yes", "True"] {
            let mut values = story_values();
            values[6] = flag;
            let record =
                Record::from_values(RecordKind::UserStory, &values, &normalizer()).unwrap();
            assert_eq!(record.value(RecordField::IsClosed), flag);
            assert_eq!(record.values()[7], flag);
        }
    }

    #[test]
    fn wrong_value_count_is_rejected() {
        let values = &story_values()[..13];
        let err = Record::from_values(RecordKind::UserStory, values, &normalizer()).unwrap_err();
        assert!(matches!(
            err,
            ReportError::FieldCountMismatch {
                kind: RecordKind::UserStory,
                expected: 14,
                found: 13
            }
        ));
    }

    #[test]
    fn bad_date_aborts_construction() {
        let mut values = story_values();
        values[8] = "yesterday";
        let err = Record::from_values(RecordKind::UserStory, &values, &normalizer()).unwrap_err();
        assert!(matches!(err, ReportError::MalformedTimestamp { .. }));
    }

    #[test]
    fn values_render_in_export_order() {
        let record =
            Record::from_values(RecordKind::UserStory, &story_values(), &normalizer()).unwrap();
        let values = record.values();
        assert_eq!(values.len(), RecordField::EXPORT.len());
        assert_eq!(values[3], "");
        assert_eq!(values[5], "alice,bob");
        assert_eq!(values[7], "False");
        assert_eq!(values[15], "US");
    }
}
