use std::collections::HashSet;

use tracing::debug;

use crate::model::record::Record;

/// Which filters are switched on. Inactive filters neither narrow the set nor touch the
/// filename suffix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterConfig {
    pub assignee: Option<String>,
    pub not_paid_only: bool,
    pub with_filled_time_only: bool,
    pub closed_only: bool,
    pub closed_statuses: HashSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter<'a> {
    Assignee(&'a str),
    NotPaid,
    WithTime,
    Closed(&'a HashSet<String>),
}

impl Filter<'_> {
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Filter::Assignee(user) => record.assigned_to() == *user,
            Filter::NotPaid => record.paid() != "True",
            Filter::WithTime => !record.time_spent().is_empty(),
            Filter::Closed(statuses) => statuses.contains(record.status()),
        }
    }

    /// Token appended to the report filename when this filter is active.
    pub fn suffix(&self) -> String {
        match self {
            Filter::Assignee(user) => format!("_{user}"),
            Filter::NotPaid => "_not-paid".to_string(),
            Filter::WithTime => "_w-times".to_string(),
            Filter::Closed(_) => "_closed".to_string(),
        }
    }
}

impl FilterConfig {
    /// Active filters in their fixed application order.
    pub fn active(&self) -> Vec<Filter<'_>> {
        let mut filters = Vec::new();
        if let Some(user) = self.assignee.as_deref().filter(|u| !u.is_empty()) {
            filters.push(Filter::Assignee(user));
        }
        if self.not_paid_only {
            filters.push(Filter::NotPaid);
        }
        if self.with_filled_time_only {
            filters.push(Filter::WithTime);
        }
        if self.closed_only {
            filters.push(Filter::Closed(&self.closed_statuses));
        }
        filters
    }
}

/// Narrow `records` by every active filter and build the filename suffix.
pub fn apply_filters(records: Vec<Record>, config: &FilterConfig) -> (Vec<Record>, String) {
    let mut records = records;
    let mut suffix = String::new();
    for filter in config.active() {
        let before = records.len();
        records.retain(|record| filter.matches(record));
        debug!(?filter, before, after = records.len(), "applied filter");
        suffix.push_str(&filter.suffix());
    }
    (records, suffix)
}
