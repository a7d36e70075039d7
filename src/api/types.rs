use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;
use tracing::debug;
use typed_builder::TypedBuilder;

use super::filter::FieldFilter;

pub(crate) static DEFAULT_LIMIT: i64 = 10;
pub(crate) static MAX_LIMIT: i64 = 100;

/// Which cursor a list request paginates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorParam {
    StartingAfter,
    EndingBefore,
}

impl CursorParam {
    pub fn name(&self) -> &'static str {
        match self {
            CursorParam::StartingAfter => "starting_after",
            CursorParam::EndingBefore => "ending_before",
        }
    }
}

impl std::fmt::Display for CursorParam {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Pagination and filter parameters of one list request.
///
/// Values are stored as given; normalization (limit clamping, cursor
/// precedence, filter restriction) happens in the accessors.
#[derive(Debug, Clone, PartialEq, TypedBuilder)]
pub struct ListParams {
    #[builder(default, setter(strip_option))]
    pub(crate) limit: Option<i64>,
    #[builder(default, setter(strip_option, into))]
    pub(crate) starting_after: Option<String>,
    #[builder(default, setter(strip_option, into))]
    pub(crate) ending_before: Option<String>,
    #[builder(default, setter(strip_option))]
    pub(crate) active: Option<bool>,
    #[builder(default)]
    pub(crate) include_total_count: bool,
    #[builder(default, setter(into))]
    pub(crate) filterable_fields: BTreeSet<String>,
    #[builder(default, setter(into))]
    pub(crate) filter_values: BTreeMap<String, Value>,
}

impl Default for ListParams {
    fn default() -> Self {
        ListParams::builder().build()
    }
}

impl ListParams {
    /// Requested page size, clamped to `1..=100`.
    pub fn limit(&self) -> usize {
        let limit = self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        usize::try_from(limit).unwrap_or(1)
    }

    /// The cursor to paginate from. `starting_after` wins over `ending_before`.
    pub fn cursor(&self) -> Option<(CursorParam, &str)> {
        match (&self.starting_after, &self.ending_before) {
            (Some(id), _) => Some((CursorParam::StartingAfter, id.as_str())),
            (None, Some(id)) => Some((CursorParam::EndingBefore, id.as_str())),
            (None, None) => None,
        }
    }

    pub fn active(&self) -> Option<bool> {
        self.active
    }

    pub fn include_total_count(&self) -> bool {
        self.include_total_count
    }

    /// Equality filters for the fields declared filterable. Values for any
    /// other field are ignored.
    pub fn field_filters(&self) -> Vec<FieldFilter> {
        self.filter_values
            .iter()
            .filter_map(|(field_name, value)| {
                if self.filterable_fields.contains(field_name) {
                    Some(FieldFilter::new(field_name, value.clone()))
                } else {
                    debug!("Ignoring filter on non-filterable field {}", field_name);
                    None
                }
            })
            .collect()
    }
}
