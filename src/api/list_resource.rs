use std::collections::BTreeMap;

use entity::ID_FIELD;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::store::Store;

use super::{
    list_view::{ListObject, PagedView},
    resources::{ResourceDefinition, Resources},
    types::{CursorParam, ListParams},
    ApiErrors,
};

static TOTAL_COUNT: &str = "total_count";

/// Raw parameters of a list request as the handler receives them.
///
/// Values are kept loose and normalized in [`ListQuery::into_list_params`].
/// Uninterpretable values are dropped, except cursors: a cursor that names
/// no id is rejected.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ListQuery {
    limit: Option<Value>,
    starting_after: Option<Value>,
    ending_before: Option<Value>,
    active: Option<Value>,
    #[serde(rename = "include[]")]
    include: Option<Value>,
    #[serde(flatten)]
    rest: Map<String, Value>,
}

impl ListQuery {
    pub fn from_params(params: &Map<String, Value>) -> Result<Self, ApiErrors> {
        serde_json::from_value(Value::Object(params.clone()))
            .map_err(|e| ApiErrors::BadRequest(e.to_string()))
    }

    pub fn into_list_params(
        mut self,
        definition: &ResourceDefinition,
    ) -> Result<ListParams, ApiErrors> {
        let include = self.include.take().or_else(|| self.rest.remove("include"));
        let filter_values: BTreeMap<String, Value> = self
            .rest
            .into_iter()
            .filter(|(key, _)| definition.filterable_by().contains(key))
            .collect();

        Ok(ListParams {
            limit: self.limit.as_ref().and_then(parse_limit),
            starting_after: parse_cursor(CursorParam::StartingAfter, self.starting_after)?,
            ending_before: parse_cursor(CursorParam::EndingBefore, self.ending_before)?,
            active: self.active.as_ref().and_then(parse_active),
            include_total_count: include.as_ref().is_some_and(includes_total_count),
            filterable_fields: definition.filterable_by().clone(),
            filter_values,
        })
    }
}

fn parse_limit(value: &Value) -> Option<i64> {
    let limit = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    if limit.is_none() {
        warn!("Ignoring invalid limit {}", value);
    }
    limit
}

/// A cursor is an id, or an expanded object carrying one. Numbers and
/// booleans are taken in their string form and resolved like any other id.
fn parse_cursor(param: CursorParam, value: Option<Value>) -> Result<Option<String>, ApiErrors> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(Value::Object(fields)) => match fields.get(ID_FIELD).and_then(Value::as_str) {
            Some(id) => Ok(Some(id.to_string())),
            None => Err(invalid_cursor(param, &Value::Object(fields))),
        },
        Some(other) => Err(invalid_cursor(param, &other)),
    }
}

fn invalid_cursor(param: CursorParam, value: &Value) -> ApiErrors {
    warn!("Rejecting invalid {} {}", param, value);
    ApiErrors::BadRequest(format!("Invalid {param}: {value} is not an object id"))
}

fn parse_active(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Some(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Some(false),
        _ => {
            warn!("Ignoring invalid active {}", value);
            None
        }
    }
}

fn includes_total_count(value: &Value) -> bool {
    match value {
        Value::String(s) => s.split(',').any(|s| s.trim() == TOTAL_COUNT),
        Value::Array(values) => values.iter().any(|v| v.as_str() == Some(TOTAL_COUNT)),
        _ => false,
    }
}

/// Handles `GET /v1/<plural>`: snapshots the collection and pages it.
pub fn api_list_resource(
    store: &Store,
    resources: &Resources,
    resource_name: &str,
    params: &Map<String, Value>,
) -> Result<ListObject, ApiErrors> {
    let definition = resources.find(resource_name).ok_or_else(|| {
        debug!("Unknown resource {}", resource_name);
        ApiErrors::NotFound(resource_name.to_string())
    })?;
    let list_params = ListQuery::from_params(params)?.into_list_params(definition)?;
    let snapshot = store.snapshot(definition.kind().object())?;

    PagedView::new(definition.kind().clone(), snapshot, list_params).list_object()
}
