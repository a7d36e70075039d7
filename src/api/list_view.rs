//! Paginated, filterable views over an in-memory record collection.
//!
//! A [`PagedView`] is built per list request from a snapshot of the backing
//! store. Pagination is cursor based: `starting_after` / `ending_before`
//! name a record id, and the page is taken relative to that record's
//! position in the ordered snapshot.

use std::cmp::Reverse;

use entity::{Record, ACTIVE_FIELD};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::{
    filter::FieldFilter,
    resources::ResourceKind,
    types::{CursorParam, ListParams},
    ApiErrors,
};

pub(crate) static LIST_OBJECT: &str = "list";

/// An immutable, ordered snapshot of a collection plus the list parameters
/// applied to it.
#[derive(Debug, Clone)]
pub struct PagedView {
    kind: ResourceKind,
    data: Vec<Record>,
    params: ListParams,
}

impl PagedView {
    /// Takes ownership of the snapshot. When every record has an integer
    /// `created` field the records are ordered newest first (stable, ties
    /// keep their snapshot order); otherwise snapshot order is kept.
    pub fn new(
        kind: ResourceKind,
        snapshot: impl IntoIterator<Item = Record>,
        params: ListParams,
    ) -> Self {
        let mut data: Vec<Record> = snapshot.into_iter().collect();
        if !data.is_empty() && data.iter().all(|r| r.created().is_some()) {
            data.sort_by_key(|r| Reverse(r.created()));
        }
        Self { kind, data, params }
    }

    pub fn url(&self) -> String {
        self.kind.url()
    }

    /// Number of records in the unfiltered snapshot.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Start position of the page. Cursors are resolved against the
    /// unfiltered ordered snapshot; `ending_before` on the first record
    /// yields `-1`.
    fn offset(&self) -> Result<i64, ApiErrors> {
        let Some((param, id)) = self.params.cursor() else {
            return Ok(0);
        };
        let index = self
            .data
            .iter()
            .position(|r| r.id() == Some(id))
            .ok_or_else(|| {
                debug!("{} cursor {} not found in {}", param, id, self.url());
                ApiErrors::CursorNotFound {
                    param,
                    id: id.to_string(),
                }
            })?;
        let index = i64::try_from(index).unwrap_or(i64::MAX);
        Ok(match param {
            CursorParam::StartingAfter => index.saturating_add(1),
            CursorParam::EndingBefore => index - 1,
        })
    }

    fn filtered_data(&self) -> Vec<&Record> {
        let filters: Vec<FieldFilter> = self.params.field_filters();
        let active = self.params.active().map(Value::Bool);
        self.data
            .iter()
            .filter(|r| match &active {
                Some(active) => r.get(ACTIVE_FIELD) == Some(active),
                None => true,
            })
            .filter(|r| filters.iter().all(|f| f.matches(r)))
            .collect()
    }

    fn limit(&self) -> i64 {
        i64::try_from(self.params.limit()).unwrap_or(1)
    }

    /// `true` while records of the unfiltered snapshot remain past the page
    /// window. A restrictive filter can therefore report `true` although no
    /// further matching records exist.
    pub fn has_more(&self) -> Result<bool, ApiErrors> {
        let offset = self.offset()?;
        Ok(self.has_more_from(offset))
    }

    fn has_more_from(&self, offset: i64) -> bool {
        let len = i64::try_from(self.data.len()).unwrap_or(i64::MAX);
        offset.saturating_add(self.limit()) < len
    }

    /// Records of the requested page. A negative offset or one past the
    /// end gives an empty page.
    pub fn data_page(&self) -> Result<Vec<Record>, ApiErrors> {
        let offset = self.offset()?;
        Ok(self.page_from(&self.filtered_data(), offset))
    }

    fn page_from(&self, filtered: &[&Record], offset: i64) -> Vec<Record> {
        let Ok(start) = usize::try_from(offset) else {
            return Vec::new();
        };
        filtered
            .iter()
            .skip(start)
            .take(self.params.limit())
            .map(|r| (*r).clone())
            .collect()
    }

    /// Size of the filtered set, if requested.
    pub fn total_count(&self) -> Option<usize> {
        self.params
            .include_total_count()
            .then(|| self.filtered_data().len())
    }

    /// Computes the list object for this request.
    pub fn list_object(&self) -> Result<ListObject, ApiErrors> {
        let offset = self.offset()?;
        let filtered = self.filtered_data();
        let data = self.page_from(&filtered, offset);
        debug!(
            "Listing {}: offset {}, {} of {} filtered records",
            self.url(),
            offset,
            data.len(),
            filtered.len()
        );
        Ok(ListObject {
            object: LIST_OBJECT,
            data,
            url: self.url(),
            has_more: self.has_more_from(offset),
            total_count: self
                .params
                .include_total_count()
                .then_some(filtered.len()),
        })
    }
}

/// The list resource returned for a list request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListObject {
    object: &'static str,
    data: Vec<Record>,
    url: String,
    has_more: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    total_count: Option<usize>,
}

impl ListObject {
    pub fn data(&self) -> &[Record] {
        &self.data
    }

    pub fn url(&self) -> &str {
        self.url.as_ref()
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn total_count(&self) -> Option<usize> {
        self.total_count
    }

    pub fn ids(&self) -> Vec<&str> {
        self.data.iter().filter_map(Record::id).collect()
    }

    /// Reads one attribute of the list object by name. `total_count` only
    /// exists when it was requested.
    pub fn get(&self, attribute: &str) -> Result<Value, ApiErrors> {
        match attribute {
            "object" => Ok(Value::String(self.object.to_string())),
            "data" => Ok(Value::Array(
                self.data.iter().cloned().map(Value::from).collect(),
            )),
            "url" => Ok(Value::String(self.url.clone())),
            "has_more" => Ok(Value::Bool(self.has_more)),
            "total_count" => self
                .total_count
                .map(Value::from)
                .ok_or_else(|| ApiErrors::UnknownAttribute(attribute.to_string())),
            _ => Err(ApiErrors::UnknownAttribute(attribute.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn record(value: Value) -> Record {
        Record::try_from(value).unwrap()
    }

    /// `r0` (newest) .. `r{n-1}` (oldest), inserted oldest first.
    fn records(n: usize) -> Vec<Record> {
        (0..n)
            .rev()
            .map(|i| {
                let created = 1_700_000_000 - i as i64;
                record(json!({"id": format!("r{i}"), "created": created}))
            })
            .collect()
    }

    fn view(data: Vec<Record>, params: ListParams) -> PagedView {
        PagedView::new(ResourceKind::new("invoice"), data, params)
    }

    #[test]
    fn it_pages_forward_with_starting_after() {
        // Arrange
        let data = records(12);

        // Act
        let first = view(data.clone(), ListParams::builder().limit(5).build())
            .list_object()
            .unwrap();
        let second = view(
            data.clone(),
            ListParams::builder().limit(5).starting_after("r4").build(),
        )
        .list_object()
        .unwrap();
        let third = view(
            data,
            ListParams::builder().limit(5).starting_after("r9").build(),
        )
        .list_object()
        .unwrap();

        // Assert
        assert_eq!(first.ids(), vec!["r0", "r1", "r2", "r3", "r4"]);
        assert!(first.has_more());
        assert_eq!(second.ids(), vec!["r5", "r6", "r7", "r8", "r9"]);
        assert!(second.has_more());
        assert_eq!(third.ids(), vec!["r10", "r11"]);
        assert!(!third.has_more());
    }

    #[test]
    fn walking_all_pages_has_no_gaps_or_overlaps() {
        let data = records(23);
        for limit in [1, 3, 7, 10, 23, 50] {
            let mut seen: Vec<String> = Vec::new();
            let mut cursor: Option<String> = None;
            loop {
                let params = match &cursor {
                    Some(id) => ListParams::builder()
                        .limit(limit)
                        .starting_after(id.clone())
                        .build(),
                    None => ListParams::builder().limit(limit).build(),
                };
                let page = view(data.clone(), params).list_object().unwrap();
                assert!(page.data().len() <= limit as usize);
                seen.extend(page.ids().into_iter().map(String::from));
                if !page.has_more() {
                    break;
                }
                cursor = seen.last().cloned();
            }
            let expected: Vec<String> = (0..23).map(|i| format!("r{i}")).collect();
            assert_eq!(seen, expected, "limit {limit}");
        }
    }

    #[test]
    fn ending_before_first_record_is_empty() {
        // Arrange
        let v = view(
            records(12),
            ListParams::builder().limit(5).ending_before("r0").build(),
        );

        // Act
        let list = v.list_object().unwrap();

        // Assert
        assert!(list.data().is_empty());
        assert!(list.has_more());
    }

    #[test]
    fn ending_before_pages_from_previous_record() {
        // offset = index(r2) - 1 = 1
        let v = view(
            records(12),
            ListParams::builder().limit(5).ending_before("r2").build(),
        );

        let list = v.list_object().unwrap();

        assert_eq!(list.ids(), vec!["r1", "r2", "r3", "r4", "r5"]);
        assert!(list.has_more());
    }

    #[test]
    fn unknown_cursor_fails() {
        // Arrange
        let v = view(
            records(12),
            ListParams::builder().starting_after("does-not-exist").build(),
        );

        // Act
        let err = v.list_object().unwrap_err();

        // Assert
        assert_eq!(
            err,
            ApiErrors::CursorNotFound {
                param: CursorParam::StartingAfter,
                id: "does-not-exist".to_string()
            }
        );
        assert!(v.data_page().is_err());
        assert!(v.has_more().is_err());
    }

    #[test]
    fn unknown_ending_before_fails() {
        let v = view(
            records(3),
            ListParams::builder().ending_before("r9").build(),
        );

        assert!(matches!(
            v.list_object(),
            Err(ApiErrors::CursorNotFound {
                param: CursorParam::EndingBefore,
                ..
            })
        ));
    }

    #[test]
    fn starting_after_last_record_is_empty() {
        let list = view(
            records(4),
            ListParams::builder().starting_after("r3").build(),
        )
        .list_object()
        .unwrap();

        assert!(list.data().is_empty());
        assert!(!list.has_more());
    }

    #[test]
    fn it_orders_by_created_descending_and_keeps_ties_stable() {
        // Arrange
        let data = vec![
            record(json!({"id": "a", "created": 10})),
            record(json!({"id": "b", "created": 30})),
            record(json!({"id": "c", "created": 20})),
            record(json!({"id": "d", "created": 30})),
            record(json!({"id": "e", "created": 10})),
        ];

        // Act
        let list = view(data, ListParams::default()).list_object().unwrap();

        // Assert
        assert_eq!(list.ids(), vec!["b", "d", "c", "a", "e"]);
    }

    #[test]
    fn it_keeps_snapshot_order_without_created() {
        let data = vec![
            record(json!({"id": "a", "created": 10})),
            record(json!({"id": "b"})),
            record(json!({"id": "c", "created": 20})),
        ];

        let list = view(data, ListParams::default()).list_object().unwrap();

        assert_eq!(list.ids(), vec!["a", "b", "c"]);
    }

    #[test]
    fn active_filter_and_total_count() {
        // Arrange
        let data: Vec<Record> = (0..30)
            .map(|i| {
                let active = i % 3 == 0;
                record(json!({"id": format!("p{i}"), "created": 100 + i, "active": active}))
            })
            .collect();
        let params = ListParams::builder()
            .limit(4)
            .active(true)
            .include_total_count(true)
            .build();

        // Act
        let list = view(data, params).list_object().unwrap();

        // Assert
        assert_eq!(list.total_count(), Some(10));
        assert_eq!(list.ids(), vec!["p27", "p24", "p21", "p18"]);
        assert!(list.data().iter().all(|r| r.get("active") == Some(&json!(true))));
    }

    #[test]
    fn records_without_active_field_are_filtered_out() {
        let data = vec![
            record(json!({"id": "a", "active": false})),
            record(json!({"id": "b"})),
        ];

        let list = view(data, ListParams::builder().active(false).build())
            .list_object()
            .unwrap();

        assert_eq!(list.ids(), vec!["a"]);
    }

    #[test]
    fn has_more_counts_unfiltered_records() {
        // Arrange
        let data = vec![
            record(json!({"id": "in_1", "created": 5, "status": "paid"})),
            record(json!({"id": "in_2", "created": 4, "status": "draft"})),
            record(json!({"id": "in_3", "created": 3, "status": "draft"})),
        ];
        let params = ListParams::builder()
            .limit(1)
            .filterable_fields(BTreeSet::from(["status".to_string()]))
            .filter_values(BTreeMap::from([("status".to_string(), json!("paid"))]))
            .include_total_count(true)
            .build();

        // Act
        let list = view(data, params).list_object().unwrap();

        // Assert
        assert_eq!(list.ids(), vec!["in_1"]);
        assert_eq!(list.total_count(), Some(1));
        assert!(list.has_more());
    }

    #[test]
    fn cursor_is_resolved_against_unfiltered_order() {
        // in_2 does not match the filter but still positions the page
        let data = vec![
            record(json!({"id": "in_1", "created": 5, "customer": "cus_1"})),
            record(json!({"id": "in_2", "created": 4, "customer": "cus_2"})),
            record(json!({"id": "in_3", "created": 3, "customer": "cus_1"})),
            record(json!({"id": "in_4", "created": 2, "customer": "cus_1"})),
        ];
        let params = ListParams::builder()
            .starting_after("in_2")
            .filterable_fields(BTreeSet::from(["customer".to_string()]))
            .filter_values(BTreeMap::from([("customer".to_string(), json!("cus_1"))]))
            .build();

        let list = view(data, params).list_object().unwrap();

        // offset 2 into the filtered sequence [in_1, in_3, in_4]
        assert_eq!(list.ids(), vec!["in_4"]);
    }

    #[test]
    fn filter_by_expanded_object_equals_filter_by_id() {
        // Arrange
        let data = vec![
            record(json!({"id": "in_1", "created": 3, "customer": "cus_1"})),
            record(json!({"id": "in_2", "created": 2, "customer": {"id": "cus_1", "object": "customer"}})),
            record(json!({"id": "in_3", "created": 1, "customer": "cus_2"})),
        ];
        let params = |value: Value| {
            ListParams::builder()
                .filterable_fields(BTreeSet::from(["customer".to_string()]))
                .filter_values(BTreeMap::from([("customer".to_string(), value)]))
                .build()
        };

        // Act
        let by_id = view(data.clone(), params(json!("cus_1")))
            .list_object()
            .unwrap();
        let by_object = view(data, params(json!({"id": "cus_1", "object": "customer"})))
            .list_object()
            .unwrap();

        // Assert
        assert_eq!(by_id.ids(), vec!["in_1", "in_2"]);
        assert_eq!(by_id, by_object);
    }

    #[test]
    fn non_filterable_fields_are_ignored() {
        let data = records(3);
        let params = ListParams::builder()
            .filter_values(BTreeMap::from([("id".to_string(), json!("r1"))]))
            .build();

        let list = view(data, params).list_object().unwrap();

        assert_eq!(list.ids(), vec!["r0", "r1", "r2"]);
    }

    #[test]
    fn empty_collection_still_has_url() {
        // Act
        let list = view(Vec::new(), ListParams::default()).list_object().unwrap();

        // Assert
        assert!(list.data().is_empty());
        assert!(!list.has_more());
        assert_eq!(list.url(), "/v1/invoices");
        assert_eq!(
            serde_json::to_string(&list).unwrap(),
            r#"{"object":"list","data":[],"url":"/v1/invoices","has_more":false}"#
        );
    }

    #[test]
    fn view_is_detached_from_source() {
        // Arrange
        let mut source = records(2);
        let v = view(source.clone(), ListParams::default());

        // Act
        source.push(record(json!({"id": "late", "created": 1_800_000_000})));

        // Assert
        assert_eq!(v.len(), 2);
        assert_eq!(v.list_object().unwrap().ids(), vec!["r0", "r1"]);
    }

    #[test]
    fn repeated_reads_are_identical() {
        let v = view(records(7), ListParams::builder().limit(3).build());

        assert_eq!(v.list_object().unwrap(), v.list_object().unwrap());
        assert_eq!(v.data_page().unwrap(), v.list_object().unwrap().data());
        assert!(v.has_more().unwrap());
    }

    #[test]
    fn it_serializes_total_count_only_when_requested() {
        // Arrange
        let v = view(
            records(1),
            ListParams::builder().include_total_count(true).build(),
        );

        // Act
        let s = serde_json::to_value(v.list_object().unwrap()).unwrap();

        // Assert
        assert_eq!(
            s,
            json!({
                "object": "list",
                "data": [{"id": "r0", "created": 1_700_000_000}],
                "url": "/v1/invoices",
                "has_more": false,
                "total_count": 1
            })
        );
        assert_eq!(v.total_count(), Some(1));
    }

    #[test]
    fn attribute_access() {
        // Arrange
        let plain = view(records(2), ListParams::default()).list_object().unwrap();
        let counted = view(
            records(2),
            ListParams::builder().include_total_count(true).build(),
        )
        .list_object()
        .unwrap();

        // Assert
        assert_eq!(plain.get("object").unwrap(), json!("list"));
        assert_eq!(plain.get("url").unwrap(), json!("/v1/invoices"));
        assert_eq!(plain.get("has_more").unwrap(), json!(false));
        assert_eq!(plain.get("data").unwrap().as_array().unwrap().len(), 2);
        assert_eq!(
            plain.get("total_count"),
            Err(ApiErrors::UnknownAttribute("total_count".to_string()))
        );
        assert_eq!(counted.get("total_count").unwrap(), json!(2));
        assert_eq!(
            plain.get("lines"),
            Err(ApiErrors::UnknownAttribute("lines".to_string()))
        );
    }

    #[test]
    fn limit_out_of_range_is_clamped() {
        let data = records(120);

        let big = view(data.clone(), ListParams::builder().limit(500).build())
            .list_object()
            .unwrap();
        let zero = view(data, ListParams::builder().limit(0).build())
            .list_object()
            .unwrap();

        assert_eq!(big.data().len(), 100);
        assert!(big.has_more());
        assert_eq!(zero.ids(), vec!["r0"]);
    }
}
