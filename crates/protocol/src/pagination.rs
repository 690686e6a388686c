//! Keyset pagination over paged listing methods.
//!
//! Listing methods such as `ip_list` accept a `limit` and an `after` cursor in
//! their trailing options mapping and return a JSON array of items. [`list_all`]
//! keeps calling until it has collected `limit` items or the server returns an
//! empty page, moving `after` to the cursor field of the last item received.
//!
//! Each call is described by its own [`PageRequest`]; the caller's options are
//! never mutated between calls.

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::{CallArgs, RpcCaller};

/// Number of items fetched when the options carry no `limit`.
pub const DEFAULT_PAGE_LIMIT: u64 = 10;

const LIMIT_OPTION: &str = "limit";
const AFTER_OPTION: &str = "after";

/// Errors produced while walking pages.
#[derive(Debug, Error)]
pub enum PaginationError<E>
where
    E: std::error::Error + 'static,
{
    /// A page request failed.
    #[error(transparent)]
    Call(E),

    /// The listing method returned something other than an array.
    #[error("{method} returned {found} instead of a list")]
    NotAList {
        /// The listing method that was called.
        method: String,
        /// JSON type name of what came back.
        found: &'static str,
    },

    /// The last item of a page lacks the cursor field, so the next page
    /// cannot be requested.
    #[error("{method} returned an item without the `{field}` cursor field")]
    MissingCursor {
        /// The listing method that was called.
        method: String,
        /// The cursor field that was expected.
        field: String,
    },

    /// The `limit` option is not a non-negative integer.
    #[error("{method}: limit must be a non-negative integer, got {found}")]
    InvalidLimit {
        /// The listing method that was requested.
        method: String,
        /// The rejected `limit` value.
        found: Value,
    },
}

/// What to list and how many items to collect.
#[derive(Debug, Clone, PartialEq)]
pub struct PageQuery {
    method: String,
    cursor_field: String,
    options: Map<String, Value>,
    limit: u64,
    invalid_limit: Option<Value>,
    after: Option<Value>,
}

impl PageQuery {
    /// Creates a query for `method`, paging on `cursor_field`.
    ///
    /// `limit` and `after` are taken out of `options`: `limit` becomes the
    /// total number of items to collect (defaulting to [`DEFAULT_PAGE_LIMIT`]
    /// when absent) and `after` the starting cursor. A `limit` that is not a
    /// non-negative integer makes [`list_all`] fail before any call. Everything else is sent unchanged with every page request.
    pub fn new(
        method: impl Into<String>,
        cursor_field: impl Into<String>,
        mut options: Map<String, Value>,
    ) -> Self {
        let (limit, invalid_limit) = match options.remove(LIMIT_OPTION) {
            None => (DEFAULT_PAGE_LIMIT, None),
            Some(value) => match value.as_u64() {
                Some(limit) => (limit, None),
                None => (DEFAULT_PAGE_LIMIT, Some(value)),
            },
        };
        let after = options.remove(AFTER_OPTION).filter(|after| !after.is_null());
        Self {
            method: method.into(),
            cursor_field: cursor_field.into(),
            options,
            limit,
            invalid_limit,
            after,
        }
    }

    /// Overrides the number of items to collect.
    #[must_use]
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self.invalid_limit = None;
        self
    }

    /// Returns the listing method name.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Returns the number of items to collect.
    pub fn limit(&self) -> u64 {
        self.limit
    }

    fn first_request(&self) -> PageRequest {
        PageRequest {
            limit_remaining: self.limit,
            after: self.after.clone(),
        }
    }
}

/// Parameters of a single page call.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    /// How many items are still wanted.
    pub limit_remaining: u64,
    /// Cursor value of the last item already received, if any.
    pub after: Option<Value>,
}

impl PageRequest {
    /// Builds the call arguments: the base options plus `limit` and `after`.
    pub fn to_args(&self, options: &Map<String, Value>) -> CallArgs {
        let mut args = CallArgs::new()
            .with_options(options.clone())
            .named(LIMIT_OPTION, self.limit_remaining);
        if let Some(after) = &self.after {
            args.insert(AFTER_OPTION, after.clone());
        }
        args
    }

    /// The request following a page of `received` items ending at `after`.
    fn next(&self, received: u64, after: Value) -> Self {
        Self {
            limit_remaining: self.limit_remaining.saturating_sub(received),
            after: Some(after),
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Collects up to `query.limit()` items by repeatedly calling the listing
/// method.
///
/// Stops as soon as enough items have been collected or a page comes back
/// empty. Items are returned in server order and are not deduplicated; the
/// result is cut to the requested limit if the last page overshoots it.
///
/// # Errors
///
/// Returns [`PaginationError::InvalidLimit`] before any call when the
/// `limit` option was malformed, [`PaginationError::Call`] when a call fails,
/// and the other variants when a page is not a list or lacks the cursor
/// field needed for the next request.
pub async fn list_all<C>(
    caller: &C,
    query: &PageQuery,
) -> Result<Vec<Value>, PaginationError<C::Error>>
where
    C: RpcCaller + ?Sized,
{
    if let Some(found) = &query.invalid_limit {
        return Err(PaginationError::InvalidLimit {
            method: query.method.clone(),
            found: found.clone(),
        });
    }
    let target = usize::try_from(query.limit).unwrap_or(usize::MAX);
    let mut items: Vec<Value> = Vec::new();
    let mut request = query.first_request();

    while items.len() < target {
        let page = caller
            .call(&query.method, request.to_args(&query.options))
            .await
            .map_err(PaginationError::Call)?;

        let batch = match page {
            Value::Array(batch) => batch,
            other => {
                return Err(PaginationError::NotAList {
                    method: query.method.clone(),
                    found: json_type_name(&other),
                })
            }
        };
        if batch.is_empty() {
            debug!(method = %query.method, collected = items.len(), "empty page, listing exhausted");
            break;
        }

        let received = batch.len();
        let cursor = batch
            .last()
            .and_then(|item| item.get(&query.cursor_field))
            .cloned();
        items.extend(batch);
        debug!(method = %query.method, received, collected = items.len(), "page received");

        if items.len() >= target {
            break;
        }
        let cursor = cursor.ok_or_else(|| PaginationError::MissingCursor {
            method: query.method.clone(),
            field: query.cursor_field.clone(),
        })?;
        request = request.next(received as u64, cursor);
    }

    items.truncate(target);
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Debug, Error)]
    #[error("fake failure")]
    struct FakeError;

    /// Serves `ip` items from an in-memory list, keyset-paged on `ip`.
    ///
    /// When `page_size` is set every page has that many items regardless of
    /// the requested limit, like a server that ignores `limit`.
    struct FakeLister {
        items: Vec<Value>,
        page_size: Option<usize>,
        calls: Mutex<Vec<Vec<Value>>>,
    }

    impl FakeLister {
        fn with_items(count: usize, page_size: Option<usize>) -> Self {
            Self {
                items: (0..count)
                    .map(|n| json!({"ip": format!("10.0.0.{n}"), "status": "Available"}))
                    .collect(),
                page_size,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<Vec<Value>> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RpcCaller for FakeLister {
        type Error = FakeError;

        async fn call(&self, method: &str, args: CallArgs) -> Result<Value, FakeError> {
            assert_eq!(method, "ip_list");
            let params = args.into_params();
            self.calls.lock().unwrap().push(params.clone());

            let options = params.last().cloned().unwrap_or_else(|| json!({}));
            let start = match options.get("after") {
                Some(after) => {
                    self.items
                        .iter()
                        .position(|item| &item["ip"] == after)
                        .map_or(self.items.len(), |pos| pos + 1)
                }
                None => 0,
            };
            let limit = options["limit"].as_u64().unwrap() as usize;
            let size = self.page_size.unwrap_or(limit);
            let page: Vec<Value> = self.items.iter().skip(start).take(size).cloned().collect();
            Ok(Value::Array(page))
        }
    }

    fn options(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn collects_exactly_the_limit_across_full_pages() {
        let lister = FakeLister::with_items(30, Some(10));
        let query = PageQuery::new("ip_list", "ip", options(json!({"pool": "*", "limit": 25})));

        let items = list_all(&lister, &query).await.unwrap();

        assert_eq!(items.len(), 25);
        let expected: Vec<Value> = lister.items[..25].to_vec();
        assert_eq!(items, expected);

        let calls = lister.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0], vec![json!({"pool": "*", "limit": 25})]);
        assert_eq!(
            calls[1],
            vec![json!({"pool": "*", "limit": 15, "after": "10.0.0.9"})]
        );
        assert_eq!(
            calls[2],
            vec![json!({"pool": "*", "limit": 5, "after": "10.0.0.19"})]
        );
    }

    #[tokio::test]
    async fn stops_on_empty_page_when_server_runs_out() {
        let lister = FakeLister::with_items(3, None);
        let query = PageQuery::new("ip_list", "ip", options(json!({"limit": 5})));

        let items = list_all(&lister, &query).await.unwrap();

        assert_eq!(items.len(), 3);
        let calls = lister.calls();
        assert!(calls.len() <= 2);
        assert_eq!(calls[1], vec![json!({"limit": 2, "after": "10.0.0.2"})]);
    }

    #[tokio::test]
    async fn default_limit_is_ten() {
        let lister = FakeLister::with_items(50, None);
        let query = PageQuery::new("ip_list", "ip", Map::new());

        let items = list_all(&lister, &query).await.unwrap();

        assert_eq!(items.len(), 10);
        assert_eq!(lister.calls().len(), 1);
    }

    #[tokio::test]
    async fn starting_cursor_is_sent_on_first_call() {
        let lister = FakeLister::with_items(20, None);
        let query = PageQuery::new(
            "ip_list",
            "ip",
            options(json!({"after": "10.0.0.4", "limit": 3})),
        );

        let items = list_all(&lister, &query).await.unwrap();

        assert_eq!(items[0]["ip"], "10.0.0.5");
        assert_eq!(lister.calls()[0], vec![json!({"limit": 3, "after": "10.0.0.4"})]);
    }

    #[tokio::test]
    async fn malformed_limit_is_rejected_before_any_call() {
        for limit in [json!("25"), json!(25.0), json!(-1)] {
            let lister = FakeLister::with_items(30, None);
            let query = PageQuery::new("ip_list", "ip", options(json!({"limit": limit.clone()})));

            let err = list_all(&lister, &query).await.unwrap_err();

            assert!(
                matches!(err, PaginationError::InvalidLimit { ref found, .. } if *found == limit),
                "{err:?}"
            );
            assert!(lister.calls().is_empty());
        }
    }

    #[tokio::test]
    async fn explicit_limit_replaces_a_malformed_one() {
        let lister = FakeLister::with_items(30, None);
        let query =
            PageQuery::new("ip_list", "ip", options(json!({"limit": "25"}))).with_limit(4);

        assert_eq!(list_all(&lister, &query).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn zero_limit_makes_no_calls() {
        let lister = FakeLister::with_items(5, None);
        let query = PageQuery::new("ip_list", "ip", Map::new()).with_limit(0);

        assert!(list_all(&lister, &query).await.unwrap().is_empty());
        assert!(lister.calls().is_empty());
    }

    #[tokio::test]
    async fn missing_cursor_field_is_reported() {
        struct NoCursor;

        #[async_trait]
        impl RpcCaller for NoCursor {
            type Error = FakeError;

            async fn call(&self, _method: &str, _args: CallArgs) -> Result<Value, FakeError> {
                Ok(json!([{"address": "10.0.0.1"}]))
            }
        }

        let query = PageQuery::new("ip_list", "ip", Map::new());
        let err = list_all(&NoCursor, &query).await.unwrap_err();
        assert!(matches!(err, PaginationError::MissingCursor { ref field, .. } if field == "ip"));
    }

    #[tokio::test]
    async fn non_list_page_is_reported() {
        struct Scalar;

        #[async_trait]
        impl RpcCaller for Scalar {
            type Error = FakeError;

            async fn call(&self, _method: &str, _args: CallArgs) -> Result<Value, FakeError> {
                Ok(json!({"count": 3}))
            }
        }

        let query = PageQuery::new("ip_list", "ip", Map::new());
        let err = list_all(&Scalar, &query).await.unwrap_err();
        assert_eq!(err.to_string(), "ip_list returned an object instead of a list");
    }
}
