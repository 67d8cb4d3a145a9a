//! Cursor over server-paginated collections
//!
//! The REST API answers list calls with `{"results": [...], "next": "<url>"}`.
//! The `next` URL only matters for its query string, so it is parsed into
//! [`QueryParams`] as soon as it arrives and merged into the parameters of
//! the following call.

use crate::{ClientError, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Query parameters of a list call
pub type QueryParams = BTreeMap<String, String>;

/// Merge next-page parameters into the current ones.
///
/// On a key present in both, the value from `next` wins.
pub fn merge_params(current: &QueryParams, next: &QueryParams) -> QueryParams {
    let mut merged = current.clone();
    merged.extend(next.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

/// Extract and decode the query string of an absolute or relative URL
pub fn parse_next(locator: &str) -> QueryParams {
    let without_fragment = locator.split('#').next().unwrap_or_default();
    match without_fragment.split_once('?') {
        Some((_, query)) => url::form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect(),
        None => QueryParams::new(),
    }
}

/// Encode parameters as a query string (without the leading `?`)
pub fn to_query_string(params: &QueryParams) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params.iter())
        .finish()
}

/// One fetched batch of items
#[derive(Clone, Debug, PartialEq)]
pub struct Page<T> {
    /// Items of this page
    pub results: Vec<T>,
    /// Parameters of the following page, `None` on the last one
    pub next: Option<QueryParams>,
}

impl<T: DeserializeOwned> Page<T> {
    /// Interpret a list response
    pub fn from_value(mut value: Value) -> Result<Self> {
        let results = match value.get_mut("results") {
            Some(results) if results.is_array() => results.take(),
            _ => return Err(ClientError::MalformedPage("missing results collection".to_string())),
        };
        let results: Vec<T> =
            serde_json::from_value(results).map_err(|e| ClientError::MalformedPage(e.to_string()))?;

        let next = match value.get("next") {
            Some(Value::String(locator)) if !locator.is_empty() => Some(parse_next(locator)),
            _ => None,
        };

        Ok(Self { results, next })
    }
}

/// Something that can fetch one page for a set of parameters
#[async_trait]
pub trait ListSource: Send + Sync {
    /// Fetch the raw page for `params`
    async fn list(&self, params: &QueryParams) -> Result<Value>;
}

#[async_trait]
impl<S: ListSource + ?Sized> ListSource for Arc<S> {
    async fn list(&self, params: &QueryParams) -> Result<Value> {
        (**self).list(params).await
    }
}

#[async_trait]
impl<S: ListSource + ?Sized> ListSource for &S {
    async fn list(&self, params: &QueryParams) -> Result<Value> {
        (**self).list(params).await
    }
}

/// Forward-only position within a paginated collection.
///
/// `advance` takes `&mut self`, so a cursor can never have two fetches in
/// flight.
pub struct PageCursor<T, S> {
    source: S,
    params: QueryParams,
    results: Vec<T>,
}

impl<T, S> PageCursor<T, S>
where
    T: DeserializeOwned + Send,
    S: ListSource,
{
    /// Create a cursor positioned before the first page
    pub fn new(source: S, params: QueryParams) -> Self {
        Self {
            source,
            params,
            results: Vec::new(),
        }
    }

    /// Fetch the page for the current parameters.
    ///
    /// Returns `Ok(true)` when the service announced another page. The last
    /// page stays readable through [`results`](Self::results) after
    /// `Ok(false)`. On error the results are cleared. Calling again after
    /// `Ok(false)` repeats the same request.
    pub async fn advance(&mut self) -> Result<bool> {
        let fetched = self
            .source
            .list(&self.params)
            .await
            .and_then(Page::<T>::from_value);

        match fetched {
            Ok(page) => {
                self.results = page.results;
                match page.next {
                    Some(next) => {
                        self.params = merge_params(&self.params, &next);
                        debug!(items = self.results.len(), "Cursor advanced, more pages");
                        Ok(true)
                    }
                    None => {
                        debug!(items = self.results.len(), "Cursor reached last page");
                        Ok(false)
                    }
                }
            }
            Err(e) => {
                self.results.clear();
                Err(e)
            }
        }
    }

    /// Items of the last fetched page
    pub fn results(&self) -> &[T] {
        &self.results
    }

    /// Parameters the next `advance` will use
    pub fn params(&self) -> &QueryParams {
        &self.params
    }

    /// Move the items of the last fetched page out, leaving it empty
    pub fn take_results(&mut self) -> Vec<T> {
        std::mem::take(&mut self.results)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned responses and records the parameters it was called with
    pub(crate) struct ScriptedList {
        responses: Mutex<VecDeque<Result<Value>>>,
        pub(crate) calls: Mutex<Vec<QueryParams>>,
    }

    impl ScriptedList {
        pub(crate) fn new(responses: Vec<Result<Value>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ListSource for ScriptedList {
        async fn list(&self, params: &QueryParams) -> Result<Value> {
            self.calls.lock().unwrap().push(params.clone());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(json!({"results": [], "next": null})))
        }
    }

    fn params(pairs: &[(&str, &str)]) -> QueryParams {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_merge_prefers_next_values() {
        let current = params(&[("limit", "3"), ("min", "1")]);
        let next = params(&[("min", "5"), ("from", "2026-01-01")]);

        let merged = merge_params(&current, &next);
        assert_eq!(merged, params(&[("limit", "3"), ("min", "5"), ("from", "2026-01-01")]));
        assert_eq!(current.get("min").map(String::as_str), Some("1"));
    }

    #[test]
    fn test_parse_next_locators() {
        assert_eq!(
            parse_next("https://api.uploadcare.com/files/?limit=3&from=2026-10-19T12%3A00%3A00"),
            params(&[("limit", "3"), ("from", "2026-10-19T12:00:00")])
        );
        assert_eq!(parse_next("/groups/?offset=20#frag"), params(&[("offset", "20")]));
        assert!(parse_next("https://api.uploadcare.com/files/").is_empty());
    }

    #[test]
    fn test_query_string_round_trip() {
        let p = params(&[("from", "a b"), ("limit", "10")]);
        assert_eq!(to_query_string(&p), "from=a+b&limit=10");
        assert_eq!(parse_next(&format!("?{}", to_query_string(&p))), p);
    }

    #[tokio::test]
    async fn test_advance_until_last_page() {
        let source = ScriptedList::new(vec![
            Ok(json!({"results": [1, 2, 3], "next": "https://api.uploadcare.com/files/?min=5"})),
            Ok(json!({"results": [4], "next": null})),
        ]);
        let mut cursor: PageCursor<i64, _> = PageCursor::new(&source, params(&[("limit", "3")]));

        assert!(cursor.advance().await.unwrap());
        assert_eq!(cursor.results(), &[1, 2, 3]);
        assert_eq!(cursor.params(), &params(&[("limit", "3"), ("min", "5")]));

        assert!(!cursor.advance().await.unwrap());
        assert_eq!(cursor.results(), &[4]);
        assert_eq!(cursor.take_results(), vec![4]);
        assert!(cursor.results().is_empty());

        let calls = source.calls.lock().unwrap();
        assert_eq!(calls[0], params(&[("limit", "3")]));
        assert_eq!(calls[1], params(&[("limit", "3"), ("min", "5")]));
    }

    #[tokio::test]
    async fn test_malformed_page_clears_results() {
        let source = ScriptedList::new(vec![
            Ok(json!({"results": [1], "next": "/files/?page=2"})),
            Ok(json!({})),
        ]);
        let mut cursor: PageCursor<i64, _> = PageCursor::new(&source, QueryParams::new());

        assert!(cursor.advance().await.unwrap());
        let err = cursor.advance().await.unwrap_err();
        assert!(matches!(err, ClientError::MalformedPage(_)));
        assert!(cursor.results().is_empty());
    }

    #[tokio::test]
    async fn test_transport_error_is_propagated() {
        let source = ScriptedList::new(vec![Err(ClientError::UnexpectedStatus {
            status: 500,
            body: json!({"detail": "boom"}),
        })]);
        let mut cursor: PageCursor<Value, _> = PageCursor::new(&source, QueryParams::new());

        let err = cursor.advance().await.unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert!(cursor.results().is_empty());
    }

    #[tokio::test]
    async fn test_items_of_wrong_shape_are_malformed() {
        let source = ScriptedList::new(vec![Ok(json!({"results": ["x"], "next": null}))]);
        let mut cursor: PageCursor<i64, _> = PageCursor::new(&source, QueryParams::new());

        assert!(matches!(cursor.advance().await, Err(ClientError::MalformedPage(_))));
    }

    #[tokio::test]
    async fn test_advance_after_last_page_repeats_request() {
        let source = ScriptedList::new(vec![
            Ok(json!({"results": [1], "next": ""})),
            Ok(json!({"results": [1]})),
        ]);
        let mut cursor: PageCursor<i64, _> = PageCursor::new(&source, params(&[("limit", "1")]));

        assert!(!cursor.advance().await.unwrap());
        assert!(!cursor.advance().await.unwrap());
        assert_eq!(cursor.results(), &[1]);

        let calls = source.calls.lock().unwrap();
        assert_eq!(calls[0], calls[1]);
    }
}
