//! Candidate lookup for a method and path.
//!
//! Exact-path mocks are preferred. Only when none exist are the regex-path
//! projections scanned, and full records are loaded just for the ids whose
//! pattern is found in the request path.

use crate::error::MockError;
use crate::model::Mock;
use crate::store::MockStore;
use std::sync::Arc;
use tracing::debug;

pub struct CandidateResolver {
    store: Arc<dyn MockStore>,
}

impl CandidateResolver {
    pub fn new(store: Arc<dyn MockStore>) -> Self {
        Self { store }
    }

    /// Candidates for `method` and `path`, in store order.
    ///
    /// Fails with [`MockError::NotFound`] when neither an exact nor a regex
    /// path applies.
    pub fn resolve(&self, method: &str, path: &str) -> Result<Vec<Mock>, MockError> {
        let exact = self.store.find_exact(method, path)?;
        if !exact.is_empty() {
            debug!(method, path, candidates = exact.len(), "Exact path candidates found");
            return Ok(exact);
        }

        let ids: Vec<i64> = self
            .store
            .find_regex_candidates(method)?
            .into_iter()
            .filter(|m| m.regex_path.is_match(path))
            .map(|m| m.id)
            .collect();
        if ids.is_empty() {
            return Err(MockError::NotFound);
        }

        // Mocks deleted since the scan are simply absent here.
        let candidates = self.store.find_by_ids(&ids)?;
        if candidates.is_empty() {
            return Err(MockError::NotFound);
        }
        debug!(method, path, ids = ?ids, "Regex path candidates found");
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::model::{MockResponse, RegexMatcher};
    use crate::store::InMemoryStore;
    use regex::Regex;
    use serde_json::json;

    fn mock(method: &str, path: Option<&str>, regex_path: Option<&str>) -> Mock {
        Mock {
            id: 0,
            method: method.to_string(),
            path: path.map(String::from),
            regex_path: regex_path.map(String::from),
            request_header_matchers: vec![],
            request_query_matchers: vec![],
            request_body_matchers: vec![],
            response: MockResponse::Static {
                status: 200,
                body: json!({}),
            },
        }
    }

    fn resolver_with(mocks: Vec<Mock>) -> CandidateResolver {
        let store = InMemoryStore::new();
        for m in mocks {
            store.save(m).unwrap();
        }
        CandidateResolver::new(Arc::new(store))
    }

    fn ids(result: Result<Vec<Mock>, MockError>) -> Vec<i64> {
        result.unwrap().iter().map(|m| m.id).collect()
    }

    #[test]
    fn test_exact_path_resolves() {
        let resolver = resolver_with(vec![
            mock("GET", Some("/b"), None),
            mock("GET", Some("/a"), None),
        ]);
        assert_eq!(ids(resolver.resolve("GET", "/a")), vec![2]);
        assert_eq!(ids(resolver.resolve("GET", "/b")), vec![1]);
    }

    #[test]
    fn test_regex_fallback() {
        let resolver = resolver_with(vec![mock("GET", None, Some(r"/foo/bar/\d+/baz"))]);
        assert_eq!(ids(resolver.resolve("GET", "/foo/bar/123/baz")), vec![1]);
        assert!(matches!(
            resolver.resolve("POST", "/foo/bar/123/baz"),
            Err(MockError::NotFound)
        ));
    }

    #[test]
    fn test_exact_path_shadows_regex() {
        let resolver = resolver_with(vec![
            mock("GET", None, Some(r"/foo/\d+")),
            mock("GET", Some("/foo/1"), None),
        ]);
        assert_eq!(ids(resolver.resolve("GET", "/foo/1")), vec![2]);
        assert_eq!(ids(resolver.resolve("GET", "/foo/2")), vec![1]);
    }

    #[test]
    fn test_no_candidates_is_not_found() {
        let resolver = resolver_with(vec![mock("GET", Some("/a"), None)]);
        assert!(matches!(
            resolver.resolve("GET", "/missing"),
            Err(MockError::NotFound)
        ));
    }

    /// Store whose regex scan reports an id that no longer exists.
    struct VanishingStore;

    impl MockStore for VanishingStore {
        fn find_exact(&self, _: &str, _: &str) -> Result<Vec<Mock>, StoreError> {
            Ok(vec![])
        }

        fn find_regex_candidates(&self, method: &str) -> Result<Vec<RegexMatcher>, StoreError> {
            Ok(vec![RegexMatcher {
                id: 42,
                method: method.to_string(),
                regex_path: Regex::new("/gone").unwrap(),
            }])
        }

        fn find_by_ids(&self, _: &[i64]) -> Result<Vec<Mock>, StoreError> {
            Ok(vec![])
        }

        fn save(&self, mock: Mock) -> Result<Mock, StoreError> {
            Ok(mock)
        }

        fn delete_by_id(&self, id: i64) -> Result<(), StoreError> {
            Err(StoreError::NotFound(id))
        }

        fn list_all(&self) -> Result<Vec<Mock>, StoreError> {
            Ok(vec![])
        }
    }

    #[test]
    fn test_mock_deleted_after_scan_is_dropped() {
        let resolver = CandidateResolver::new(Arc::new(VanishingStore));
        assert!(matches!(
            resolver.resolve("GET", "/gone"),
            Err(MockError::NotFound)
        ));
    }
}
