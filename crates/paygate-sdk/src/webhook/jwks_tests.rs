//! Tests for the signing key store.

use super::*;
use crate::webhook::test_support::{jwk_a, jwk_b, MockClock, KID_A, KID_B};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_jwks(server: &MockServer, body: Value, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path("/api/jwks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(expected_calls)
        .mount(server)
        .await;
}

fn store_for(server: &MockServer, clock: Arc<MockClock>) -> JwksKeyStore {
    JwksKeyStore::new(format!("{}/api/jwks", server.uri()))
        .unwrap()
        .with_clock(clock)
}

// ============================================================================
// SigningKeySet parsing
// ============================================================================

mod parse_tests {
    use super::*;

    #[test]
    fn test_parse_valid_document() {
        let body = json!({"keys": [jwk_a(), jwk_b()]}).to_string();

        let set = SigningKeySet::from_jwks_json(body.as_bytes(), Utc::now()).unwrap();

        assert_eq!(set.len(), 2);
        assert!(set.key(KID_A).is_some());
        assert!(set.key(KID_B).is_some());
        assert!(set.key("unknown").is_none());
    }

    #[test]
    fn test_parse_rejects_non_json() {
        let err = SigningKeySet::from_jwks_json(b"<html>oops</html>", Utc::now()).unwrap_err();
        assert!(matches!(err, JwksError::Parse { .. }));
    }

    #[test]
    fn test_parse_rejects_missing_keys_list() {
        let err = SigningKeySet::from_jwks_json(br#"{"items": []}"#, Utc::now()).unwrap_err();
        assert!(matches!(err, JwksError::Parse { .. }));

        let err = SigningKeySet::from_jwks_json(br#"{"keys": "nope"}"#, Utc::now()).unwrap_err();
        assert!(matches!(err, JwksError::Parse { .. }));
    }

    #[test]
    fn test_parse_rejects_empty_keys_list() {
        let err = SigningKeySet::from_jwks_json(br#"{"keys": []}"#, Utc::now()).unwrap_err();
        assert!(matches!(err, JwksError::Parse { .. }));
    }

    /// Verify unusable entries are skipped while usable ones are kept.
    #[test]
    fn test_parse_skips_unusable_entries() {
        let mut no_kid = jwk_b();
        no_kid.as_object_mut().unwrap().remove("kid");
        let body = json!({"keys": [jwk_a(), no_kid, {"kty": "bogus"}]}).to_string();

        let set = SigningKeySet::from_jwks_json(body.as_bytes(), Utc::now()).unwrap();

        assert_eq!(set.len(), 1);
        assert!(set.key(KID_A).is_some());
    }

    #[test]
    fn test_freshness_window() {
        let fetched_at = Utc::now();
        let body = json!({"keys": [jwk_a()]}).to_string();
        let set = SigningKeySet::from_jwks_json(body.as_bytes(), fetched_at).unwrap();
        let ttl = chrono::Duration::seconds(JWKS_CACHE_TTL_SECS);

        assert!(set.is_fresh(fetched_at + chrono::Duration::seconds(3599), ttl));
        assert!(!set.is_fresh(fetched_at + chrono::Duration::seconds(3600), ttl));
    }
}

// ============================================================================
// Fetching
// ============================================================================

mod fetch_tests {
    use super::*;

    #[tokio::test]
    async fn test_non_success_status_is_fetch_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/jwks"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let store = store_for(&server, Arc::new(MockClock::new()));
        let err = store.resolve(KID_A).await.unwrap_err();

        assert!(matches!(err, JwksError::HttpStatus { status: 503 }));
        assert!(store.cached().is_none());
    }

    #[tokio::test]
    async fn test_invalid_body_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/jwks"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let store = store_for(&server, Arc::new(MockClock::new()));
        let err = store.resolve(KID_A).await.unwrap_err();

        assert!(matches!(err, JwksError::Parse { .. }));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_fetch_error() {
        let store = JwksKeyStore::new("http://127.0.0.1:1/api/jwks").unwrap();

        let err = store.resolve(KID_A).await.unwrap_err();

        assert!(matches!(err, JwksError::Fetch { .. }));
    }

    #[test]
    fn test_environment_url() {
        let store = JwksKeyStore::for_environment(Environment::Sandbox, "gateway.example").unwrap();
        assert_eq!(store.jwks_url(), "https://sandbox.pay.gateway.example/api/jwks");
    }
}

// ============================================================================
// Caching
// ============================================================================

mod cache_tests {
    use super::*;

    /// Verify resolves within the TTL window reuse the first fetch.
    #[tokio::test]
    async fn test_resolve_within_ttl_uses_cache() {
        let server = MockServer::start().await;
        mount_jwks(&server, json!({"keys": [jwk_a(), jwk_b()]}), 1).await;
        let clock = Arc::new(MockClock::new());
        let store = store_for(&server, clock.clone());

        store.resolve(KID_A).await.unwrap();
        clock.advance(1800);
        store.resolve(KID_B).await.unwrap();
        clock.advance(1799);
        store.resolve(KID_A).await.unwrap();
    }

    /// Verify a resolve past the TTL triggers exactly one re-fetch.
    #[tokio::test]
    async fn test_resolve_after_ttl_refetches_once() {
        let server = MockServer::start().await;
        mount_jwks(&server, json!({"keys": [jwk_a()]}), 2).await;
        let clock = Arc::new(MockClock::new());
        let store = store_for(&server, clock.clone());

        store.resolve(KID_A).await.unwrap();
        clock.advance(3601);
        store.resolve(KID_A).await.unwrap();
        store.resolve(KID_A).await.unwrap();
    }

    /// Verify a refresh replaces the whole set rather than merging it.
    #[tokio::test]
    async fn test_refresh_replaces_entire_set() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/jwks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"keys": [jwk_a()]})))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/jwks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"keys": [jwk_b()]})))
            .mount(&server)
            .await;
        let clock = Arc::new(MockClock::new());
        let store = store_for(&server, clock.clone());

        store.resolve(KID_A).await.unwrap();
        clock.advance(3601);
        store.resolve(KID_B).await.unwrap();

        let err = store.resolve(KID_A).await.unwrap_err();
        assert!(matches!(err, JwksError::KeyNotFound { ref kid } if kid == KID_A));
    }

    /// Verify an unknown kid against a fresh cache does not trigger a fetch.
    #[tokio::test]
    async fn test_unknown_kid_with_fresh_cache() {
        let server = MockServer::start().await;
        mount_jwks(&server, json!({"keys": [jwk_a()]}), 1).await;
        let store = store_for(&server, Arc::new(MockClock::new()));

        store.resolve(KID_A).await.unwrap();
        let err = store.resolve("rotated-away").await.unwrap_err();

        assert!(matches!(err, JwksError::KeyNotFound { .. }));
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let server = MockServer::start().await;
        mount_jwks(&server, json!({"keys": [jwk_a()]}), 2).await;
        let store = store_for(&server, Arc::new(MockClock::new()));

        store.resolve(KID_A).await.unwrap();
        store.invalidate();
        assert!(store.cached().is_none());
        store.resolve(KID_A).await.unwrap();
    }

    /// Verify clones of a store share one cache.
    #[tokio::test]
    async fn test_clones_share_cache() {
        let server = MockServer::start().await;
        mount_jwks(&server, json!({"keys": [jwk_a()]}), 1).await;
        let store = store_for(&server, Arc::new(MockClock::new()));
        let clone = store.clone();

        store.resolve(KID_A).await.unwrap();
        clone.resolve(KID_A).await.unwrap();

        assert_eq!(clone.cached().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_set() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/jwks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"keys": [jwk_a()]})))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/jwks"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let clock = Arc::new(MockClock::new());
        let store = store_for(&server, clock.clone());

        store.resolve(KID_A).await.unwrap();
        clock.advance(3601);
        let err = store.resolve(KID_A).await.unwrap_err();

        assert!(matches!(err, JwksError::HttpStatus { status: 500 }));
        assert!(store.cached().is_some());
    }
}
