//! # Registration Flow
//!
//! `POST /register` through the HTTP gateway into the admission gate and the
//! registration store, with a hand-driven clock so quota expiry is testable.
//! Requests arrive through two trusted proxies unless a test connects directly.

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, SocketAddr};
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::extract::ConnectInfo;
    use axum::http::{header, Request, StatusCode};
    use axum::Router;
    use k256::ecdsa::SigningKey;
    use serde_json::{json, Value};
    use shared_types::{address_to_hex, Address};
    use tower::ServiceExt;
    use ts_01_admission_gate::{
        address_from_pubkey, sign_personal_message, AdmissionService, InMemoryQuotaStore,
        ManualClock, QuotaConfig,
    };
    use ts_02_event_ledger::{LedgerConfig, LedgerService, MockChain};
    use ts_04_api_gateway::{GatewayConfig, GatewayService, InMemoryRegistrationStore};

    const CHALLENGE: &str = "Please sign to confirm you accept the sale terms";
    const TTL: Duration = Duration::from_secs(60);
    const EDGE_PROXY: [u8; 4] = [10, 0, 0, 1];
    const INNER_PROXY: [u8; 4] = [10, 0, 0, 2];

    struct Backend {
        router: Router,
        clock: Arc<ManualClock>,
        registrations: Arc<InMemoryRegistrationStore>,
    }

    fn backend(max_addresses: usize) -> Backend {
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let store = Arc::new(InMemoryQuotaStore::with_clock(clock.clone()));
        let quota = QuotaConfig {
            max_addresses_per_origin: max_addresses,
            ttl_ms: TTL.as_millis() as u64,
            ..Default::default()
        };
        let admission = Arc::new(AdmissionService::with_clock(quota, store, clock.clone()));
        let ledger = Arc::new(LedgerService::new(
            LedgerConfig::default(),
            Arc::new(MockChain::new()),
        ));
        let registrations = Arc::new(InMemoryRegistrationStore::new());
        let config = GatewayConfig {
            challenge: CHALLENGE.into(),
            trusted_proxies: vec![IpAddr::from(EDGE_PROXY), IpAddr::from(INNER_PROXY)],
            ..Default::default()
        };
        let gateway =
            GatewayService::new(config, admission, ledger, registrations.clone()).unwrap();

        Backend {
            router: gateway.router(),
            clock,
            registrations,
        }
    }

    struct Contributor {
        key: SigningKey,
        address: Address,
    }

    impl Contributor {
        fn new() -> Self {
            let key = SigningKey::random(&mut rand::thread_rng());
            let address = address_from_pubkey(key.verifying_key());
            Self { key, address }
        }

        fn body(&self) -> Value {
            json!({
                "address": address_to_hex(&self.address).to_uppercase().replacen("0X", "0x", 1),
                "signature": sign_personal_message(&self.key, CHALLENGE.as_bytes()).unwrap(),
            })
        }
    }

    async fn register(router: &Router, who: &Contributor, origin: &str) -> (StatusCode, Value) {
        send(router, who, INNER_PROXY, &format!("{origin}, 10.0.0.1")).await
    }

    async fn send(
        router: &Router,
        who: &Contributor,
        peer: [u8; 4],
        forwarded_for: &str,
    ) -> (StatusCode, Value) {
        let request = Request::post("/register")
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-forwarded-for", forwarded_for)
            .extension(ConnectInfo(SocketAddr::from((peer, 45000))))
            .body(Body::from(who.body().to_string()))
            .unwrap();
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_quota_fills_then_frees_after_ttl() {
        let backend = backend(2);
        let origin = "198.51.100.7";
        let (alice, bob, carol) = (Contributor::new(), Contributor::new(), Contributor::new());

        assert_eq!(register(&backend.router, &alice, origin).await.0, StatusCode::OK);
        assert_eq!(register(&backend.router, &bob, origin).await.0, StatusCode::OK);

        let (status, body) = register(&backend.router, &carol, origin).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["error"], "rate_limited");

        // Known addresses re-register without consuming quota.
        let (status, body) = register(&backend.router, &alice, origin).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["address"], address_to_hex(&alice.address));

        backend.clock.advance(TTL + Duration::from_secs(1));
        assert_eq!(register(&backend.router, &carol, origin).await.0, StatusCode::OK);

        assert_eq!(backend.registrations.len(), 3);
        assert_eq!(
            backend.registrations.origin_of(&carol.address).as_deref(),
            Some(origin)
        );
    }

    #[tokio::test]
    async fn test_forwarded_origin_is_nearest_untrusted_hop() {
        let backend = backend(1);
        let (alice, bob) = (Contributor::new(), Contributor::new());

        assert_eq!(register(&backend.router, &alice, "192.0.2.1").await.0, StatusCode::OK);
        assert_eq!(register(&backend.router, &bob, "192.0.2.2").await.0, StatusCode::OK);
        assert_eq!(
            register(&backend.router, &Contributor::new(), "192.0.2.1").await.0,
            StatusCode::TOO_MANY_REQUESTS
        );

        // A client-supplied prefix does not move the origin.
        let (status, _) = send(
            &backend.router,
            &Contributor::new(),
            INNER_PROXY,
            "203.0.113.99, 192.0.2.1, 10.0.0.1",
        )
        .await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_direct_client_cannot_rotate_forwarded_origin() {
        let backend = backend(1);
        let peer = [198, 51, 100, 77];

        let mut admitted = 0;
        for i in 0..5 {
            let (status, _) =
                send(&backend.router, &Contributor::new(), peer, &format!("10.9.9.{i}")).await;
            if status == StatusCode::OK {
                admitted += 1;
            } else {
                assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
            }
        }

        assert_eq!(admitted, 1);
        assert_eq!(backend.registrations.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_registrations_respect_quota() {
        let backend = backend(3);
        let contributors: Vec<_> = (0..8).map(|_| Contributor::new()).collect();

        let results = futures::future::join_all(
            contributors
                .iter()
                .map(|who| register(&backend.router, who, "203.0.113.50")),
        )
        .await;

        let admitted = results.iter().filter(|(s, _)| *s == StatusCode::OK).count();
        assert_eq!(admitted, 3);
        assert_eq!(backend.registrations.len(), 3);
    }
}
