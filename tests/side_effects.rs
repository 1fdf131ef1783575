mod common;

use common::{individual, wait_for_requests, Setup, TOKEN};
use payments_dispatcher::domain::payment::RequestMeta;
use payments_dispatcher::notify::{
    AlertDispatcher, FraudAlert, PoolNotifier, SideEffect, SideEffectQueue, SideEffectWorker,
};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn alerts(url: Option<String>) -> AlertDispatcher {
    AlertDispatcher {
        client: reqwest::Client::new(),
        webhook_url: url,
        token: TOKEN.to_string(),
    }
}

fn pools(url: Option<String>) -> PoolNotifier {
    PoolNotifier {
        client: reqwest::Client::new(),
        base_url: url,
        token: "gateway-token".to_string(),
        timeout: Duration::from_secs(8),
    }
}

#[tokio::test]
async fn pool_contribution_is_posted_after_success() {
    let provider = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "pi_5", "status": "succeeded"})))
        .mount(&provider)
        .await;
    let pool_service = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/pools/pool-1/contributions"))
        .and(header("x-gateway-token", "gateway-token"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&pool_service)
        .await;

    let (queue, _failures) = SideEffectWorker::spawn(alerts(None), pools(Some(pool_service.uri())), 16, 4);
    let h = Setup::new(&provider.uri()).build_with_queue(queue);

    h.service
        .initiate(
            json!({
                "provider": "stripe", "amount": 25, "currency": "€",
                "context": "cagnotte", "cagnotteId": "pool-1", "participationCode": "P-3"
            }),
            Some(&individual("u1", 2)),
            &RequestMeta::default(),
        )
        .await
        .unwrap();

    let received = wait_for_requests(&pool_service, 1).await;
    assert_eq!(received.len(), 1);
    let body: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
    assert_eq!(body["externalReference"], "pi_5");
    assert_eq!(body["status"], "succeeded");
    assert_eq!(body["participationCode"], "P-3");
    assert_eq!(body["contributorName"], "Awa Diop");
    assert_eq!(body["provider"], "stripe");
}

#[tokio::test]
async fn wallet_and_non_pool_payments_do_not_notify() {
    let provider = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "w_1"})))
        .mount(&provider)
        .await;

    let mut h = Setup::new(&provider.uri()).build();
    let caller = individual("u1", 2);
    let meta = RequestMeta::default();

    h.service
        .initiate(
            json!({"provider": "wallet", "amount": 10, "currency": "€", "context": "cagnotte", "poolId": "p"}),
            Some(&caller),
            &meta,
        )
        .await
        .unwrap();
    h.service
        .initiate(json!({"provider": "paypal", "amount": 10, "currency": "€", "poolId": "p"}), Some(&caller), &meta)
        .await
        .unwrap();
    h.service
        .initiate(json!({"provider": "paypal", "amount": 10, "currency": "€", "context": "cagnotte"}), Some(&caller), &meta)
        .await
        .unwrap();

    assert!(h.drain_effects().is_empty());
}

#[tokio::test]
async fn pool_service_outage_does_not_affect_the_reply() {
    let provider = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "pi_6"})))
        .mount(&provider)
        .await;
    let pool_service = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&pool_service)
        .await;

    let (queue, mut failures) = SideEffectWorker::spawn(alerts(None), pools(Some(pool_service.uri())), 16, 4);
    let h = Setup::new(&provider.uri()).build_with_queue(queue);

    let reply = h
        .service
        .initiate(
            json!({"provider": "paypal", "amount": 10, "currency": "€", "context": "cagnotte", "poolId": "p-2"}),
            Some(&individual("u1", 2)),
            &RequestMeta::default(),
        )
        .await
        .unwrap();
    assert_eq!(reply.status, 200);

    let failure = tokio::time::timeout(Duration::from_secs(3), failures.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(failure.kind, "pool_contribution");
}

#[tokio::test]
async fn denial_posts_masked_fraud_alert() {
    let webhook = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("x-event-type", "fraud.alert"))
        .and(header("x-internal-token", TOKEN))
        .respond_with(ResponseTemplate::new(202))
        .mount(&webhook)
        .await;

    let (queue, _failures) = SideEffectWorker::spawn(alerts(Some(webhook.uri())), pools(None), 16, 4);
    let h = Setup::new("http://provider.invalid").build_with_queue(queue);

    let err = h
        .service
        .initiate(
            json!({"provider": "stripe", "amount": 10, "currency": "€", "cardNumber": "4000056655665556", "cvc": "999"}),
            Some(&individual("u1", 0)),
            &RequestMeta::default(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.body().code.as_deref(), Some("kyc_insufficient"));

    let received = wait_for_requests(&webhook, 1).await;
    assert_eq!(received.len(), 1);
    let body: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
    assert_eq!(body["reason"], "kyc_insufficient");
    assert_eq!(body["user_id"], "u1");
    assert_eq!(body["snapshot"]["cardNumber"], "****5556");
    assert!(body["snapshot"].get("cvc").is_none());
    assert!(!body.to_string().contains("4000056655665556"));
}

#[tokio::test]
async fn failed_alert_delivery_reaches_the_failure_channel() {
    let webhook = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&webhook)
        .await;

    let (queue, mut failures) = SideEffectWorker::spawn(alerts(Some(webhook.uri())), pools(None), 16, 4);
    queue.enqueue(SideEffect::FraudAlert(FraudAlert {
        user_id: "u1".to_string(),
        reason: "blacklist".to_string(),
        provider: "stripe".to_string(),
        amount: None,
        currency: None,
        destination: None,
        details: None,
        snapshot: json!({}),
        raised_at: chrono::Utc::now(),
    }));

    let failure = tokio::time::timeout(Duration::from_secs(3), failures.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(failure.kind, "fraud_alert");
    assert!(failure.error.contains("500"));
}

#[tokio::test]
async fn full_queue_drops_instead_of_blocking() {
    let (queue, mut rx) = SideEffectQueue::channel(1);
    let alert = FraudAlert {
        user_id: "u1".to_string(),
        reason: "velocity_hourly".to_string(),
        provider: "paypal".to_string(),
        amount: None,
        currency: None,
        destination: None,
        details: None,
        snapshot: json!({}),
        raised_at: chrono::Utc::now(),
    };

    queue.enqueue(SideEffect::FraudAlert(alert.clone()));
    queue.enqueue(SideEffect::FraudAlert(alert));

    assert!(rx.try_recv().is_ok());
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn slow_webhook_keeps_deliveries_bounded() {
    let webhook = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(202).set_delay(Duration::from_millis(1500)))
        .mount(&webhook)
        .await;

    let (queue, _failures) = SideEffectWorker::spawn(alerts(Some(webhook.uri())), pools(None), 2, 2);
    let alert = FraudAlert {
        user_id: "u1".to_string(),
        reason: "structuring_pattern".to_string(),
        provider: "paypal".to_string(),
        amount: None,
        currency: None,
        destination: None,
        details: None,
        snapshot: json!({}),
        raised_at: chrono::Utc::now(),
    };
    for _ in 0..50 {
        queue.enqueue(SideEffect::FraudAlert(alert.clone()));
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    tokio::time::sleep(Duration::from_millis(500)).await;
    let in_flight = webhook.received_requests().await.unwrap_or_default().len();
    assert!(in_flight <= 2, "{} deliveries in flight", in_flight);

    // Two running, two queued, one held by the worker awaiting a permit.
    tokio::time::sleep(Duration::from_secs(4)).await;
    let delivered = webhook.received_requests().await.unwrap_or_default().len();
    assert!(delivered >= 2);
    assert!(delivered <= 5, "{} deliveries, the queue should have dropped the rest", delivered);
}
