mod support;

use resume_pay::application::InitiatePaymentRequest;
use resume_pay::domain::{DomainError, TransactionStatus};
use resume_pay::ports::TransactionRepositoryPort;
use support::{harness, FakeProvider, Scripted};

fn request(amount: &str, from: &str) -> InitiatePaymentRequest {
    InitiatePaymentRequest {
        amount: amount.to_string(),
        from: from.to_string(),
        description: None,
    }
}

#[tokio::test]
async fn test_initiate_records_pending_transaction() {
    let h = harness(FakeProvider::new().with_reference("abc123"));

    let response = h
        .service
        .initiate(request("300", "650000000"))
        .await
        .unwrap();

    assert!(response.success);
    assert_eq!(response.reference, "abc123");
    assert_eq!(response.ussd_code.as_deref(), Some("*126#"));

    let stored = h.repository.find_by_reference("abc123").await.unwrap().unwrap();
    assert_eq!(stored.status, TransactionStatus::Pending);
    assert_eq!(stored.amount, "300");
    assert_eq!(stored.phone, "650000000");
    assert!(stored.external_reference.is_some());
    assert!(!stored.webhook_received);

    let sent = h.provider.collected();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].amount, "300");
    assert_eq!(sent[0].currency, "XAF");
    assert_eq!(sent[0].from, "237650000000");
    assert_eq!(sent[0].description, "Resume download");
    assert_eq!(Some(&sent[0].external_reference), stored.external_reference.as_ref());
}

#[tokio::test]
async fn test_each_initiation_gets_its_own_references() {
    let h = harness(FakeProvider::new());

    let first = h.service.initiate(request("300", "650000000")).await.unwrap();
    let second = h.service.initiate(request("300", "650000000")).await.unwrap();

    assert_ne!(first.reference, second.reference);
    let sent = h.provider.collected();
    assert_ne!(sent[0].external_reference, sent[1].external_reference);
    assert_eq!(h.repository.len().await, 2);
}

#[tokio::test]
async fn test_initiate_rejects_invalid_input_without_network_calls() {
    let h = harness(FakeProvider::new());

    for (amount, from) in [("", "650000000"), ("300", ""), ("  ", "650000000"), ("300", "   ")] {
        let err = h.service.initiate(request(amount, from)).await.unwrap_err();
        assert!(
            matches!(err, DomainError::ValidationError(_)),
            "amount={amount:?} from={from:?} gave {err:?}"
        );
    }

    assert_eq!(h.provider.token_calls(), 0);
    assert_eq!(h.provider.collect_calls(), 0);
    assert!(h.repository.is_empty().await);
}

#[tokio::test]
async fn test_formatted_phone_is_sent_compact() {
    let h = harness(FakeProvider::new().with_reference("abc123"));

    h.service
        .initiate(request("12.5", "677-000-000"))
        .await
        .unwrap();

    let sent = h.provider.collected();
    assert_eq!(sent[0].from, "237677000000");
    assert_eq!(sent[0].amount, "12.5");

    let stored = h.repository.find_by_reference("abc123").await.unwrap().unwrap();
    assert_eq!(stored.phone, "677-000-000");
    assert_eq!(stored.amount, "12.5");
}

#[tokio::test]
async fn test_collect_failure_is_not_recorded_or_retried() {
    let h = harness(FakeProvider::new().failing_collect(400));

    let err = h.service.initiate(request("300", "650000000")).await.unwrap_err();

    assert!(matches!(err, DomainError::InitiationError(_)));
    assert_eq!(h.provider.collect_calls(), 1);
    assert!(h.repository.is_empty().await);
}

#[tokio::test]
async fn test_token_failure_is_authentication_error() {
    let h = harness(FakeProvider::new().failing_token());

    let err = h.service.initiate(request("300", "650000000")).await.unwrap_err();

    assert!(matches!(err, DomainError::AuthenticationError(_)));
    assert_eq!(h.provider.collect_calls(), 0);
    assert!(h.repository.is_empty().await);
}

#[tokio::test]
async fn test_token_is_reused_across_calls() {
    let h = harness(FakeProvider::new());

    h.service.initiate(request("300", "650000000")).await.unwrap();
    h.service.initiate(request("500", "670000000")).await.unwrap();
    h.service.sync_status("ref-1").await.unwrap();

    assert_eq!(h.provider.token_calls(), 1);
}

#[tokio::test]
async fn test_sync_status_never_leaves_terminal_state() {
    let h = harness(
        FakeProvider::new()
            .with_reference("abc123")
            .with_statuses(vec![
                Scripted::Status("PENDING"),
                Scripted::Status("SUCCESSFUL"),
                Scripted::Status("FAILED"),
                Scripted::Status("PENDING"),
            ]),
    );
    h.service.initiate(request("300", "650000000")).await.unwrap();

    let seen = [
        h.service.sync_status("abc123").await.unwrap(),
        h.service.sync_status("abc123").await.unwrap(),
        h.service.sync_status("abc123").await.unwrap(),
        h.service.sync_status("abc123").await.unwrap(),
    ];
    assert_eq!(
        seen,
        [
            Some(TransactionStatus::Pending),
            Some(TransactionStatus::Successful),
            Some(TransactionStatus::Failed),
            Some(TransactionStatus::Pending),
        ]
    );

    let stored = h.repository.find_by_reference("abc123").await.unwrap().unwrap();
    assert_eq!(stored.status, TransactionStatus::Successful);
    assert_eq!(stored.operator.as_deref(), Some("MTN"));
    assert_eq!(stored.operator_code.as_deref(), Some("CP201027T00005"));
    assert_eq!(stored.phone, "650000000");
}

#[tokio::test]
async fn test_unrecognized_status_is_none_and_ledger_untouched() {
    let h = harness(
        FakeProvider::new()
            .with_reference("abc123")
            .with_statuses(vec![Scripted::Status("PROCESSING")]),
    );
    h.service.initiate(request("300", "650000000")).await.unwrap();

    assert_eq!(h.service.sync_status("abc123").await.unwrap(), None);

    let stored = h.repository.find_by_reference("abc123").await.unwrap().unwrap();
    assert_eq!(stored.status, TransactionStatus::Pending);
}

#[tokio::test]
async fn test_network_error_is_transient() {
    let h = harness(FakeProvider::new().with_statuses(vec![Scripted::NetworkError]));

    let err = h.service.sync_status("abc123").await.unwrap_err();

    assert!(matches!(err, DomainError::TransientQueryError(_)));
    assert_eq!(h.provider.status_calls(), 1);
    assert!(h.repository.is_empty().await);
}

#[tokio::test]
async fn test_empty_reference_is_rejected() {
    let h = harness(FakeProvider::new());

    let err = h.service.sync_status("  ").await.unwrap_err();

    assert!(matches!(err, DomainError::ValidationError(_)));
    assert_eq!(h.provider.status_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_rate_limited_status_read_is_retried() {
    let h = harness(FakeProvider::new().with_statuses(vec![
        Scripted::RateLimited,
        Scripted::RateLimited,
        Scripted::Status("SUCCESSFUL"),
    ]));

    let status = h.service.sync_status("abc123").await.unwrap();

    assert_eq!(status, Some(TransactionStatus::Successful));
    assert_eq!(h.provider.status_calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_gives_up_after_attempt_budget() {
    let h = harness(FakeProvider::new().with_statuses(vec![
        Scripted::RateLimited,
        Scripted::RateLimited,
        Scripted::RateLimited,
        Scripted::Status("SUCCESSFUL"),
    ]));

    let err = h.service.sync_status("abc123").await.unwrap_err();

    assert!(matches!(err, DomainError::TransientQueryError(_)));
    assert_eq!(h.provider.status_calls(), 3);
}

#[tokio::test]
async fn test_unauthorized_status_read_drops_cached_token() {
    let h = harness(FakeProvider::new().with_statuses(vec![
        Scripted::Unauthorized,
        Scripted::Status("PENDING"),
    ]));

    let err = h.service.sync_status("abc123").await.unwrap_err();
    assert!(matches!(err, DomainError::TransientQueryError(_)));
    assert_eq!(h.provider.token_calls(), 1);

    h.service.sync_status("abc123").await.unwrap();
    assert_eq!(h.provider.token_calls(), 2);
}

#[tokio::test]
async fn test_status_for_unknown_reference_creates_record() {
    let h = harness(FakeProvider::new().with_statuses(vec![Scripted::Status("SUCCESSFUL")]));

    h.service.sync_status("remote-only").await.unwrap();

    let stored = h
        .repository
        .find_by_reference("remote-only")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, TransactionStatus::Successful);
    assert_eq!(stored.amount, "300");
    assert_eq!(stored.phone, "");
}
