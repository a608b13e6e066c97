use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Notify;

// =========================================================================
// Mock transports
// =========================================================================

#[derive(Default)]
struct MockTransport {
    results: Mutex<Vec<Result<(), LeadError>>>,
    calls: Mutex<Vec<serde_json::Value>>,
}

impl MockTransport {
    fn with_results(results: Vec<Result<(), LeadError>>) -> Arc<Self> {
        Arc::new(Self { results: Mutex::new(results), calls: Mutex::new(Vec::new()) })
    }

    fn calls(&self) -> Vec<serde_json::Value> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl LeadTransport for MockTransport {
    async fn deliver(&self, lead: &LeadFields) -> Result<(), LeadError> {
        self.calls.lock().unwrap().push(serde_json::to_value(lead).unwrap());
        let mut results = self.results.lock().unwrap();
        if results.is_empty() { Ok(()) } else { results.remove(0) }
    }
}

/// Blocks every delivery until the test releases it.
#[derive(Default)]
struct GatedTransport {
    gate: Notify,
    calls: AtomicUsize,
}

#[async_trait::async_trait]
impl LeadTransport for GatedTransport {
    async fn deliver(&self, _lead: &LeadFields) -> Result<(), LeadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.gate.notified().await;
        Ok(())
    }
}

/// Never answers.
struct HangingTransport;

#[async_trait::async_trait]
impl LeadTransport for HangingTransport {
    async fn deliver(&self, _lead: &LeadFields) -> Result<(), LeadError> {
        std::future::pending().await
    }
}

fn controller(transport: Arc<dyn LeadTransport>) -> LeadFormController {
    LeadFormController::new(transport, Duration::from_secs(15), RetryPolicy::single())
}

fn fill_andrei(ctl: &LeadFormController) {
    assert!(ctl.edit(LeadField::Name, "Andrei"));
    assert!(ctl.edit(LeadField::Email, "a@b.com"));
    assert!(ctl.edit(LeadField::Phone, "0712345678"));
    assert!(ctl.select_service("carotaj"));
    assert!(ctl.edit(LeadField::Message, "need a hole"));
}

fn andrei_fields() -> LeadFields {
    LeadFields {
        name: "Andrei".into(),
        email: "a@b.com".into(),
        phone: "0712345678".into(),
        service: "carotaj".into(),
        message: "need a hole".into(),
    }
}

// =========================================================================
// Initial state
// =========================================================================

#[test]
fn new_form_is_empty_and_idle() {
    let ctl = controller(MockTransport::with_results(vec![]));
    let state = ctl.snapshot();
    assert_eq!(state.status, LeadStatus::Idle);
    assert_eq!(state.fields.name, "");
    assert_eq!(state.fields.email, "");
    assert_eq!(state.fields.phone, "");
    assert_eq!(state.fields.message, "");
    assert_eq!(state.fields.service, site::default_service().id);
    assert!(ctl.can_submit());
}

#[test]
fn first_missing_follows_form_order() {
    let mut fields = LeadFields::default();
    assert_eq!(fields.first_missing(), Some(LeadField::Name));
    fields.name = "A".into();
    fields.email = "e".into();
    assert_eq!(fields.first_missing(), Some(LeadField::Phone));
    fields.phone = "p".into();
    fields.message = "m".into();
    assert_eq!(fields.first_missing(), None);
}

// =========================================================================
// Required fields
// =========================================================================

#[tokio::test]
async fn submit_with_any_empty_field_is_refused_without_call() {
    let free_fields = [LeadField::Name, LeadField::Email, LeadField::Phone, LeadField::Message];
    // Every combination of filled/empty free-text fields except "all filled".
    for mask in 0u8..15 {
        let transport = MockTransport::with_results(vec![]);
        let ctl = controller(transport.clone());
        for (bit, field) in free_fields.iter().enumerate() {
            if mask & (1 << bit) != 0 {
                ctl.edit(*field, "x");
            }
        }

        let outcome = ctl.submit().await;
        assert!(matches!(outcome, SubmitOutcome::Refused(Refusal::MissingField(_))), "mask {mask:04b}");
        assert_eq!(ctl.status(), LeadStatus::Idle, "mask {mask:04b}");
        assert!(transport.calls().is_empty(), "mask {mask:04b}");
    }
}

#[tokio::test]
async fn whitespace_counts_as_filled() {
    let transport = MockTransport::with_results(vec![]);
    let ctl = controller(transport.clone());
    fill_andrei(&ctl);
    ctl.edit(LeadField::Message, " ");
    assert_eq!(ctl.submit().await, SubmitOutcome::Success);
}

// =========================================================================
// Submission lifecycle
// =========================================================================

#[tokio::test]
async fn submit_success_posts_exact_body() {
    let transport = MockTransport::with_results(vec![Ok(())]);
    let ctl = controller(transport.clone());
    fill_andrei(&ctl);

    assert_eq!(ctl.submit().await, SubmitOutcome::Success);
    assert_eq!(ctl.status(), LeadStatus::Success);

    let calls = transport.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0],
        serde_json::json!({
            "name": "Andrei",
            "email": "a@b.com",
            "phone": "0712345678",
            "service": "carotaj",
            "message": "need a hole"
        })
    );
}

#[tokio::test]
async fn submit_failure_keeps_fields() {
    let transport = MockTransport::with_results(vec![Err(LeadError::Request("connection reset".into()))]);
    let ctl = controller(transport.clone());
    fill_andrei(&ctl);

    assert_eq!(ctl.submit().await, SubmitOutcome::Error);
    let state = ctl.snapshot();
    assert_eq!(state.status, LeadStatus::Error);
    assert_eq!(state.fields, andrei_fields());
    assert_eq!(transport.calls().len(), 1);
}

#[tokio::test]
async fn non_success_status_maps_to_error() {
    let transport = MockTransport::with_results(vec![Err(LeadError::Status { status: 404 })]);
    let ctl = controller(transport);
    fill_andrei(&ctl);
    assert_eq!(ctl.submit().await, SubmitOutcome::Error);
    assert_eq!(ctl.status(), LeadStatus::Error);
}

#[tokio::test]
async fn submitting_is_visible_during_call_and_blocks_resubmit() {
    let transport = Arc::new(GatedTransport::default());
    let ctl = Arc::new(controller(transport.clone()));
    fill_andrei(&ctl);

    let task = tokio::spawn({
        let ctl = ctl.clone();
        async move { ctl.submit().await }
    });
    while transport.calls.load(Ordering::SeqCst) == 0 {
        tokio::task::yield_now().await;
    }

    assert_eq!(ctl.status(), LeadStatus::Submitting);
    assert!(!ctl.can_submit());
    assert_eq!(ctl.submit().await, SubmitOutcome::Refused(Refusal::InFlight));
    assert_eq!(transport.calls.load(Ordering::SeqCst), 1);

    // Edits land but do not change the status.
    assert!(ctl.edit(LeadField::Message, "updated"));
    assert_eq!(ctl.status(), LeadStatus::Submitting);

    transport.gate.notify_one();
    assert_eq!(task.await.unwrap(), SubmitOutcome::Success);
    assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
}

// =========================================================================
// Error recovery
// =========================================================================

#[tokio::test]
async fn edit_in_error_returns_to_idle() {
    let transport = MockTransport::with_results(vec![Err(LeadError::Request("down".into()))]);
    let ctl = controller(transport);
    fill_andrei(&ctl);
    assert_eq!(ctl.submit().await, SubmitOutcome::Error);

    assert!(ctl.edit(LeadField::Phone, "0799999999"));
    assert_eq!(ctl.status(), LeadStatus::Idle);
    assert!(ctl.edit(LeadField::Phone, "0711111111"));
    assert_eq!(ctl.status(), LeadStatus::Idle);
}

#[tokio::test]
async fn retry_directly_from_error() {
    let transport = MockTransport::with_results(vec![Err(LeadError::Request("down".into())), Ok(())]);
    let ctl = controller(transport.clone());
    fill_andrei(&ctl);

    assert_eq!(ctl.submit().await, SubmitOutcome::Error);
    assert!(ctl.can_submit());
    assert_eq!(ctl.submit().await, SubmitOutcome::Success);
    assert_eq!(transport.calls().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn hanging_webhook_times_out_into_error() {
    let ctl = LeadFormController::new(Arc::new(HangingTransport), Duration::from_secs(5), RetryPolicy::single());
    fill_andrei(&ctl);

    assert_eq!(ctl.submit().await, SubmitOutcome::Error);
    assert_eq!(ctl.status(), LeadStatus::Error);
    assert!(ctl.can_submit());
}

#[tokio::test(start_paused = true)]
async fn cancelled_submit_settles_on_error() {
    let ctl = LeadFormController::new(Arc::new(HangingTransport), Duration::from_secs(60), RetryPolicy::single());
    fill_andrei(&ctl);

    assert!(tokio::time::timeout(Duration::from_secs(1), ctl.submit()).await.is_err());

    assert_eq!(ctl.status(), LeadStatus::Error);
    assert!(ctl.can_submit());
    assert_eq!(ctl.snapshot().fields, andrei_fields());
    // The gate is open again; this attempt runs to its own timeout.
    assert_eq!(ctl.submit().await, SubmitOutcome::Error);
}

#[tokio::test]
async fn aborted_submit_task_unblocks_resubmit() {
    let transport = Arc::new(GatedTransport::default());
    let ctl = Arc::new(controller(transport.clone()));
    fill_andrei(&ctl);

    let task = tokio::spawn({
        let ctl = ctl.clone();
        async move { ctl.submit().await }
    });
    while transport.calls.load(Ordering::SeqCst) == 0 {
        tokio::task::yield_now().await;
    }
    task.abort();
    assert!(task.await.unwrap_err().is_cancelled());
    assert_eq!(ctl.status(), LeadStatus::Error);

    let retry = tokio::spawn({
        let ctl = ctl.clone();
        async move { ctl.submit().await }
    });
    while transport.calls.load(Ordering::SeqCst) == 1 {
        tokio::task::yield_now().await;
    }
    transport.gate.notify_one();
    assert_eq!(retry.await.unwrap(), SubmitOutcome::Success);
}

// =========================================================================
// Retry policy
// =========================================================================

#[tokio::test(start_paused = true)]
async fn retry_policy_retries_transient_failures() {
    let transport = MockTransport::with_results(vec![Err(LeadError::Status { status: 503 }), Ok(())]);
    let retry = RetryPolicy { max_attempts: 3, backoff: Duration::from_millis(200) };
    let ctl = LeadFormController::new(transport.clone(), Duration::from_secs(5), retry);
    fill_andrei(&ctl);

    assert_eq!(ctl.submit().await, SubmitOutcome::Success);
    assert_eq!(transport.calls().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn retry_policy_stops_at_max_attempts() {
    let transport = MockTransport::with_results(vec![
        Err(LeadError::Request("a".into())),
        Err(LeadError::Request("b".into())),
        Err(LeadError::Request("c".into())),
        Ok(()),
    ]);
    let retry = RetryPolicy { max_attempts: 3, backoff: Duration::from_millis(10) };
    let ctl = LeadFormController::new(transport.clone(), Duration::from_secs(5), retry);
    fill_andrei(&ctl);

    assert_eq!(ctl.submit().await, SubmitOutcome::Error);
    assert_eq!(transport.calls().len(), 3);
}

#[tokio::test]
async fn retry_policy_skips_client_errors() {
    let transport = MockTransport::with_results(vec![Err(LeadError::Status { status: 400 }), Ok(())]);
    let retry = RetryPolicy { max_attempts: 3, backoff: Duration::ZERO };
    let ctl = LeadFormController::new(transport.clone(), Duration::from_secs(5), retry);
    fill_andrei(&ctl);

    assert_eq!(ctl.submit().await, SubmitOutcome::Error);
    assert_eq!(transport.calls().len(), 1);
}

// =========================================================================
// Success acknowledgement
// =========================================================================

#[tokio::test]
async fn dismiss_resets_form() {
    let transport = MockTransport::with_results(vec![]);
    let ctl = controller(transport);
    fill_andrei(&ctl);
    assert!(ctl.select_service("demolare"));
    assert_eq!(ctl.submit().await, SubmitOutcome::Success);

    assert!(ctl.dismiss());
    assert_eq!(ctl.snapshot(), FormState::default());
    assert_eq!(ctl.snapshot().fields.service, "carotaj");
}

#[tokio::test]
async fn success_ignores_edits_and_submits_until_dismissed() {
    let transport = MockTransport::with_results(vec![]);
    let ctl = controller(transport.clone());
    fill_andrei(&ctl);
    assert_eq!(ctl.submit().await, SubmitOutcome::Success);

    assert!(!ctl.edit(LeadField::Name, "Ion"));
    assert_eq!(ctl.snapshot().fields.name, "Andrei");
    assert_eq!(ctl.submit().await, SubmitOutcome::Refused(Refusal::AwaitingDismiss));
    assert_eq!(transport.calls().len(), 1);
}

#[test]
fn dismiss_outside_success_is_noop() {
    let ctl = controller(MockTransport::with_results(vec![]));
    ctl.edit(LeadField::Name, "Andrei");
    assert!(!ctl.dismiss());
    assert_eq!(ctl.snapshot().fields.name, "Andrei");
}

#[test]
fn unknown_service_is_rejected() {
    let ctl = controller(MockTransport::with_results(vec![]));
    assert!(!ctl.select_service("excavare"));
    assert_eq!(ctl.snapshot().fields.service, "carotaj");
    assert!(ctl.select_service("taiere"));
    assert_eq!(ctl.snapshot().fields.service, "taiere");
}

#[tokio::test(start_paused = true)]
async fn from_config_without_url_simulates_success() {
    let config = LeadConfig { simulated_delay: Duration::from_millis(1500), ..LeadConfig::default() };
    let ctl = LeadFormController::from_config(&config).unwrap();
    fill_andrei(&ctl);

    let start = tokio::time::Instant::now();
    assert_eq!(ctl.submit().await, SubmitOutcome::Success);
    assert!(start.elapsed() >= Duration::from_millis(1500));
}
