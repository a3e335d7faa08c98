/// End-to-end form flows.
/// The forms submit through `ApiTransport` to the real router served on a
/// local port, or through scripted transports for failure paths.
use async_trait::async_trait;
use lendkaki_api::api::router;
use lendkaki_api::config::Config;
use lendkaki_api::errors::AppError;
use lendkaki_api::form::{
    FormPhase, MultiStepForm, QuickForm, QuickPhase, SubmitOutcome, SUBMIT_FAILED_MESSAGE,
};
use lendkaki_api::handlers::AppState;
use lendkaki_api::models::{Attribution, LoanPurpose, NewLeadRecord, Submission};
use lendkaki_api::schemas::{ConsentPolicy, Step};
use lendkaki_api::store::LeadStore;
use lendkaki_api::transport::{
    ApiTransport, ConversionEvent, ConversionTracker, Delivery, LeadTransport, Submitter,
    TransportError,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct RecordingStore {
    rows: Mutex<Vec<NewLeadRecord>>,
}

#[async_trait]
impl LeadStore for RecordingStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn insert(&self, record: &NewLeadRecord) -> Result<(), AppError> {
        self.rows.lock().unwrap().push(record.clone());
        Ok(())
    }
}

async fn spawn_api() -> String {
    spawn_api_with(None).await
}

async fn spawn_api_with(store: Option<Arc<dyn LeadStore>>) -> String {
    let app = router(Arc::new(AppState {
        config: Config::default(),
        store,
    }));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

#[derive(Default)]
struct CountingTracker {
    events: Mutex<Vec<ConversionEvent>>,
}

impl ConversionTracker for CountingTracker {
    fn track_lead(&self, event: &ConversionEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

struct FailingTransport {
    calls: AtomicUsize,
}

#[async_trait]
impl LeadTransport for FailingTransport {
    async fn send(&self, _submission: &Submission) -> Result<Delivery, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(TransportError::Network("connection reset".to_string()))
    }
}

struct NeverResolves;

#[async_trait]
impl LeadTransport for NeverResolves {
    async fn send(&self, _submission: &Submission) -> Result<Delivery, TransportError> {
        std::future::pending().await
    }
}

fn fill_personal(form: &mut MultiStepForm) {
    let draft = form.draft_mut().unwrap();
    draft.full_name = Some("Tan Wei".to_string());
    draft.email = Some("tan@x.com".to_string());
    draft.phone = Some("91234567".to_string());
    draft.nationality = Some("citizen_pr".to_string());
    draft.loan_purpose = Some("personal".to_string());
}

fn fill_employment(form: &mut MultiStepForm) {
    let draft = form.draft_mut().unwrap();
    draft.employment_status = Some("employed".to_string());
    draft.monthly_income = Some(4000.0);
}

#[tokio::test]
async fn test_multi_step_form_submits_to_api() {
    let base_url = spawn_api().await;
    let tracker = Arc::new(CountingTracker::default());
    let submitter = Submitter::new(
        Arc::new(ApiTransport::new(&base_url).unwrap()),
        ConversionEvent::lead_form("Loan Application"),
    )
    .with_tracker(tracker.clone());
    let mut form = MultiStepForm::new(submitter);

    assert!(form.advance());
    fill_personal(&mut form);
    assert!(form.advance());
    assert_eq!(form.phase(), FormPhase::Step(Step::Employment));

    fill_employment(&mut form);
    let outcome = form.submit().await;

    assert_eq!(outcome, SubmitOutcome::Delivered(Delivery::Confirmed));
    assert_eq!(form.phase(), FormPhase::Success);
    assert_eq!(tracker.events.lock().unwrap().len(), 1);

    // Success is terminal.
    assert!(form.draft_mut().is_none());
    assert!(!form.retreat());
    assert_eq!(form.submit().await, SubmitOutcome::NotReady);
}

#[tokio::test]
async fn test_invalid_last_step_is_not_sent() {
    let transport = Arc::new(FailingTransport {
        calls: AtomicUsize::new(0),
    });
    let mut form = MultiStepForm::new(Submitter::new(
        transport.clone(),
        ConversionEvent::lead_form("Loan Application"),
    ));
    form.advance();
    fill_personal(&mut form);
    form.advance();

    let outcome = form.submit().await;

    assert_eq!(outcome, SubmitOutcome::Invalid);
    assert_eq!(form.phase(), FormPhase::Step(Step::Employment));
    assert!(form.errors().contains("employmentStatus"));
    assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_transport_failure_returns_to_last_step_with_root_error() {
    let transport = Arc::new(FailingTransport {
        calls: AtomicUsize::new(0),
    });
    let tracker = Arc::new(CountingTracker::default());
    let mut form = MultiStepForm::new(
        Submitter::new(transport.clone(), ConversionEvent::lead_form("Loan Application"))
            .with_tracker(tracker.clone()),
    );
    form.advance();
    fill_personal(&mut form);
    form.advance();
    fill_employment(&mut form);

    let outcome = form.submit().await;

    assert_eq!(outcome, SubmitOutcome::Failed);
    assert_eq!(form.phase(), FormPhase::Error);
    assert_eq!(form.current_step(), Some(Step::Employment));
    assert_eq!(form.root_error(), Some(SUBMIT_FAILED_MESSAGE));
    assert!(tracker.events.lock().unwrap().is_empty());
    // No automatic retry.
    assert_eq!(transport.calls.load(Ordering::SeqCst), 1);

    // The user can edit and try again.
    assert!(form.draft_mut().is_some());
    assert_eq!(form.submit().await, SubmitOutcome::Failed);
    assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_in_flight_submission_blocks_second_submit() {
    let mut form = MultiStepForm::new(Submitter::new(
        Arc::new(NeverResolves),
        ConversionEvent::lead_form("Loan Application"),
    ));
    form.advance();
    fill_personal(&mut form);
    form.advance();
    fill_employment(&mut form);

    let pending = tokio::time::timeout(Duration::from_millis(50), form.submit()).await;
    assert!(pending.is_err());

    assert_eq!(form.phase(), FormPhase::Submitting);
    assert!(form.draft_mut().is_none());
    assert!(!form.advance());
    assert_eq!(form.submit().await, SubmitOutcome::NotReady);
}

#[tokio::test]
async fn test_quick_form_submits_to_api() {
    let base_url = spawn_api().await;
    let mut form = QuickForm::new(Submitter::new(
        Arc::new(ApiTransport::new(&base_url).unwrap()),
        ConversionEvent::lead_form("Bridging Loan Application"),
    ))
    .with_purpose(LoanPurpose::Bridging);

    {
        let draft = form.draft_mut().unwrap();
        draft.full_name = Some("Lim Mei Ling".to_string());
        draft.phone = Some("81234567".to_string());
        draft.email = Some("mei@example.sg".to_string());
        draft.loan_amount = Some(80_000.0);
        draft.nationality = Some("Singaporean_PR".to_string());
    }

    // Terms not yet ticked.
    assert_eq!(form.submit().await, SubmitOutcome::Invalid);
    assert_eq!(
        form.errors().get("agreedToTerms"),
        Some(&["You must agree to the terms to proceed.".to_string()][..])
    );
    assert_eq!(form.phase(), QuickPhase::Editing);

    form.draft_mut().unwrap().agreed_to_terms = Some(true);
    let outcome = form.submit().await;

    assert_eq!(outcome, SubmitOutcome::Delivered(Delivery::Confirmed));
    assert_eq!(form.phase(), QuickPhase::Success);
    assert!(form.errors().is_empty());
}

#[tokio::test]
async fn test_quick_form_failure_keeps_editing() {
    let mut form = QuickForm::new(Submitter::new(
        Arc::new(FailingTransport {
            calls: AtomicUsize::new(0),
        }),
        ConversionEvent::lead_form("Personal Loan Application"),
    ))
    .with_purpose(LoanPurpose::Personal);

    {
        let draft = form.draft_mut().unwrap();
        draft.full_name = Some("Tan Wei".to_string());
        draft.phone = Some("91234567".to_string());
        draft.email = Some("tan@x.com".to_string());
        draft.loan_amount = Some(5000.0);
        draft.nationality = Some("foreigner".to_string());
        draft.agreed_to_terms = Some(true);
    }

    assert_eq!(form.submit().await, SubmitOutcome::Failed);
    assert_eq!(form.phase(), QuickPhase::Editing);
    assert_eq!(form.root_error(), Some(SUBMIT_FAILED_MESSAGE));
}

#[tokio::test]
async fn test_landing_attribution_reaches_stored_row() {
    let store = Arc::new(RecordingStore::default());
    let base_url = spawn_api_with(Some(store.clone())).await;

    let landing = url::Url::parse(
        "https://lendkaki.sg/apply?v=urgent&utm_source=facebook&utm_medium=cpc&utm_campaign=q4",
    )
    .unwrap();
    let submitter = Submitter::new(
        Arc::new(ApiTransport::new(&base_url).unwrap()),
        ConversionEvent::lead_form("Loan Application"),
    )
    .with_attribution(Attribution::from_landing_url(&landing));
    assert_eq!(submitter.attribution().variant.as_deref(), Some("urgent"));

    let mut form = QuickForm::new(submitter).with_purpose(LoanPurpose::Personal);
    {
        let draft = form.draft_mut().unwrap();
        draft.full_name = Some("Tan Wei".to_string());
        draft.phone = Some("91234567".to_string());
        draft.email = Some("tan@x.com".to_string());
        draft.loan_amount = Some(5000.0);
        draft.nationality = Some("citizen_pr".to_string());
        draft.agreed_to_terms = Some(true);
    }

    assert_eq!(
        form.submit().await,
        SubmitOutcome::Delivered(Delivery::Confirmed)
    );

    let rows = store.rows.lock().unwrap();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.utm_source.as_deref(), Some("facebook"));
    assert_eq!(row.utm_medium.as_deref(), Some("cpc"));
    assert_eq!(row.utm_campaign.as_deref(), Some("q4"));
    assert_eq!(row.utm_content, None);
    assert_eq!(row.landing_page.as_deref(), Some("/apply"));
    assert_eq!(row.variant.as_deref(), Some("urgent"));
}

#[tokio::test]
async fn test_required_consent_blocks_unticked_full_form() {
    let config = Config {
        full_form_consent: ConsentPolicy::Required,
        ..Config::default()
    };
    let transport = Arc::new(FailingTransport {
        calls: AtomicUsize::new(0),
    });
    let mut form = MultiStepForm::new(Submitter::new(
        transport.clone(),
        ConversionEvent::lead_form("Loan Application"),
    ))
    .with_consent(config.full_form_consent);
    form.advance();
    fill_personal(&mut form);
    form.advance();
    fill_employment(&mut form);

    let outcome = form.submit().await;

    assert_eq!(outcome, SubmitOutcome::Invalid);
    assert_eq!(form.phase(), FormPhase::Step(Step::Employment));
    assert_eq!(
        form.errors().get("agreedToTerms"),
        Some(&["You must agree to the terms to proceed.".to_string()][..])
    );
    assert_eq!(transport.calls.load(Ordering::SeqCst), 0);

    // Ticking the box lets the lead through to the transport.
    form.draft_mut().unwrap().agreed_to_terms = Some(true);
    assert_eq!(form.submit().await, SubmitOutcome::Failed);
    assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
}
