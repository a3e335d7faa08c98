/// Integration tests with mocked external endpoints
/// Exercises the transports and the Supabase store against wiremock servers.
use lendkaki_api::config::SupabaseConfig;
use lendkaki_api::errors::AppError;
use lendkaki_api::models::{
    Attribution, FullLead, Lead, LoanPurpose, Nationality, NewLeadRecord, QuickLead, Submission,
    EmploymentStatus,
};
use lendkaki_api::store::{LeadStore, SupabaseLeadStore};
use lendkaki_api::transport::{
    ApiTransport, Delivery, LeadTransport, TransportError, WebhookTransport,
};
use serde_json::json;
use wiremock::matchers::{body_json, body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn quick_submission() -> Submission {
    Submission {
        lead: Lead::Quick(QuickLead {
            full_name: "Tan Wei".to_string(),
            phone: "91234567".to_string(),
            email: "tan@x.com".to_string(),
            loan_amount: 5000.0,
            loan_purpose: LoanPurpose::Medical,
            nationality: Nationality::CitizenPr,
            agreed_to_terms: true,
        }),
        attribution: Attribution {
            utm_source: Some("google".to_string()),
            ..Default::default()
        },
    }
}

fn full_lead() -> Lead {
    Lead::Full(FullLead {
        loan_amount: 25_000.0,
        tenure: 24,
        full_name: "Lim Mei Ling".to_string(),
        email: "mei@example.sg".to_string(),
        phone: "81234567".to_string(),
        nationality: Nationality::Foreigner,
        loan_purpose: LoanPurpose::Business,
        employment_status: EmploymentStatus::SelfEmployed,
        monthly_income: 6500.0,
        company: Some("Mei Trading".to_string()),
        agreed_to_terms: None,
    })
}

#[tokio::test]
async fn test_webhook_posts_spreadsheet_row() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/exec"))
        .and(body_json(json!({
            "name": "Tan Wei",
            "phone": "91234567",
            "email": "tan@x.com",
            "amount": "5000",
            "purpose": "Medical",
            "nationality": "Singaporean_PR"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let transport = WebhookTransport::new(format!("{}/exec", mock_server.uri())).unwrap();
    let delivery = transport.send(&quick_submission()).await.unwrap();

    assert_eq!(delivery, Delivery::Dispatched);
}

#[tokio::test]
async fn test_webhook_ignores_remote_failure_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Script error"))
        .mount(&mock_server)
        .await;

    let transport = WebhookTransport::new(mock_server.uri()).unwrap();
    let delivery = transport.send(&quick_submission()).await.unwrap();

    // Sent, not confirmed: the remote outcome is not inspected.
    assert_eq!(delivery, Delivery::Dispatched);
}

#[tokio::test]
async fn test_webhook_unreachable_is_network_error() {
    // Nothing listens on port 9 locally.
    let transport = WebhookTransport::new("http://127.0.0.1:9/exec").unwrap();
    let result = transport.send(&quick_submission()).await;

    assert!(matches!(result, Err(TransportError::Network(_))));
}

#[tokio::test]
async fn test_api_transport_confirms_on_created() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/leads"))
        .and(body_partial_json(json!({
            "form": "quick",
            "fullName": "Tan Wei",
            "nationality": "citizen_pr",
            "utm_source": "google"
        })))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({"success": true, "message": "Application submitted successfully"})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let transport = ApiTransport::new(&mock_server.uri()).unwrap();
    let delivery = transport.send(&quick_submission()).await.unwrap();

    assert_eq!(delivery, Delivery::Confirmed);
}

#[tokio::test]
async fn test_api_transport_treats_non_2xx_as_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/leads"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "Validation failed",
            "details": {"phone": ["Please enter a valid Singapore phone number"]}
        })))
        .mount(&mock_server)
        .await;

    let transport = ApiTransport::new(&mock_server.uri()).unwrap();
    let result = transport.send(&quick_submission()).await;

    assert!(matches!(
        result,
        Err(TransportError::Rejected { status: 400 })
    ));
}

#[tokio::test]
async fn test_supabase_insert_sends_service_role_headers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/leads"))
        .and(header("apikey", "service-role-key"))
        .and(header("Authorization", "Bearer service-role-key"))
        .and(body_partial_json(json!({
            "form_kind": "full",
            "loan_amount": 25000.0,
            "loan_purpose": "business",
            "tenure": 24,
            "full_name": "Lim Mei Ling",
            "nationality": "foreigner",
            "employment_status": "self-employed",
            "company": "Mei Trading",
            "utm_campaign": "sme"
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = SupabaseLeadStore::new(&SupabaseConfig {
        url: mock_server.uri(),
        service_role_key: "service-role-key".to_string(),
    })
    .unwrap();

    let attribution = Attribution {
        utm_campaign: Some("sme".to_string()),
        ..Default::default()
    };
    let record = NewLeadRecord::new(&full_lead(), &attribution);

    store.insert(&record).await.unwrap();
}

#[tokio::test]
async fn test_supabase_rejection_is_persistence_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/leads"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"message": "Invalid API key"})),
        )
        .mount(&mock_server)
        .await;

    let store = SupabaseLeadStore::new(&SupabaseConfig {
        url: mock_server.uri(),
        service_role_key: "wrong".to_string(),
    })
    .unwrap();
    let record = NewLeadRecord::new(&full_lead(), &Attribution::default());

    let result = store.insert(&record).await;
    match result {
        Err(AppError::PersistenceError(msg)) => assert!(msg.contains("401")),
        other => panic!("Expected persistence error, got {:?}", other),
    }
}
