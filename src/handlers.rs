use crate::calculator::{RepaymentQuery, RepaymentSummary};
use crate::config::Config;
use crate::errors::{AppError, ResultExt};
use crate::models::{Attribution, FieldErrors, FormKind, Lead, NewLeadRecord};
use crate::schemas::{self, ConsentPolicy};
use crate::store::LeadStore;
use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Datastore for validated leads. `None` means log-only mode.
    pub store: Option<Arc<dyn LeadStore>>,
}

/// Response for an accepted lead.
#[derive(Debug, Serialize)]
pub struct LeadCreatedResponse {
    pub success: bool,
    pub message: String,
}

/// Health check endpoint.
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "lendkaki-api",
            "version": env!("CARGO_PKG_VERSION"),
            "persistence": state.store.as_ref().map(|s| s.name()).unwrap_or("log-only"),
        })),
    )
}

/// POST /api/leads
///
/// Flow:
/// 1. Parse the JSON object and strip attribution keys.
/// 2. Pick the schema from the `form` discriminator, or try full then quick.
/// 3. Insert into the configured datastore, or log the lead when none is set.
///
/// Resubmissions are not deduplicated.
pub async fn create_lead(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<(StatusCode, Json<LeadCreatedResponse>), AppError> {
    // Landing pages do not always send a JSON content type, so the raw body
    // is parsed whatever the header says.
    let payload: Value = serde_json::from_slice(&body).map_err(|e| {
        tracing::debug!("Rejected lead body: {}", e);
        AppError::BadRequest("Invalid JSON body".to_string())
    })?;
    let Value::Object(mut body) = payload else {
        return Err(AppError::BadRequest(
            "Request body must be a JSON object".to_string(),
        ));
    };

    let attribution = take_attribution(&mut body);
    let form = take_form_kind(&mut body)?;
    let lead = validate_lead_body(&body, form, state.config.full_form_consent)?;

    tracing::info!(
        "📨 Lead received: form={}, source={}",
        lead.kind().as_str(),
        attribution.utm_source.as_deref().unwrap_or("direct")
    );

    let record = NewLeadRecord::new(&lead, &attribution);
    match &state.store {
        Some(store) => {
            store
                .insert(&record)
                .await
                .with_context(|| format!("Saving lead via {}", store.name()))?;
        }
        None => {
            tracing::info!(
                lead = ?lead,
                attribution = ?attribution,
                "Lead received (no datastore configured)"
            );
        }
    }

    Ok((
        StatusCode::CREATED,
        Json(LeadCreatedResponse {
            success: true,
            message: "Application submitted successfully".to_string(),
        }),
    ))
}

/// GET /api/calculator?amount=&tenure=&rate=
pub async fn calculate_repayment(
    query: Result<Query<RepaymentQuery>, QueryRejection>,
) -> Result<Json<RepaymentSummary>, AppError> {
    let Query(query) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;
    query.validate()?;
    Ok(Json(RepaymentSummary::from(query)))
}

/// Remove attribution keys from the body. Blank values count as absent.
fn take_attribution(body: &mut Map<String, Value>) -> Attribution {
    let mut take = |key: &str| match body.remove(key) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s).filter(|s| !s.trim().is_empty()),
        Some(other) => Some(other.to_string()),
    };

    Attribution {
        utm_source: take("utm_source"),
        utm_medium: take("utm_medium"),
        utm_campaign: take("utm_campaign"),
        utm_content: take("utm_content"),
        utm_term: take("utm_term"),
        landing_page: take("landing_page"),
        variant: take("variant"),
    }
}

/// Remove and parse the optional `form` discriminator.
fn take_form_kind(body: &mut Map<String, Value>) -> Result<Option<FormKind>, AppError> {
    match body.remove("form") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(kind)) if FormKind::parse(&kind).is_some() => Ok(FormKind::parse(&kind)),
        Some(_) => {
            let mut errors = FieldErrors::new();
            errors.add("form", "Form must be either \"full\" or \"quick\"");
            Err(AppError::Validation(errors))
        }
    }
}

/// Validate a stripped request body into a lead.
///
/// With an explicit `form` only that schema applies. Without one the full
/// schema is tried first and the quick schema second; if both fail the full
/// schema's errors are reported.
pub fn validate_lead_body(
    body: &Map<String, Value>,
    form: Option<FormKind>,
    consent: ConsentPolicy,
) -> Result<Lead, FieldErrors> {
    let (draft, type_errors) = schemas::draft_from_json(body);

    let full = || {
        with_type_errors(
            schemas::validate_full(&draft, consent).map(Lead::Full),
            &type_errors,
            schemas::fields::FULL,
        )
    };
    let quick = || {
        with_type_errors(
            schemas::validate_quick(&draft).map(Lead::Quick),
            &type_errors,
            schemas::fields::QUICK,
        )
    };

    match form {
        Some(FormKind::Full) => full(),
        Some(FormKind::Quick) => quick(),
        None => full().or_else(|full_errors| {
            tracing::debug!("Untagged body is not a full lead, trying quick schema");
            quick().map_err(|_| full_errors)
        }),
    }
}

/// Fold type mismatches on `fields` into a schema result.
///
/// A wrongly-typed value replaces whatever the schema said about that field.
/// Mismatches on fields the schema does not read are ignored.
fn with_type_errors(
    result: Result<Lead, FieldErrors>,
    type_errors: &FieldErrors,
    fields: &[&str],
) -> Result<Lead, FieldErrors> {
    let mut relevant = type_errors.clone();
    relevant.retain(|field| fields.contains(&field));
    if relevant.is_empty() {
        return result;
    }

    let mut errors = result.err().unwrap_or_default();
    for field in relevant.fields() {
        errors.remove(field);
    }
    errors.merge(relevant);
    Err(errors)
}
