//! Submission transports used by the lead forms.
//!
//! Two transports exist. The spreadsheet webhook is fire-and-forget: once the
//! request has gone out the lead counts as submitted, whatever the remote end
//! answers. The API transport posts to `/api/leads` and requires a 2xx.
//! [`Delivery`] records which of the two guarantees a caller actually got.

use crate::models::{Attribution, Lead, Nationality, Submission, LEGACY_CITIZEN_PR_LABEL};
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// How far a submission is known to have travelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The request was sent; the remote outcome is unknown.
    Dispatched,
    /// The remote endpoint acknowledged the lead with a 2xx status.
    Confirmed,
}

#[derive(Debug)]
pub enum TransportError {
    /// The request could not be sent or no response arrived.
    Network(String),
    /// The endpoint answered with a non-2xx status.
    Rejected { status: u16 },
    /// Client construction failed.
    Setup(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Network(msg) => write!(f, "Network error: {}", msg),
            TransportError::Rejected { status } => write!(f, "Endpoint returned status {}", status),
            TransportError::Setup(msg) => write!(f, "Transport setup failed: {}", msg),
        }
    }
}

impl std::error::Error for TransportError {}

/// Sends a validated submission somewhere.
#[async_trait]
pub trait LeadTransport: Send + Sync {
    async fn send(&self, submission: &Submission) -> Result<Delivery, TransportError>;
}

fn build_client() -> Result<reqwest::Client, TransportError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .map_err(|e| TransportError::Setup(e.to_string()))
}

/// Row appended to the lead spreadsheet by the webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpreadsheetRow {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub amount: String,
    pub purpose: String,
    pub nationality: String,
}

impl SpreadsheetRow {
    pub fn from_lead(lead: &Lead) -> Self {
        let nationality = match lead.nationality() {
            Nationality::Foreigner => "Foreigner",
            // The sheet has always received the landing page label.
            Nationality::CitizenPr => LEGACY_CITIZEN_PR_LABEL,
        };

        Self {
            name: lead.full_name().to_string(),
            phone: lead.phone().to_string(),
            email: lead.email().to_string(),
            amount: lead.loan_amount().to_string(),
            purpose: lead.loan_purpose().label().to_string(),
            nationality: nationality.to_string(),
        }
    }
}

/// Fire-and-forget post to the spreadsheet webhook.
#[derive(Clone)]
pub struct WebhookTransport {
    client: reqwest::Client,
    url: String,
}

impl WebhookTransport {
    pub fn new(url: impl Into<String>) -> Result<Self, TransportError> {
        Ok(Self {
            client: build_client()?,
            url: url.into(),
        })
    }
}

#[async_trait]
impl LeadTransport for WebhookTransport {
    async fn send(&self, submission: &Submission) -> Result<Delivery, TransportError> {
        let row = SpreadsheetRow::from_lead(&submission.lead);
        tracing::info!("Posting {} lead to spreadsheet webhook", submission.lead.kind().as_str());

        let response = self
            .client
            .post(&self.url)
            .json(&row)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        // Status is deliberately not inspected.
        tracing::debug!("Spreadsheet webhook answered {}", response.status());
        Ok(Delivery::Dispatched)
    }
}

/// Posts the submission to the lead API and requires a 2xx answer.
#[derive(Clone)]
pub struct ApiTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl ApiTransport {
    /// `base_url` is the site origin, e.g. `https://lendkaki.sg`.
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        Ok(Self {
            client: build_client()?,
            endpoint: format!("{}/api/leads", base_url.trim_end_matches('/')),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl LeadTransport for ApiTransport {
    async fn send(&self, submission: &Submission) -> Result<Delivery, TransportError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(submission)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            // Field-level details in the body are not surfaced to the form.
            tracing::warn!("Lead API rejected submission with {}", status);
            return Err(TransportError::Rejected {
                status: status.as_u16(),
            });
        }

        Ok(Delivery::Confirmed)
    }
}

/// Paid-ad conversion event fired after a successful submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionEvent {
    pub content_name: String,
    pub content_category: String,
}

impl ConversionEvent {
    pub fn lead_form(content_name: impl Into<String>) -> Self {
        Self {
            content_name: content_name.into(),
            content_category: "Lead Form".to_string(),
        }
    }
}

/// Best-effort conversion tracking. Implementations must not fail the submission.
pub trait ConversionTracker: Send + Sync {
    fn track_lead(&self, event: &ConversionEvent);
}

/// Records conversions as structured log events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingConversions;

impl ConversionTracker for TracingConversions {
    fn track_lead(&self, event: &ConversionEvent) {
        tracing::info!(
            event = "Lead",
            content_name = %event.content_name,
            content_category = %event.content_category,
            "Conversion tracked"
        );
    }
}

/// Everything a form needs to hand a validated lead off: the transport, the
/// conversion tracker, and the attribution captured from the landing URL.
#[derive(Clone)]
pub struct Submitter {
    transport: Arc<dyn LeadTransport>,
    tracker: Arc<dyn ConversionTracker>,
    conversion: ConversionEvent,
    attribution: Attribution,
}

impl Submitter {
    pub fn new(transport: Arc<dyn LeadTransport>, conversion: ConversionEvent) -> Self {
        Self {
            transport,
            tracker: Arc::new(TracingConversions),
            conversion,
            attribution: Attribution::default(),
        }
    }

    pub fn with_tracker(mut self, tracker: Arc<dyn ConversionTracker>) -> Self {
        self.tracker = tracker;
        self
    }

    pub fn with_attribution(mut self, attribution: Attribution) -> Self {
        self.attribution = attribution;
        self
    }

    pub fn attribution(&self) -> &Attribution {
        &self.attribution
    }

    /// Send the lead; on success fire the conversion event.
    pub async fn submit(&self, lead: Lead) -> Result<Delivery, TransportError> {
        let submission = Submission {
            lead,
            attribution: self.attribution.clone(),
        };
        let delivery = self.transport.send(&submission).await?;
        self.tracker.track_lead(&self.conversion);
        Ok(delivery)
    }
}
