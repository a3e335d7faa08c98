use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Declared purpose of the requested loan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoanPurpose {
    Personal,
    Business,
    Bridging,
    DebtConsolidation,
    Medical,
    Renovation,
    Wedding,
    Education,
    Travel,
    Emergency,
}

impl LoanPurpose {
    pub const ALL: [LoanPurpose; 10] = [
        LoanPurpose::Personal,
        LoanPurpose::Business,
        LoanPurpose::Bridging,
        LoanPurpose::DebtConsolidation,
        LoanPurpose::Medical,
        LoanPurpose::Renovation,
        LoanPurpose::Wedding,
        LoanPurpose::Education,
        LoanPurpose::Travel,
        LoanPurpose::Emergency,
    ];

    /// Wire label, as submitted by the forms.
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanPurpose::Personal => "personal",
            LoanPurpose::Business => "business",
            LoanPurpose::Bridging => "bridging",
            LoanPurpose::DebtConsolidation => "debt-consolidation",
            LoanPurpose::Medical => "medical",
            LoanPurpose::Renovation => "renovation",
            LoanPurpose::Wedding => "wedding",
            LoanPurpose::Education => "education",
            LoanPurpose::Travel => "travel",
            LoanPurpose::Emergency => "emergency",
        }
    }

    /// Human-readable label shown in the purpose dropdown.
    pub fn label(&self) -> &'static str {
        match self {
            LoanPurpose::Personal => "Personal",
            LoanPurpose::Business => "Business",
            LoanPurpose::Bridging => "Bridging",
            LoanPurpose::DebtConsolidation => "Debt Consolidation",
            LoanPurpose::Medical => "Medical",
            LoanPurpose::Renovation => "Renovation",
            LoanPurpose::Wedding => "Wedding",
            LoanPurpose::Education => "Education",
            LoanPurpose::Travel => "Travel",
            LoanPurpose::Emergency => "Emergency",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == value)
    }
}

impl fmt::Display for LoanPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Residency category of the applicant.
///
/// `citizen_pr` is the canonical label. Older landing pages post
/// `Singaporean_PR` for the same choice; it is accepted on input only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Nationality {
    #[serde(rename = "citizen_pr", alias = "Singaporean_PR")]
    CitizenPr,
    #[serde(rename = "foreigner")]
    Foreigner,
}

/// Label emitted by the quick-form landing pages before the labels were unified.
pub const LEGACY_CITIZEN_PR_LABEL: &str = "Singaporean_PR";

impl Nationality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Nationality::CitizenPr => "citizen_pr",
            Nationality::Foreigner => "foreigner",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "citizen_pr" => Some(Nationality::CitizenPr),
            LEGACY_CITIZEN_PR_LABEL => {
                tracing::debug!("Accepted legacy nationality label '{}'", value);
                Some(Nationality::CitizenPr)
            }
            "foreigner" => Some(Nationality::Foreigner),
            _ => None,
        }
    }
}

impl fmt::Display for Nationality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmploymentStatus {
    Employed,
    SelfEmployed,
    Unemployed,
}

impl EmploymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmploymentStatus::Employed => "employed",
            EmploymentStatus::SelfEmployed => "self-employed",
            EmploymentStatus::Unemployed => "unemployed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "employed" => Some(EmploymentStatus::Employed),
            "self-employed" => Some(EmploymentStatus::SelfEmployed),
            "unemployed" => Some(EmploymentStatus::Unemployed),
            _ => None,
        }
    }
}

impl fmt::Display for EmploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which lead form produced a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormKind {
    Full,
    Quick,
}

impl FormKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormKind::Full => "full",
            FormKind::Quick => "quick",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "full" => Some(FormKind::Full),
            "quick" => Some(FormKind::Quick),
            _ => None,
        }
    }
}

/// Unvalidated form input, as typed by the user or posted by a client.
///
/// Every field is optional so that a partially-filled multi-step form can be
/// represented. Enumerations stay as raw labels until validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadDraft {
    #[serde(default, alias = "amount", skip_serializing_if = "Option::is_none")]
    pub loan_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenure: Option<f64>,
    #[serde(default, alias = "name", skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nationality: Option<String>,
    #[serde(default, alias = "purpose", skip_serializing_if = "Option::is_none")]
    pub loan_purpose: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employment_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_income: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agreed_to_terms: Option<bool>,
}

/// Lead collected by the three-step form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullLead {
    pub loan_amount: f64,
    pub tenure: u32,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub nationality: Nationality,
    pub loan_purpose: LoanPurpose,
    pub employment_status: EmploymentStatus,
    pub monthly_income: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agreed_to_terms: Option<bool>,
}

/// Lead collected by the single-step landing page form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickLead {
    pub full_name: String,
    pub phone: String,
    pub email: String,
    pub loan_amount: f64,
    pub loan_purpose: LoanPurpose,
    pub nationality: Nationality,
    pub agreed_to_terms: bool,
}

/// A validated lead of either shape, tagged with the form that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "form", rename_all = "lowercase")]
pub enum Lead {
    Full(FullLead),
    Quick(QuickLead),
}

impl Lead {
    pub fn kind(&self) -> FormKind {
        match self {
            Lead::Full(_) => FormKind::Full,
            Lead::Quick(_) => FormKind::Quick,
        }
    }

    pub fn full_name(&self) -> &str {
        match self {
            Lead::Full(lead) => &lead.full_name,
            Lead::Quick(lead) => &lead.full_name,
        }
    }

    pub fn email(&self) -> &str {
        match self {
            Lead::Full(lead) => &lead.email,
            Lead::Quick(lead) => &lead.email,
        }
    }

    pub fn phone(&self) -> &str {
        match self {
            Lead::Full(lead) => &lead.phone,
            Lead::Quick(lead) => &lead.phone,
        }
    }

    pub fn loan_amount(&self) -> f64 {
        match self {
            Lead::Full(lead) => lead.loan_amount,
            Lead::Quick(lead) => lead.loan_amount,
        }
    }

    pub fn loan_purpose(&self) -> LoanPurpose {
        match self {
            Lead::Full(lead) => lead.loan_purpose,
            Lead::Quick(lead) => lead.loan_purpose,
        }
    }

    pub fn nationality(&self) -> Nationality {
        match self {
            Lead::Full(lead) => lead.nationality,
            Lead::Quick(lead) => lead.nationality,
        }
    }
}

/// Marketing attribution attached to a submission. Never validated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribution {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utm_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utm_medium: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utm_campaign: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utm_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utm_term: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub landing_page: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
}

impl Attribution {
    /// Body keys that carry attribution rather than lead data.
    pub const KEYS: [&'static str; 7] = [
        "utm_source",
        "utm_medium",
        "utm_campaign",
        "utm_content",
        "utm_term",
        "landing_page",
        "variant",
    ];

    /// Query key carrying the landing page headline variant.
    pub const VARIANT_PARAM: &'static str = "v";
    pub const DEFAULT_VARIANT: &'static str = "default";

    /// Read attribution from the URL a visitor landed on.
    ///
    /// UTM keys map one to one; blank values are treated as absent. The
    /// headline variant comes from `v` and falls back to `"default"`.
    pub fn from_landing_url(url: &url::Url) -> Self {
        // First occurrence wins, blank or not.
        let param = |name: &str| {
            url.query_pairs()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        Attribution {
            utm_source: param("utm_source"),
            utm_medium: param("utm_medium"),
            utm_campaign: param("utm_campaign"),
            utm_content: param("utm_content"),
            utm_term: param("utm_term"),
            landing_page: Some(url.path().to_string()),
            variant: Some(
                param(Self::VARIANT_PARAM).unwrap_or_else(|| Self::DEFAULT_VARIANT.to_string()),
            ),
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Attribution::default()
    }
}

/// Payload sent from a form to a transport: the lead plus its attribution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Submission {
    #[serde(flatten)]
    pub lead: Lead,
    #[serde(flatten)]
    pub attribution: Attribution,
}

/// Field-keyed, human-readable validation messages.
///
/// Keys are the camelCase wire names of the offending fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn merge(&mut self, other: FieldErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    pub fn remove(&mut self, field: &str) {
        self.0.remove(field);
    }

    /// Keep only the fields for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.0.retain(|field, _| keep(field));
    }

    /// `Ok(value)` when no errors were recorded.
    pub fn into_result<T>(self, value: T) -> Result<T, FieldErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            first = false;
            write!(f, "{}: {}", field, messages.join(", "))?;
        }
        Ok(())
    }
}

/// Row inserted into the `leads` table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewLeadRecord {
    pub id: Uuid,
    pub form_kind: FormKind,
    pub loan_amount: f64,
    pub loan_purpose: LoanPurpose,
    pub tenure: Option<i32>,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub nationality: Nationality,
    pub employment_status: Option<EmploymentStatus>,
    pub monthly_income: Option<f64>,
    pub company: Option<String>,
    pub agreed_to_terms: Option<bool>,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    pub utm_content: Option<String>,
    pub utm_term: Option<String>,
    pub landing_page: Option<String>,
    pub variant: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewLeadRecord {
    pub fn new(lead: &Lead, attribution: &Attribution) -> Self {
        let (tenure, employment_status, monthly_income, company, agreed_to_terms) = match lead {
            Lead::Full(full) => (
                i32::try_from(full.tenure).ok(),
                Some(full.employment_status),
                Some(full.monthly_income),
                full.company.clone().filter(|c| !c.trim().is_empty()),
                full.agreed_to_terms,
            ),
            Lead::Quick(quick) => (None, None, None, None, Some(quick.agreed_to_terms)),
        };

        Self {
            id: Uuid::new_v4(),
            form_kind: lead.kind(),
            loan_amount: lead.loan_amount(),
            loan_purpose: lead.loan_purpose(),
            tenure,
            full_name: lead.full_name().to_string(),
            email: lead.email().to_string(),
            phone: lead.phone().to_string(),
            nationality: lead.nationality(),
            employment_status,
            monthly_income,
            company,
            agreed_to_terms,
            utm_source: attribution.utm_source.clone(),
            utm_medium: attribution.utm_medium.clone(),
            utm_campaign: attribution.utm_campaign.clone(),
            utm_content: attribution.utm_content.clone(),
            utm_term: attribution.utm_term.clone(),
            landing_page: attribution.landing_page.clone(),
            variant: attribution.variant.clone(),
            created_at: Utc::now(),
        }
    }
}
