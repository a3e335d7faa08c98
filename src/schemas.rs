//! Lead validation rules.
//!
//! Two lead shapes are validated here: the three-step "full" lead and the
//! single-step "quick" lead. The full lead is split into step schemas so the
//! multi-step form can check only the fields of the step being left.
//!
//! Every validator is a pure function of its input and collects all failures
//! into a [`FieldErrors`] map rather than stopping at the first one.

use crate::models::{
    EmploymentStatus, FieldErrors, FullLead, LeadDraft, LoanPurpose, Nationality, QuickLead,
};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

pub const MIN_LOAN_AMOUNT: f64 = 1_000.0;
pub const MAX_LOAN_AMOUNT: f64 = 300_000.0;
pub const MIN_TENURE_MONTHS: f64 = 3.0;
pub const MAX_TENURE_MONTHS: f64 = 72.0;
pub const MIN_NAME_CHARS: usize = 2;

/// Wire names of the lead fields, used as error keys.
pub mod fields {
    pub const LOAN_AMOUNT: &str = "loanAmount";
    pub const TENURE: &str = "tenure";
    pub const FULL_NAME: &str = "fullName";
    pub const EMAIL: &str = "email";
    pub const PHONE: &str = "phone";
    pub const NATIONALITY: &str = "nationality";
    pub const LOAN_PURPOSE: &str = "loanPurpose";
    pub const EMPLOYMENT_STATUS: &str = "employmentStatus";
    pub const MONTHLY_INCOME: &str = "monthlyIncome";
    pub const COMPANY: &str = "company";
    pub const AGREED_TO_TERMS: &str = "agreedToTerms";

    /// Fields read by the full schema.
    pub const FULL: &[&str] = &[
        LOAN_AMOUNT,
        TENURE,
        FULL_NAME,
        EMAIL,
        PHONE,
        NATIONALITY,
        LOAN_PURPOSE,
        EMPLOYMENT_STATUS,
        MONTHLY_INCOME,
        COMPANY,
        AGREED_TO_TERMS,
    ];

    /// Fields read by the quick schema. Anything else in a body is ignored.
    pub const QUICK: &[&str] = &[
        FULL_NAME,
        PHONE,
        EMAIL,
        LOAN_AMOUNT,
        LOAN_PURPOSE,
        NATIONALITY,
        AGREED_TO_TERMS,
    ];
}

pub mod messages {
    pub const LOAN_AMOUNT_REQUIRED: &str = "Loan amount is required";
    pub const LOAN_AMOUNT_MIN: &str = "Minimum loan amount is $1,000";
    pub const LOAN_AMOUNT_MAX: &str = "Maximum loan amount is $300,000";
    pub const TENURE_REQUIRED: &str = "Tenure is required";
    pub const TENURE_MIN: &str = "Minimum tenure is 3 months";
    pub const TENURE_MAX: &str = "Maximum tenure is 72 months";
    pub const TENURE_WHOLE: &str = "Tenure must be a whole number of months";
    pub const FULL_NAME_REQUIRED: &str = "Full name is required";
    pub const NAME_TOO_SHORT: &str = "Name must be at least 2 characters";
    pub const EMAIL_REQUIRED: &str = "Email is required";
    pub const EMAIL_INVALID: &str = "Please enter a valid email address";
    pub const PHONE_REQUIRED: &str = "Phone number is required";
    pub const PHONE_INVALID: &str = "Please enter a valid Singapore phone number";
    pub const NATIONALITY_INVALID: &str = "Please select your nationality";
    pub const LOAN_PURPOSE_INVALID: &str = "Please select a loan purpose";
    pub const EMPLOYMENT_STATUS_INVALID: &str = "Please select your employment status";
    pub const MONTHLY_INCOME_REQUIRED: &str = "Monthly income is required";
    pub const MONTHLY_INCOME_NEGATIVE: &str = "Income cannot be negative";
    pub const TERMS_REQUIRED: &str = "You must agree to the terms to proceed.";
    pub const FILL_OUT_FIELD: &str = "Please fill out this field.";
    pub const EXPECTED_NUMBER: &str = "Expected a number";
    pub const EXPECTED_TEXT: &str = "Expected text";
    pub const EXPECTED_BOOLEAN: &str = "Expected true or false";
}

use fields::*;
use messages::*;

// Eight digits starting with 6, 8 or 9. ASCII digits only.
static SG_PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[689][0-9]{7}$").expect("phone pattern compiles"));

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[A-Za-z0-9_'+\-.]*[A-Za-z0-9_+\-]@(?:[A-Za-z0-9][A-Za-z0-9\-]*\.)+[A-Za-z]{2,}$",
    )
    .expect("email pattern compiles")
});

/// Validate email address format.
///
/// Local part may not start with a dot or contain consecutive dots; the
/// domain needs at least one dot and an alphabetic TLD of two or more letters.
pub fn is_valid_email(email: &str) -> bool {
    if email.starts_with('.') || email.contains("..") {
        return false;
    }
    EMAIL_RE.is_match(email)
}

/// Validate a Singapore mobile or landline number in local 8-digit form.
pub fn is_valid_sg_phone(phone: &str) -> bool {
    SG_PHONE_RE.is_match(phone)
}

/// Whether the full form requires the terms checkbox.
///
/// The quick form always requires it. For the full form the requirement is
/// configurable because no policy decision exists for that flow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConsentPolicy {
    #[default]
    Optional,
    Required,
}

/// Steps of the full lead form, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    LoanDetails,
    Personal,
    Employment,
}

impl Step {
    pub const ALL: [Step; 3] = [Step::LoanDetails, Step::Personal, Step::Employment];
    pub const FIRST: Step = Step::LoanDetails;
    pub const LAST: Step = Step::Employment;

    pub fn index(self) -> usize {
        match self {
            Step::LoanDetails => 0,
            Step::Personal => 1,
            Step::Employment => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<Step> {
        Step::ALL.get(index).copied()
    }

    pub fn next(self) -> Step {
        Step::from_index(self.index() + 1).unwrap_or(Step::LAST)
    }

    pub fn previous(self) -> Step {
        self.index()
            .checked_sub(1)
            .and_then(Step::from_index)
            .unwrap_or(Step::FIRST)
    }

    /// Fields collected on this step.
    pub fn fields(self) -> &'static [&'static str] {
        match self {
            Step::LoanDetails => &[LOAN_AMOUNT, TENURE],
            Step::Personal => &[FULL_NAME, EMAIL, PHONE, NATIONALITY, LOAN_PURPOSE],
            Step::Employment => &[EMPLOYMENT_STATUS, MONTHLY_INCOME, COMPANY],
        }
    }

    /// Validate only this step's fields.
    pub fn validate(self, draft: &LeadDraft) -> FieldErrors {
        let result = match self {
            Step::LoanDetails => validate_loan_details(draft).map(|_| ()),
            Step::Personal => validate_personal(draft).map(|_| ()),
            Step::Employment => validate_employment(draft).map(|_| ()),
        };
        result.err().unwrap_or_default()
    }
}

/// Validated output of the loan details step.
#[derive(Debug, Clone, PartialEq)]
pub struct LoanDetails {
    pub loan_amount: f64,
    pub tenure: u32,
}

/// Validated output of the personal information step.
#[derive(Debug, Clone, PartialEq)]
pub struct PersonalInfo {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub nationality: Nationality,
    pub loan_purpose: LoanPurpose,
}

/// Validated output of the employment step.
#[derive(Debug, Clone, PartialEq)]
pub struct EmploymentInfo {
    pub employment_status: EmploymentStatus,
    pub monthly_income: f64,
    pub company: Option<String>,
}

pub fn validate_loan_details(draft: &LeadDraft) -> Result<LoanDetails, FieldErrors> {
    let mut errors = FieldErrors::new();
    let loan_amount = check_loan_amount(draft.loan_amount, LOAN_AMOUNT_REQUIRED, &mut errors);
    let tenure = check_tenure(draft.tenure, &mut errors);

    match (loan_amount, tenure) {
        (Some(loan_amount), Some(tenure)) if errors.is_empty() => Ok(LoanDetails {
            loan_amount,
            tenure,
        }),
        _ => Err(errors),
    }
}

pub fn validate_personal(draft: &LeadDraft) -> Result<PersonalInfo, FieldErrors> {
    let mut errors = FieldErrors::new();
    let full_name = check_name(draft.full_name.as_deref(), FULL_NAME_REQUIRED, &mut errors);
    let email = check_email(draft.email.as_deref(), EMAIL_REQUIRED, &mut errors);
    let phone = check_phone(draft.phone.as_deref(), PHONE_REQUIRED, &mut errors);
    let nationality = check_enum(
        draft.nationality.as_deref(),
        Nationality::parse,
        NATIONALITY,
        NATIONALITY_INVALID,
        &mut errors,
    );
    let loan_purpose = check_enum(
        draft.loan_purpose.as_deref(),
        LoanPurpose::parse,
        LOAN_PURPOSE,
        LOAN_PURPOSE_INVALID,
        &mut errors,
    );

    match (full_name, email, phone, nationality, loan_purpose) {
        (Some(full_name), Some(email), Some(phone), Some(nationality), Some(loan_purpose))
            if errors.is_empty() =>
        {
            Ok(PersonalInfo {
                full_name,
                email,
                phone,
                nationality,
                loan_purpose,
            })
        }
        _ => Err(errors),
    }
}

pub fn validate_employment(draft: &LeadDraft) -> Result<EmploymentInfo, FieldErrors> {
    let mut errors = FieldErrors::new();
    let employment_status = check_enum(
        draft.employment_status.as_deref(),
        EmploymentStatus::parse,
        EMPLOYMENT_STATUS,
        EMPLOYMENT_STATUS_INVALID,
        &mut errors,
    );
    let monthly_income = match draft.monthly_income.filter(|v| v.is_finite()) {
        None => {
            errors.add(MONTHLY_INCOME, MONTHLY_INCOME_REQUIRED);
            None
        }
        Some(income) if income < 0.0 => {
            errors.add(MONTHLY_INCOME, MONTHLY_INCOME_NEGATIVE);
            None
        }
        Some(income) => Some(income),
    };

    match (employment_status, monthly_income) {
        (Some(employment_status), Some(monthly_income)) if errors.is_empty() => {
            Ok(EmploymentInfo {
                employment_status,
                monthly_income,
                company: draft.company.clone(),
            })
        }
        _ => Err(errors),
    }
}

/// Validate the merged payload of all three steps.
pub fn validate_full(draft: &LeadDraft, consent: ConsentPolicy) -> Result<FullLead, FieldErrors> {
    let mut errors = FieldErrors::new();

    let loan = validate_loan_details(draft)
        .map_err(|e| errors.merge(e))
        .ok();
    let personal = validate_personal(draft).map_err(|e| errors.merge(e)).ok();
    let employment = validate_employment(draft)
        .map_err(|e| errors.merge(e))
        .ok();

    if consent == ConsentPolicy::Required && draft.agreed_to_terms != Some(true) {
        errors.add(AGREED_TO_TERMS, TERMS_REQUIRED);
    }

    match (loan, personal, employment) {
        (Some(loan), Some(personal), Some(employment)) if errors.is_empty() => Ok(FullLead {
            loan_amount: loan.loan_amount,
            tenure: loan.tenure,
            full_name: personal.full_name,
            email: personal.email,
            phone: personal.phone,
            nationality: personal.nationality,
            loan_purpose: personal.loan_purpose,
            employment_status: employment.employment_status,
            monthly_income: employment.monthly_income,
            company: employment.company,
            agreed_to_terms: draft.agreed_to_terms,
        }),
        _ => Err(errors),
    }
}

/// Validate a single-step landing page lead. Terms must be accepted.
pub fn validate_quick(draft: &LeadDraft) -> Result<QuickLead, FieldErrors> {
    let mut errors = FieldErrors::new();
    let full_name = check_name(draft.full_name.as_deref(), FILL_OUT_FIELD, &mut errors);
    let phone = check_phone(draft.phone.as_deref(), FILL_OUT_FIELD, &mut errors);
    let email = check_email(draft.email.as_deref(), FILL_OUT_FIELD, &mut errors);
    let loan_amount = check_loan_amount(draft.loan_amount, FILL_OUT_FIELD, &mut errors);
    let loan_purpose = check_enum(
        draft.loan_purpose.as_deref(),
        LoanPurpose::parse,
        LOAN_PURPOSE,
        FILL_OUT_FIELD,
        &mut errors,
    );
    let nationality = check_enum(
        draft.nationality.as_deref(),
        Nationality::parse,
        NATIONALITY,
        FILL_OUT_FIELD,
        &mut errors,
    );
    if draft.agreed_to_terms != Some(true) {
        errors.add(AGREED_TO_TERMS, TERMS_REQUIRED);
    }

    match (full_name, phone, email, loan_amount, loan_purpose, nationality) {
        (
            Some(full_name),
            Some(phone),
            Some(email),
            Some(loan_amount),
            Some(loan_purpose),
            Some(nationality),
        ) if errors.is_empty() => Ok(QuickLead {
            full_name,
            phone,
            email,
            loan_amount,
            loan_purpose,
            nationality,
            agreed_to_terms: true,
        }),
        _ => Err(errors),
    }
}

/// Build a draft from a JSON object, recording type mismatches per field.
///
/// Quick-form aliases (`name`, `amount`, `purpose`) are honoured; `null` is
/// treated as an absent value. Unknown keys are ignored.
pub fn draft_from_json(body: &Map<String, Value>) -> (LeadDraft, FieldErrors) {
    let mut errors = FieldErrors::new();
    let draft = LeadDraft {
        loan_amount: number_field(body, &[LOAN_AMOUNT, "amount"], &mut errors),
        tenure: number_field(body, &[TENURE], &mut errors),
        full_name: text_field(body, &[FULL_NAME, "name"], &mut errors),
        email: text_field(body, &[EMAIL], &mut errors),
        phone: text_field(body, &[PHONE], &mut errors),
        nationality: text_field(body, &[NATIONALITY], &mut errors),
        loan_purpose: text_field(body, &[LOAN_PURPOSE, "purpose"], &mut errors),
        employment_status: text_field(body, &[EMPLOYMENT_STATUS], &mut errors),
        monthly_income: number_field(body, &[MONTHLY_INCOME], &mut errors),
        company: text_field(body, &[COMPANY], &mut errors),
        agreed_to_terms: bool_field(body, &[AGREED_TO_TERMS], &mut errors),
    };
    (draft, errors)
}

fn lookup<'a>(body: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| body.get(*key))
        .find(|value| !value.is_null())
}

fn number_field(body: &Map<String, Value>, keys: &[&str], errors: &mut FieldErrors) -> Option<f64> {
    match lookup(body, keys)? {
        Value::Number(n) => n.as_f64(),
        _ => {
            errors.add(keys[0], EXPECTED_NUMBER);
            None
        }
    }
}

fn text_field(body: &Map<String, Value>, keys: &[&str], errors: &mut FieldErrors) -> Option<String> {
    match lookup(body, keys)? {
        Value::String(s) => Some(s.clone()),
        _ => {
            errors.add(keys[0], EXPECTED_TEXT);
            None
        }
    }
}

fn bool_field(body: &Map<String, Value>, keys: &[&str], errors: &mut FieldErrors) -> Option<bool> {
    match lookup(body, keys)? {
        Value::Bool(b) => Some(*b),
        _ => {
            errors.add(keys[0], EXPECTED_BOOLEAN);
            None
        }
    }
}

fn check_loan_amount(value: Option<f64>, missing: &str, errors: &mut FieldErrors) -> Option<f64> {
    match value.filter(|v| v.is_finite()) {
        None => {
            errors.add(LOAN_AMOUNT, missing);
            None
        }
        Some(amount) if amount < MIN_LOAN_AMOUNT => {
            errors.add(LOAN_AMOUNT, LOAN_AMOUNT_MIN);
            None
        }
        Some(amount) if amount > MAX_LOAN_AMOUNT => {
            errors.add(LOAN_AMOUNT, LOAN_AMOUNT_MAX);
            None
        }
        Some(amount) => Some(amount),
    }
}

fn check_tenure(value: Option<f64>, errors: &mut FieldErrors) -> Option<u32> {
    match value.filter(|v| v.is_finite()) {
        None => {
            errors.add(TENURE, TENURE_REQUIRED);
            None
        }
        Some(months) if months < MIN_TENURE_MONTHS => {
            errors.add(TENURE, TENURE_MIN);
            None
        }
        Some(months) if months > MAX_TENURE_MONTHS => {
            errors.add(TENURE, TENURE_MAX);
            None
        }
        Some(months) if months.fract() != 0.0 => {
            errors.add(TENURE, TENURE_WHOLE);
            None
        }
        // Bounded to 3..=72 above, so the cast is exact.
        Some(months) => Some(months as u32),
    }
}

fn check_name(value: Option<&str>, missing: &str, errors: &mut FieldErrors) -> Option<String> {
    match value {
        None => {
            errors.add(FULL_NAME, missing);
            None
        }
        Some(name) if name.chars().count() < MIN_NAME_CHARS => {
            errors.add(FULL_NAME, NAME_TOO_SHORT);
            None
        }
        Some(name) => Some(name.to_string()),
    }
}

fn check_email(value: Option<&str>, missing: &str, errors: &mut FieldErrors) -> Option<String> {
    match value {
        None => {
            errors.add(EMAIL, missing);
            None
        }
        Some(email) if !is_valid_email(email) => {
            errors.add(EMAIL, EMAIL_INVALID);
            None
        }
        Some(email) => Some(email.to_string()),
    }
}

fn check_phone(value: Option<&str>, missing: &str, errors: &mut FieldErrors) -> Option<String> {
    match value {
        None => {
            errors.add(PHONE, missing);
            None
        }
        Some(phone) if !is_valid_sg_phone(phone) => {
            errors.add(PHONE, PHONE_INVALID);
            None
        }
        Some(phone) => Some(phone.to_string()),
    }
}

fn check_enum<T>(
    value: Option<&str>,
    parse: fn(&str) -> Option<T>,
    field: &'static str,
    message: &str,
    errors: &mut FieldErrors,
) -> Option<T> {
    let parsed = value.and_then(parse);
    if parsed.is_none() {
        errors.add(field, message);
    }
    parsed
}
