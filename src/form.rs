//! Lead form controllers.
//!
//! [`MultiStepForm`] drives the three-step application (loan details, personal
//! info, employment). [`QuickForm`] is the single-step landing page variant.
//! Both keep their draft in memory, validate before any network call and end
//! in either a terminal success or an editable state carrying one root error.

use crate::models::{FieldErrors, Lead, LeadDraft, LoanPurpose};
use crate::schemas::{self, ConsentPolicy, Step};
use crate::transport::{Delivery, Submitter};

/// Root-level message shown when a submission could not be delivered.
pub const SUBMIT_FAILED_MESSAGE: &str = "Something went wrong. Please try again.";

pub const DEFAULT_LOAN_AMOUNT: f64 = 10_000.0;
pub const DEFAULT_TENURE_MONTHS: f64 = 12.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormPhase {
    Step(Step),
    Submitting,
    /// Terminal.
    Success,
    /// Last submission failed; editing continues from the last step.
    Error,
}

/// Direction of the most recent step change, for the slide transition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Direction {
    #[default]
    Forward,
    Backward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Lead handed to the transport.
    Delivered(Delivery),
    /// Client-side validation failed; nothing was sent.
    Invalid,
    /// Transport failed; the root error is set.
    Failed,
    /// Submit is not allowed in the current phase.
    NotReady,
}

pub struct MultiStepForm {
    draft: LeadDraft,
    phase: FormPhase,
    direction: Direction,
    errors: FieldErrors,
    root_error: Option<String>,
    consent: ConsentPolicy,
    submitter: Submitter,
}

impl MultiStepForm {
    pub fn new(submitter: Submitter) -> Self {
        Self {
            draft: LeadDraft {
                loan_amount: Some(DEFAULT_LOAN_AMOUNT),
                tenure: Some(DEFAULT_TENURE_MONTHS),
                ..Default::default()
            },
            phase: FormPhase::Step(Step::FIRST),
            direction: Direction::Forward,
            errors: FieldErrors::new(),
            root_error: None,
            consent: ConsentPolicy::default(),
            submitter,
        }
    }

    pub fn with_consent(mut self, consent: ConsentPolicy) -> Self {
        self.consent = consent;
        self
    }

    pub fn phase(&self) -> FormPhase {
        self.phase
    }

    /// The step being edited, if the form is editable.
    pub fn current_step(&self) -> Option<Step> {
        match self.phase {
            FormPhase::Step(step) => Some(step),
            FormPhase::Error => Some(Step::LAST),
            FormPhase::Submitting | FormPhase::Success => None,
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn draft(&self) -> &LeadDraft {
        &self.draft
    }

    /// Mutable access to the draft; `None` while submitting or after success.
    pub fn draft_mut(&mut self) -> Option<&mut LeadDraft> {
        self.current_step()?;
        Some(&mut self.draft)
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn root_error(&self) -> Option<&str> {
        self.root_error.as_deref()
    }

    /// Validate the current step and move forward if it passes.
    ///
    /// Returns whether the step validated. On the last step the form stays put.
    pub fn advance(&mut self) -> bool {
        let Some(step) = self.current_step() else {
            return false;
        };

        let step_errors = step.validate(&self.draft);
        for field in step.fields() {
            self.errors.remove(field);
        }
        if !step_errors.is_empty() {
            tracing::debug!("Step {} blocked: {}", step.index(), step_errors);
            self.errors.merge(step_errors);
            return false;
        }

        self.phase = FormPhase::Step(step.next());
        self.direction = Direction::Forward;
        true
    }

    /// Move back one step without validating.
    pub fn retreat(&mut self) -> bool {
        let Some(step) = self.current_step() else {
            return false;
        };
        self.phase = FormPhase::Step(step.previous());
        self.direction = Direction::Backward;
        true
    }

    /// Validate the whole draft and hand it to the transport.
    ///
    /// Only legal from the last step (or after a failed attempt).
    pub async fn submit(&mut self) -> SubmitOutcome {
        if self.current_step() != Some(Step::LAST) {
            return SubmitOutcome::NotReady;
        }

        let lead = match schemas::validate_full(&self.draft, self.consent) {
            Ok(lead) => lead,
            Err(errors) => {
                self.errors = errors;
                self.phase = FormPhase::Step(Step::LAST);
                return SubmitOutcome::Invalid;
            }
        };

        self.errors = FieldErrors::new();
        self.root_error = None;
        self.phase = FormPhase::Submitting;

        match self.submitter.submit(Lead::Full(lead)).await {
            Ok(delivery) => {
                self.phase = FormPhase::Success;
                SubmitOutcome::Delivered(delivery)
            }
            Err(e) => {
                tracing::warn!("Lead submission failed: {}", e);
                self.root_error = Some(SUBMIT_FAILED_MESSAGE.to_string());
                self.phase = FormPhase::Error;
                SubmitOutcome::Failed
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuickPhase {
    Editing,
    Submitting,
    /// Terminal.
    Success,
}

/// Single-step lead form with a required terms checkbox.
pub struct QuickForm {
    draft: LeadDraft,
    phase: QuickPhase,
    errors: FieldErrors,
    root_error: Option<String>,
    submitter: Submitter,
}

impl QuickForm {
    pub fn new(submitter: Submitter) -> Self {
        Self {
            draft: LeadDraft::default(),
            phase: QuickPhase::Editing,
            errors: FieldErrors::new(),
            root_error: None,
            submitter,
        }
    }

    /// Landing pages dedicated to one product pre-select the purpose.
    pub fn with_purpose(mut self, purpose: LoanPurpose) -> Self {
        self.draft.loan_purpose = Some(purpose.as_str().to_string());
        self
    }

    pub fn phase(&self) -> QuickPhase {
        self.phase
    }

    pub fn draft(&self) -> &LeadDraft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> Option<&mut LeadDraft> {
        (self.phase == QuickPhase::Editing).then_some(&mut self.draft)
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn root_error(&self) -> Option<&str> {
        self.root_error.as_deref()
    }

    pub async fn submit(&mut self) -> SubmitOutcome {
        if self.phase != QuickPhase::Editing {
            return SubmitOutcome::NotReady;
        }

        let lead = match schemas::validate_quick(&self.draft) {
            Ok(lead) => lead,
            Err(errors) => {
                self.errors = errors;
                return SubmitOutcome::Invalid;
            }
        };

        self.errors = FieldErrors::new();
        self.root_error = None;
        self.phase = QuickPhase::Submitting;

        match self.submitter.submit(Lead::Quick(lead)).await {
            Ok(delivery) => {
                self.phase = QuickPhase::Success;
                SubmitOutcome::Delivered(delivery)
            }
            Err(e) => {
                tracing::warn!("Quick lead submission failed: {}", e);
                self.root_error = Some(SUBMIT_FAILED_MESSAGE.to_string());
                self.phase = QuickPhase::Editing;
                SubmitOutcome::Failed
            }
        }
    }
}
