//! Loan repayment calculator.
//!
//! Monthly instalments use standard amortisation with monthly compounding of
//! the nominal annual rate.

use crate::models::FieldErrors;
use serde::{Deserialize, Serialize};

pub const MIN_AMOUNT: f64 = 1_000.0;
pub const MAX_AMOUNT: f64 = 100_000.0;
pub const MIN_TENURE_MONTHS: u32 = 1;
pub const MAX_TENURE_MONTHS: u32 = 24;
pub const MIN_RATE_PCT: f64 = 1.0;
pub const MAX_RATE_PCT: f64 = 48.0;

pub const DEFAULT_AMOUNT: f64 = 10_000.0;
pub const DEFAULT_TENURE_MONTHS: u32 = 12;
pub const DEFAULT_RATE_PCT: f64 = 6.0;

/// Monthly instalment for `principal` repaid over `months` at
/// `annual_rate_pct` percent per annum.
///
/// Returns 0 for a zero-month tenure.
pub fn monthly_installment(principal: f64, annual_rate_pct: f64, months: u32) -> f64 {
    if months == 0 {
        return 0.0;
    }
    let n = f64::from(months);
    let r = annual_rate_pct / 12.0 / 100.0;
    if r == 0.0 {
        return principal / n;
    }
    principal * r / (1.0 - (1.0 + r).powf(-n))
}

/// Calculator inputs, as posted by the calculator sliders.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct RepaymentQuery {
    #[serde(default = "default_amount")]
    pub amount: f64,
    #[serde(default = "default_tenure")]
    pub tenure: u32,
    #[serde(default = "default_rate")]
    pub rate: f64,
}

fn default_amount() -> f64 {
    DEFAULT_AMOUNT
}

fn default_tenure() -> u32 {
    DEFAULT_TENURE_MONTHS
}

fn default_rate() -> f64 {
    DEFAULT_RATE_PCT
}

impl Default for RepaymentQuery {
    fn default() -> Self {
        Self {
            amount: DEFAULT_AMOUNT,
            tenure: DEFAULT_TENURE_MONTHS,
            rate: DEFAULT_RATE_PCT,
        }
    }
}

impl RepaymentQuery {
    /// Check the inputs against the slider ranges.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if !(MIN_AMOUNT..=MAX_AMOUNT).contains(&self.amount) {
            errors.add("amount", "Loan amount must be between $1,000 and $100,000");
        }
        if !(MIN_TENURE_MONTHS..=MAX_TENURE_MONTHS).contains(&self.tenure) {
            errors.add("tenure", "Tenure must be between 1 and 24 months");
        }
        if !(MIN_RATE_PCT..=MAX_RATE_PCT).contains(&self.rate) {
            errors.add("rate", "Interest rate must be between 1% and 48%");
        }
        errors.into_result(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepaymentSummary {
    pub monthly_installment: f64,
    pub total_payable: f64,
    pub total_interest: f64,
    /// Share of the total payable that is interest, in percent.
    pub interest_share_pct: f64,
}

impl RepaymentSummary {
    pub fn calculate(amount: f64, annual_rate_pct: f64, months: u32) -> Self {
        let monthly = monthly_installment(amount, annual_rate_pct, months);
        let total_payable = monthly * f64::from(months);
        let total_interest = total_payable - amount;
        let interest_share_pct = if amount > 0.0 && total_payable > 0.0 {
            total_interest / total_payable * 100.0
        } else {
            0.0
        };

        Self {
            monthly_installment: monthly,
            total_payable,
            total_interest,
            interest_share_pct,
        }
    }
}

impl From<RepaymentQuery> for RepaymentSummary {
    fn from(query: RepaymentQuery) -> Self {
        RepaymentSummary::calculate(query.amount, query.rate, query.tenure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 0.01
    }

    #[test]
    fn test_default_scenario() {
        // 10,000 over 12 months at 6% p.a.
        let summary = RepaymentSummary::from(RepaymentQuery::default());
        assert!(approx(summary.monthly_installment, 860.66));
        assert!(approx(summary.total_payable, 10_327.97));
        assert!(approx(summary.total_interest, 327.97));
    }

    #[test]
    fn test_zero_rate_divides_evenly() {
        assert!(approx(monthly_installment(12_000.0, 0.0, 12), 1_000.0));
    }

    #[test]
    fn test_zero_months_is_zero() {
        assert_eq!(monthly_installment(12_000.0, 6.0, 0), 0.0);
    }

    #[test]
    fn test_zero_amount_has_no_interest_share() {
        let summary = RepaymentSummary::calculate(0.0, 6.0, 12);
        assert_eq!(summary.interest_share_pct, 0.0);
    }

    #[test]
    fn test_query_bounds() {
        assert!(RepaymentQuery::default().validate().is_ok());

        let errors = RepaymentQuery {
            amount: 500.0,
            tenure: 36,
            rate: 60.0,
        }
        .validate()
        .unwrap_err();
        assert!(errors.contains("amount"));
        assert!(errors.contains("tenure"));
        assert!(errors.contains("rate"));
    }
}
