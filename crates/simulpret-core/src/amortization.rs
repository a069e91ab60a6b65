use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::SimulationError;
use crate::types::*;
use crate::SimulationResult;

/// Terms beyond this many months trip a warning (HCSF 25-year ceiling).
const HCSF_MAX_TERM_MONTHS: Months = 300;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Terms of a fixed-rate, fully amortising loan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanTerms {
    /// Amount borrowed
    pub principal: Money,
    /// Nominal annual rate as a percentage (3.5 = 3.5 %)
    pub annual_rate_pct: RatePct,
    /// Number of monthly instalments
    pub term_months: Months,
}

impl LoanTerms {
    pub fn monthly_rate(&self) -> Rate {
        monthly_rate(self.annual_rate_pct)
    }
}

/// One instalment of an amortization schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulePeriod {
    /// 1-based instalment number
    pub period: Months,
    /// Amount actually paid this period (the last one absorbs rounding)
    pub payment: Money,
    pub interest: Money,
    pub principal: Money,
    /// Balance outstanding after this instalment
    pub remaining_balance: Money,
}

/// Full period-by-period schedule, computed in cents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmortizationSchedule {
    pub principal: Money,
    /// Level instalment, rounded to cents
    pub monthly_payment: Money,
    pub total_paid: Money,
    pub total_interest: Money,
    pub periods: Vec<SchedulePeriod>,
}

impl AmortizationSchedule {
    /// Balance outstanding once `months` instalments have been paid.
    pub fn remaining_balance_after(&self, months: Months) -> Money {
        if months == 0 {
            return self.principal;
        }
        let idx = (months as usize).min(self.periods.len());
        self.periods
            .get(idx.saturating_sub(1))
            .map(|p| p.remaining_balance)
            .unwrap_or(self.principal)
    }

    /// Capital repaid once `months` instalments have been paid.
    pub fn principal_repaid_after(&self, months: Months) -> Money {
        self.principal - self.remaining_balance_after(months)
    }

    /// Interest paid over instalments `from..=to` (1-based, inclusive).
    pub fn interest_between(&self, from: Months, to: Months) -> Money {
        self.periods
            .iter()
            .filter(|p| p.period >= from && p.period <= to)
            .map(|p| p.interest)
            .sum()
    }
}

// ---------------------------------------------------------------------------
// Primitive
// ---------------------------------------------------------------------------

/// Level monthly payment: P * r(1+r)^n / ((1+r)^n - 1), or P / n at zero rate.
///
/// The result is unrounded; callers round at their output boundary.
pub fn compute_payment(
    principal: Money,
    monthly_rate: Rate,
    term_months: Months,
) -> SimulationResult<Money> {
    validate_period_inputs(principal, monthly_rate, term_months)?;

    if monthly_rate.is_zero() {
        return Ok(principal / Decimal::from(term_months));
    }

    let factor = compound_factor(monthly_rate, term_months)?;
    let denominator = factor - Decimal::ONE;
    if denominator.is_zero() {
        return Err(SimulationError::DivisionByZero {
            context: "annuity payment denominator".into(),
        });
    }

    // Keep the small factor first so large principals cannot overflow.
    Ok(principal * (monthly_rate * factor / denominator))
}

/// Inverse annuity: the principal a level `payment` amortises over
/// `term_months` at `monthly_rate`. P = PMT * (1 - (1+r)^-n) / r.
pub fn principal_from_payment(
    payment: Money,
    monthly_rate: Rate,
    term_months: Months,
) -> SimulationResult<Money> {
    if payment < Decimal::ZERO {
        return Err(SimulationError::invalid(
            "payment",
            "Monthly payment cannot be negative",
        ));
    }
    validate_period_inputs(Decimal::ZERO, monthly_rate, term_months)?;

    let overflow = || SimulationError::Overflow {
        context: format!("principal for a {payment} payment over {term_months} months"),
    };
    if monthly_rate.is_zero() {
        return payment.checked_mul(Decimal::from(term_months)).ok_or_else(overflow);
    }

    let factor = compound_factor(monthly_rate, term_months)?;
    payment
        .checked_mul(Decimal::ONE - Decimal::ONE / factor)
        .and_then(|v| v.checked_div(monthly_rate))
        .ok_or_else(overflow)
}

/// Period-by-period schedule.
///
/// The level payment and each period's interest are rounded to cents; the
/// final instalment repays exactly the outstanding balance, so the schedule
/// always closes at zero and the principal column sums to `principal`.
pub fn compute_schedule(
    principal: Money,
    monthly_rate: Rate,
    term_months: Months,
) -> SimulationResult<AmortizationSchedule> {
    let payment = round_money(compute_payment(principal, monthly_rate, term_months)?);

    let mut balance = principal;
    let mut total_paid = Decimal::ZERO;
    let mut total_interest = Decimal::ZERO;
    let mut periods = Vec::with_capacity(term_months as usize);

    for period in 1..=term_months {
        let interest = round_money(balance * monthly_rate);
        let mut principal_part = (payment - interest).max(Decimal::ZERO);
        if period == term_months || principal_part > balance {
            principal_part = balance;
        }
        let period_payment = principal_part + interest;
        balance -= principal_part;

        total_paid += period_payment;
        total_interest += interest;
        periods.push(SchedulePeriod {
            period,
            payment: period_payment,
            interest,
            principal: principal_part,
            remaining_balance: balance,
        });
    }

    Ok(AmortizationSchedule {
        principal,
        monthly_payment: payment,
        total_paid,
        total_interest,
        periods,
    })
}

/// Build the schedule for a set of [`LoanTerms`] and wrap it in the
/// standard envelope.
pub fn build_schedule(
    terms: &LoanTerms,
) -> SimulationResult<ComputationOutput<AmortizationSchedule>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_terms(terms)?;
    if terms.term_months > HCSF_MAX_TERM_MONTHS {
        warnings.push(format!(
            "Term of {} months exceeds the 25-year HCSF ceiling",
            terms.term_months
        ));
    }

    let schedule = compute_schedule(terms.principal, terms.monthly_rate(), terms.term_months)?;
    tracing::debug!(
        principal = %terms.principal,
        payment = %schedule.monthly_payment,
        periods = schedule.periods.len(),
        "amortization schedule built"
    );

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Fixed-rate annuity amortization (cent-rounded, final-period reconciliation)",
        terms,
        warnings,
        elapsed,
        schedule,
    ))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// (1 + r)^n with overflow reported instead of panicking.
pub(crate) fn compound_factor(monthly_rate: Rate, term_months: Months) -> SimulationResult<Decimal> {
    (Decimal::ONE + monthly_rate)
        .checked_powu(u64::from(term_months))
        .ok_or_else(|| SimulationError::Overflow {
            context: format!("compound factor over {term_months} months"),
        })
}

pub(crate) fn validate_terms(terms: &LoanTerms) -> SimulationResult<()> {
    validate_rate("annual_rate_pct", terms.annual_rate_pct)?;
    validate_period_inputs(terms.principal, terms.monthly_rate(), terms.term_months)
}

fn validate_period_inputs(
    principal: Money,
    monthly_rate: Rate,
    term_months: Months,
) -> SimulationResult<()> {
    validate_term("term_months", term_months)?;
    if monthly_rate < Decimal::ZERO {
        return Err(SimulationError::invalid(
            "monthly_rate",
            "Interest rate cannot be negative",
        ));
    }
    if monthly_rate > crate::types::monthly_rate(MAX_RATE_PCT) {
        return Err(SimulationError::invalid(
            "monthly_rate",
            format!("Interest rate above {MAX_RATE_PCT}% a year is not a mortgage rate"),
        ));
    }
    validate_amount("principal", principal)
}
