use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::amortization::{self, compound_factor};
use crate::error::SimulationError;
use crate::types::*;
use crate::SimulationResult;

const MAX_TAEG_ITERATIONS: u32 = 50;
const TAEG_CONVERGENCE: Decimal = dec!(0.0000001);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A lender's quote for the same borrowed amount.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankOffer {
    pub bank_name: String,
    pub annual_rate_pct: RatePct,
    pub term_months: Months,
    /// Arrangement fees ("frais de dossier"), paid once
    #[serde(default)]
    pub upfront_fees: Money,
    /// Flat monthly borrower insurance, used when no rate is quoted
    #[serde(default)]
    pub monthly_insurance_flat: Money,
    /// Insurance as an annual percentage of the borrowed amount
    #[serde(default)]
    pub annual_insurance_rate_pct: RatePct,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfferComparisonInput {
    pub borrowed_amount: Money,
    pub offers: Vec<BankOffer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferComparison {
    /// 1 for the cheapest offer
    pub rank: usize,
    pub bank_name: String,
    pub annual_rate_pct: RatePct,
    pub term_months: Months,
    pub monthly_credit_payment: Money,
    pub monthly_insurance: Money,
    pub total_monthly: Money,
    pub upfront_fees: Money,
    /// Every instalment plus fees
    pub total_cost: Money,
    /// Total cost minus the borrowed amount
    pub credit_cost: Money,
    /// Extra cost versus the cheapest offer; zero for the best one
    pub cost_delta_vs_best: Money,
    /// Annual effective rate including fees and insurance
    pub taeg_pct: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfferComparisonOutput {
    pub borrowed_amount: Money,
    pub comparisons: Vec<OfferComparison>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Price every offer on the same borrowed amount and rank them by total cost.
///
/// The sort is stable, so offers of equal cost keep their submitted order.
pub fn compare_offers(
    input: &OfferComparisonInput,
) -> SimulationResult<ComputationOutput<OfferComparisonOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_input(input)?;

    let borrowed = input.borrowed_amount;
    let mut comparisons = Vec::with_capacity(input.offers.len());
    for offer in &input.offers {
        let credit =
            amortization::compute_payment(borrowed, monthly_rate(offer.annual_rate_pct), offer.term_months)?;
        let insurance = if offer.annual_insurance_rate_pct > Decimal::ZERO {
            borrowed * offer.annual_insurance_rate_pct / dec!(100) / dec!(12)
        } else {
            offer.monthly_insurance_flat
        };
        let total_monthly = credit + insurance;
        let total_cost = total_monthly * Decimal::from(offer.term_months) + offer.upfront_fees;

        let taeg_pct = annual_effective_rate(
            borrowed - offer.upfront_fees,
            total_monthly,
            offer.term_months,
            monthly_rate(offer.annual_rate_pct),
        );
        if taeg_pct.is_none() {
            warnings.push(format!("TAEG did not converge for {}", offer.bank_name));
        }

        comparisons.push(OfferComparison {
            rank: 0,
            bank_name: offer.bank_name.clone(),
            annual_rate_pct: offer.annual_rate_pct,
            term_months: offer.term_months,
            monthly_credit_payment: credit,
            monthly_insurance: insurance,
            total_monthly,
            upfront_fees: offer.upfront_fees,
            total_cost,
            credit_cost: total_cost - borrowed,
            cost_delta_vs_best: Decimal::ZERO,
            taeg_pct,
        });
    }

    comparisons.sort_by(|a, b| a.total_cost.cmp(&b.total_cost));
    let best_cost = comparisons[0].total_cost;
    for (i, c) in comparisons.iter_mut().enumerate() {
        c.rank = i + 1;
        c.cost_delta_vs_best = c.total_cost - best_cost;
    }

    tracing::debug!(
        offers = comparisons.len(),
        best = %comparisons[0].bank_name,
        "offers compared"
    );

    let output = OfferComparisonOutput {
        borrowed_amount: borrowed,
        comparisons,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Total cost of credit per offer (annuity + insurance + fees), TAEG by Newton-Raphson",
        input,
        warnings,
        elapsed,
        output,
    ))
}

/// TAEG as a percentage: the monthly rate `r` solving
/// `net_proceeds = sum(total_monthly / (1+r)^t, t = 1..=n)`, annualised as
/// `(1+r)^12 - 1`. `None` when the iteration fails to converge.
pub fn annual_effective_rate(
    net_proceeds: Money,
    total_monthly: Money,
    term_months: Months,
    guess: Rate,
) -> Option<Decimal> {
    if net_proceeds <= Decimal::ZERO || total_monthly <= Decimal::ZERO || term_months == 0 {
        return None;
    }

    let mut rate = guess;
    for _ in 0..MAX_TAEG_ITERATIONS {
        let (npv, dnpv) = npv_and_derivative(net_proceeds, total_monthly, term_months, rate)?;

        if npv.abs() < TAEG_CONVERGENCE {
            let annual = compound_factor(rate, 12).ok()? - Decimal::ONE;
            return annual.checked_mul(dec!(100));
        }
        if dnpv.is_zero() {
            return None;
        }

        rate -= npv.checked_div(dnpv)?;
        if rate <= dec!(-0.99) {
            rate = dec!(-0.99);
        } else if rate > Decimal::ONE {
            rate = Decimal::ONE;
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Net present value of the monthly flows at `rate` and its derivative.
/// `None` when the discounting leaves the decimal range.
fn npv_and_derivative(
    net_proceeds: Money,
    total_monthly: Money,
    term_months: Months,
    rate: Rate,
) -> Option<(Decimal, Decimal)> {
    let one_plus_r = Decimal::ONE + rate;
    let mut discount = Decimal::ONE;
    let mut npv = -net_proceeds;
    let mut dnpv = Decimal::ZERO;
    for t in 1..=term_months {
        discount = discount.checked_div(one_plus_r)?;
        let flow = total_monthly.checked_mul(discount)?;
        npv = npv.checked_add(flow)?;
        let slope = Decimal::from(t).checked_mul(flow)?.checked_div(one_plus_r)?;
        dnpv = dnpv.checked_sub(slope)?;
    }
    Some((npv, dnpv))
}

fn validate_input(input: &OfferComparisonInput) -> SimulationResult<()> {
    if input.offers.len() < 2 {
        return Err(SimulationError::InsufficientData(format!(
            "At least 2 offers are required for a comparison (got {})",
            input.offers.len()
        )));
    }
    if input.borrowed_amount <= Decimal::ZERO {
        return Err(SimulationError::invalid(
            "borrowed_amount",
            "Borrowed amount must be positive",
        ));
    }
    validate_amount("borrowed_amount", input.borrowed_amount)?;
    for offer in &input.offers {
        let field = |name: &str| format!("offer:{} {name}", offer.bank_name);
        validate_rate(&field("annual_rate_pct"), offer.annual_rate_pct)?;
        validate_term(&field("term_months"), offer.term_months)?;
        validate_amount(&field("upfront_fees"), offer.upfront_fees)?;
        validate_amount(&field("monthly_insurance_flat"), offer.monthly_insurance_flat)?;
        validate_rate(&field("annual_insurance_rate_pct"), offer.annual_insurance_rate_pct)?;
    }
    Ok(())
}
