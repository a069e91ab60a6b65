use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::amortization::{self, LoanTerms};
use crate::error::SimulationError;
use crate::types::*;
use crate::SimulationResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A buy-to-let purchase financed by a fixed-rate loan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RentalInput {
    pub property_price: Money,
    /// Cash put down; the loan covers the rest of the price
    pub down_payment: Money,
    pub annual_rate_pct: RatePct,
    pub term_months: Months,
    pub monthly_rent: Money,
    /// Co-ownership charges, management fees, maintenance
    #[serde(default)]
    pub monthly_charges: Money,
    /// Property tax and other yearly levies
    #[serde(default)]
    pub annual_taxes: Money,
    /// Reporting horizons in years
    pub horizons_years: Vec<u32>,
}

/// Cumulative position after `years` of ownership.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RentalProjection {
    pub years: u32,
    pub cumulative_cash_flow: Money,
    pub capital_repaid: Money,
    /// Interest paid during the horizon's final year
    pub interest_paid_in_year: Money,
    pub gross_yield_pct: Decimal,
    /// Yield after charges, taxes and that year's interest. Not tax-exact.
    pub net_yield_pct: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RentalOutput {
    pub principal: Money,
    pub monthly_payment: Money,
    /// Rent minus charges, monthly taxes and the loan payment; may be negative
    pub monthly_cash_flow: Money,
    pub annual_cash_flow: Money,
    pub gross_yield_pct: Decimal,
    /// Annual cash flow over the down payment; absent when nothing was put down
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cash_on_cash_pct: Option<Decimal>,
    pub projections: Vec<RentalProjection>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Project rental cash flow and yields over the requested horizons.
///
/// Horizons longer than the loan are skipped. Capital repaid and yearly
/// interest are read off the cent-rounded amortization schedule.
pub fn analyze_investment(input: &RentalInput) -> SimulationResult<ComputationOutput<RentalOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_input(input)?;

    let terms = LoanTerms {
        principal: input.property_price - input.down_payment,
        annual_rate_pct: input.annual_rate_pct,
        term_months: input.term_months,
    };
    let schedule = amortization::compute_schedule(terms.principal, terms.monthly_rate(), terms.term_months)?;
    let payment = schedule.monthly_payment;

    let monthly_cash_flow =
        input.monthly_rent - input.monthly_charges - input.annual_taxes / dec!(12) - payment;
    let annual_cash_flow = monthly_cash_flow * dec!(12);
    let annual_rent = input.monthly_rent * dec!(12);
    let gross_yield_pct = pct_of(annual_rent, input.property_price);
    let operating_income = annual_rent - input.monthly_charges * dec!(12) - input.annual_taxes;

    if monthly_cash_flow < Decimal::ZERO {
        warnings.push(format!(
            "Negative monthly cash flow of {}: the owner tops up every month",
            round_money(monthly_cash_flow)
        ));
    }

    let max_years = input.term_months / 12;
    let mut projections = Vec::with_capacity(input.horizons_years.len());
    for &years in &input.horizons_years {
        if years > max_years {
            warnings.push(format!(
                "Horizon of {years} years skipped: longer than the {max_years}-year loan"
            ));
            continue;
        }
        let end = years * 12;
        let interest_paid_in_year = schedule.interest_between(end - 11, end);

        projections.push(RentalProjection {
            years,
            cumulative_cash_flow: annual_cash_flow * Decimal::from(years),
            capital_repaid: schedule.principal_repaid_after(end),
            interest_paid_in_year,
            gross_yield_pct,
            net_yield_pct: pct_of(operating_income - interest_paid_in_year, input.property_price),
        });
    }

    let cash_on_cash_pct = (input.down_payment > Decimal::ZERO)
        .then(|| pct_of(annual_cash_flow, input.down_payment));

    tracing::debug!(
        %payment,
        monthly_cash_flow = %monthly_cash_flow,
        horizons = projections.len(),
        "rental investment analysed"
    );

    let output = RentalOutput {
        principal: terms.principal,
        monthly_payment: payment,
        monthly_cash_flow,
        annual_cash_flow,
        gross_yield_pct,
        cash_on_cash_pct,
        projections,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Leveraged rental cash flow with schedule-based capital and interest split",
        input,
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn validate_input(input: &RentalInput) -> SimulationResult<()> {
    if input.property_price <= Decimal::ZERO {
        return Err(SimulationError::invalid(
            "property_price",
            "Property price must be positive",
        ));
    }
    validate_amount("property_price", input.property_price)?;
    validate_amount("down_payment", input.down_payment)?;
    if input.down_payment > input.property_price {
        return Err(SimulationError::invalid(
            "down_payment",
            "Down payment cannot exceed the property price",
        ));
    }
    validate_rate("annual_rate_pct", input.annual_rate_pct)?;
    validate_term("term_months", input.term_months)?;
    for (field, value) in [
        ("monthly_rent", input.monthly_rent),
        ("monthly_charges", input.monthly_charges),
        ("annual_taxes", input.annual_taxes),
    ] {
        validate_amount(field, value)?;
    }
    if input.horizons_years.iter().any(|y| *y == 0) {
        return Err(SimulationError::invalid(
            "horizons_years",
            "Horizons must be at least one year",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn base_input() -> RentalInput {
        RentalInput {
            property_price: dec!(200000),
            down_payment: dec!(40000),
            annual_rate_pct: dec!(3.8),
            term_months: 240,
            monthly_rent: dec!(800),
            monthly_charges: Decimal::ZERO,
            annual_taxes: Decimal::ZERO,
            horizons_years: vec![5, 10, 15, 20],
        }
    }

    #[test]
    fn test_reference_cash_flow() {
        let out = analyze_investment(&base_input()).unwrap().result;
        assert_eq!(out.principal, dec!(160000));
        assert_eq!(out.monthly_payment, dec!(952.79));
        assert_eq!(out.monthly_cash_flow, dec!(-152.79));
        assert_eq!(out.gross_yield_pct, dec!(4.8));
        assert_eq!(out.projections.len(), 4);
    }

    #[test]
    fn test_projection_figures() {
        let out = analyze_investment(&base_input()).unwrap().result;
        let five = &out.projections[0];
        assert_eq!(five.years, 5);
        assert_eq!(five.cumulative_cash_flow, dec!(-152.79) * dec!(60));
        assert!(five.capital_repaid > Decimal::ZERO && five.capital_repaid < dec!(160000));
        let twenty = &out.projections[3];
        assert_eq!(twenty.capital_repaid, dec!(160000));
        // Interest shrinks as the loan amortises, so net yield improves.
        assert!(twenty.interest_paid_in_year < five.interest_paid_in_year);
        assert!(twenty.net_yield_pct > five.net_yield_pct);
    }

    #[test]
    fn test_net_yield_uses_that_years_interest() {
        let out = analyze_investment(&base_input()).unwrap().result;
        let schedule =
            amortization::compute_schedule(dec!(160000), monthly_rate(dec!(3.8)), 240).unwrap();
        let ten = &out.projections[1];
        let interest = schedule.interest_between(109, 120);
        assert_eq!(ten.interest_paid_in_year, interest);
        assert_eq!(ten.net_yield_pct, (dec!(9600) - interest) / dec!(200000) * dec!(100));
    }

    #[test]
    fn test_horizons_capped_at_term() {
        let mut input = base_input();
        input.term_months = 180;
        let result = analyze_investment(&input).unwrap();
        let years: Vec<u32> = result.result.projections.iter().map(|p| p.years).collect();
        assert_eq!(years, vec![5, 10, 15]);
        assert!(result.warnings.iter().any(|w| w.contains("20 years skipped")));
    }

    #[test]
    fn test_charges_and_taxes_reduce_cash_flow() {
        let mut input = base_input();
        input.monthly_charges = dec!(100);
        input.annual_taxes = dec!(1200);
        let out = analyze_investment(&input).unwrap().result;
        assert_eq!(out.monthly_cash_flow, dec!(800) - dec!(100) - dec!(100) - dec!(952.79));
    }

    #[test]
    fn test_cash_on_cash() {
        let out = analyze_investment(&base_input()).unwrap().result;
        let expected = dec!(-152.79) * dec!(12) / dec!(40000) * dec!(100);
        assert_eq!(out.cash_on_cash_pct, Some(expected));

        let mut input = base_input();
        input.down_payment = Decimal::ZERO;
        let out = analyze_investment(&input).unwrap().result;
        assert!(out.cash_on_cash_pct.is_none());
    }

    #[test]
    fn test_down_payment_above_price_rejected() {
        let mut input = base_input();
        input.down_payment = dec!(250000);
        let err = analyze_investment(&input).unwrap_err();
        match err {
            SimulationError::InvalidInput { field, .. } => assert_eq!(field, "down_payment"),
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_rent_beyond_ceiling_rejected() {
        let mut input = base_input();
        input.monthly_rent = MAX_AMOUNT * dec!(1000);
        match analyze_investment(&input).unwrap_err() {
            SimulationError::InvalidInput { field, .. } => assert_eq!(field, "monthly_rent"),
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
    }
}
