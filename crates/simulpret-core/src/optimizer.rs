use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::time::Instant;

use crate::amortization;
use crate::capacity::{validate_income, IncomeProfile};
use crate::error::SimulationError;
use crate::types::*;
use crate::SimulationResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationInput {
    pub property_price: Money,
    pub income: IncomeProfile,
    pub annual_rate_pct: RatePct,
    pub min_duration_months: Months,
    pub max_duration_months: Months,
    /// Down-payment percentages of the property price to search
    pub down_payment_grid_pct: Vec<Decimal>,
    /// Cash the buyer can put down; larger down payments are infeasible
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_savings: Option<Money>,
}

/// One point of the duration × down-payment grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationCandidate {
    pub duration_months: Months,
    pub down_payment_pct: Decimal,
    pub down_payment: Money,
    pub principal: Money,
    pub monthly_payment: Money,
    /// Total outlay: down payment plus every instalment
    pub total_cost: Money,
    pub total_interest: Money,
    pub effort_ratio_pct: Decimal,
    pub feasible: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationOutput {
    pub optimal: OptimizationCandidate,
    /// Optimal first, then every other candidate by ascending total cost
    pub alternatives: Vec<OptimizationCandidate>,
    pub evaluated: usize,
    pub feasible_count: usize,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Search the duration × down-payment grid for the cheapest affordable loan.
///
/// Durations are the whole-year multiples of 12 within the requested range.
/// A candidate is feasible when its effort ratio stays within the income
/// profile's maximum (and its down payment within available savings). The
/// optimum is the feasible candidate with the lowest total cost; ties go to
/// the shorter duration, then the larger down payment.
pub fn optimize(
    input: &OptimizationInput,
) -> SimulationResult<ComputationOutput<OptimizationOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_input(input)?;

    let durations = duration_steps(input.min_duration_months, input.max_duration_months);
    if durations.is_empty() {
        return Err(SimulationError::invalid(
            "duration_range",
            format!(
                "No whole-year duration between {} and {} months",
                input.min_duration_months, input.max_duration_months
            ),
        ));
    }

    let total_income = input.income.total_income();
    let max_effort_pct = input.income.max_effort_ratio * dec!(100);
    let r = monthly_rate(input.annual_rate_pct);

    let mut candidates = Vec::with_capacity(durations.len() * input.down_payment_grid_pct.len());
    for &duration in &durations {
        for &pct in &input.down_payment_grid_pct {
            let down_payment = input.property_price * pct / dec!(100);
            let principal = input.property_price - down_payment;
            let monthly_payment = amortization::compute_payment(principal, r, duration)?;
            let instalments = monthly_payment * Decimal::from(duration);
            let effort_ratio_pct = pct_of(monthly_payment, total_income);
            let within_savings = input
                .available_savings
                .map_or(true, |savings| down_payment <= savings);

            candidates.push(OptimizationCandidate {
                duration_months: duration,
                down_payment_pct: pct,
                down_payment,
                principal,
                monthly_payment,
                total_cost: down_payment + instalments,
                total_interest: instalments - principal,
                effort_ratio_pct,
                feasible: effort_ratio_pct <= max_effort_pct && within_savings,
            });
        }
    }

    candidates.sort_by(rank);
    let feasible_count = candidates.iter().filter(|c| c.feasible).count();

    let optimal_idx = candidates.iter().position(|c| c.feasible).ok_or_else(|| {
        tracing::warn!(
            price = %input.property_price,
            %total_income,
            "no feasible duration/down-payment combination"
        );
        SimulationError::Infeasible(format!(
            "No combination of {} durations and {} down payments keeps the effort ratio within {}%",
            durations.len(),
            input.down_payment_grid_pct.len(),
            max_effort_pct.normalize()
        ))
    })?;

    let optimal = candidates.remove(optimal_idx);
    if durations.len() > 1 && durations.last() == Some(&optimal.duration_months) {
        warnings.push("Optimum sits at the longest duration searched".into());
    }

    let mut alternatives = Vec::with_capacity(candidates.len() + 1);
    alternatives.push(optimal.clone());
    alternatives.extend(candidates);

    tracing::debug!(
        duration = optimal.duration_months,
        down_payment_pct = %optimal.down_payment_pct,
        evaluated = alternatives.len(),
        "optimal candidate selected"
    );

    let output = OptimizationOutput {
        optimal,
        evaluated: alternatives.len(),
        alternatives,
        feasible_count,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Duration x down-payment grid search (min total outlay under effort-ratio constraint)",
        input,
        warnings,
        elapsed,
        output,
    ))
}

/// Whole-year durations (multiples of 12) within `[min, max]`.
pub fn duration_steps(min_months: Months, max_months: Months) -> Vec<Months> {
    let first = min_months.div_ceil(12).max(1) * 12;
    (first..=max_months).step_by(12).collect()
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Ascending total cost, then shorter duration, then larger down payment.
fn rank(a: &OptimizationCandidate, b: &OptimizationCandidate) -> Ordering {
    a.total_cost
        .cmp(&b.total_cost)
        .then(a.duration_months.cmp(&b.duration_months))
        .then(b.down_payment.cmp(&a.down_payment))
}

fn validate_input(input: &OptimizationInput) -> SimulationResult<()> {
    if input.property_price <= Decimal::ZERO {
        return Err(SimulationError::invalid(
            "property_price",
            "Property price must be positive",
        ));
    }
    validate_amount("property_price", input.property_price)?;
    validate_income(&input.income)?;
    if input.income.total_income() <= Decimal::ZERO {
        return Err(SimulationError::invalid(
            "net_monthly_income",
            "Income must be positive to compute an effort ratio",
        ));
    }
    validate_rate("annual_rate_pct", input.annual_rate_pct)?;
    validate_term("max_duration_months", input.max_duration_months)?;
    if input.min_duration_months == 0 || input.min_duration_months > input.max_duration_months {
        return Err(SimulationError::invalid(
            "duration_range",
            "Duration range must satisfy 0 < min <= max",
        ));
    }
    if input.down_payment_grid_pct.is_empty() {
        return Err(SimulationError::InsufficientData(
            "At least one down-payment percentage is required".into(),
        ));
    }
    if input
        .down_payment_grid_pct
        .iter()
        .any(|p| *p < Decimal::ZERO || *p >= dec!(100))
    {
        return Err(SimulationError::invalid(
            "down_payment_grid_pct",
            "Down-payment percentages must lie in [0, 100)",
        ));
    }
    if let Some(savings) = input.available_savings {
        validate_amount("available_savings", savings)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn base_input() -> OptimizationInput {
        OptimizationInput {
            property_price: dec!(250000),
            income: IncomeProfile {
                net_monthly_income: dec!(4000),
                other_monthly_income: Decimal::ZERO,
                monthly_expenses: dec!(500),
                max_effort_ratio: dec!(0.33),
            },
            annual_rate_pct: dec!(3.5),
            min_duration_months: 120,
            max_duration_months: 300,
            down_payment_grid_pct: vec![dec!(0), dec!(10), dec!(20), dec!(30)],
            available_savings: None,
        }
    }

    #[test]
    fn test_duration_steps() {
        assert_eq!(duration_steps(120, 300).len(), 16);
        assert_eq!(duration_steps(120, 300)[0], 120);
        assert_eq!(duration_steps(100, 130), vec![108, 120]);
        assert_eq!(duration_steps(1, 11), Vec::<Months>::new());
        assert_eq!(duration_steps(0, 24), vec![12, 24]);
    }

    #[test]
    fn test_optimal_is_cheapest_feasible() {
        let out = optimize(&base_input()).unwrap().result;
        assert!(out.optimal.feasible);
        assert!(out.optimal.effort_ratio_pct <= dec!(33));
        for c in out.alternatives.iter().filter(|c| c.feasible) {
            assert!(out.optimal.total_cost <= c.total_cost);
        }
        assert_eq!(out.alternatives[0], out.optimal);
        assert_eq!(out.evaluated, 16 * 4);
    }

    #[test]
    fn test_alternatives_stay_in_range_and_sorted() {
        let out = optimize(&base_input()).unwrap().result;
        for c in &out.alternatives {
            assert!(c.duration_months >= 120 && c.duration_months <= 300);
        }
        for pair in out.alternatives[1..].windows(2) {
            assert!(pair[0].total_cost <= pair[1].total_cost);
        }
    }

    #[test]
    fn test_largest_down_payment_shortest_affordable_duration_wins() {
        let out = optimize(&base_input()).unwrap().result;
        // 30% down leaves 175k; 1320/month first covers it over 14 years.
        assert_eq!(out.optimal.down_payment_pct, dec!(30));
        assert_eq!(out.optimal.duration_months, 168);
        let payment_one_year_shorter = amortization::compute_payment(
            dec!(175000),
            monthly_rate(dec!(3.5)),
            out.optimal.duration_months - 12,
        )
        .unwrap();
        assert!(payment_one_year_shorter > dec!(1320));
    }

    #[test]
    fn test_savings_cap_limits_down_payment() {
        let mut input = base_input();
        input.available_savings = Some(dec!(30000));
        let out = optimize(&input).unwrap().result;
        assert!(out.optimal.down_payment <= dec!(30000));
        assert_eq!(out.optimal.down_payment_pct, dec!(10));
    }

    #[test]
    fn test_deterministic() {
        let a = optimize(&base_input()).unwrap().result;
        let b = optimize(&base_input()).unwrap().result;
        assert_eq!(a.optimal, b.optimal);
        assert_eq!(a.alternatives, b.alternatives);
    }

    #[test]
    fn test_amounts_beyond_ceiling_rejected() {
        let mut input = base_input();
        input.income.net_monthly_income = MAX_AMOUNT * dec!(1000);
        input.property_price = MAX_AMOUNT * dec!(70000);
        input.annual_rate_pct = dec!(5);
        input.max_duration_months = 600;
        match optimize(&input).unwrap_err() {
            SimulationError::InvalidInput { field, .. } => assert_eq!(field, "property_price"),
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_duration_range_beyond_ceiling_rejected() {
        let mut input = base_input();
        input.max_duration_months = u32::MAX - 1;
        match optimize(&input).unwrap_err() {
            SimulationError::InvalidInput { field, .. } => assert_eq!(field, "max_duration_months"),
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_no_feasible_solution() {
        let mut input = base_input();
        input.income.net_monthly_income = dec!(800);
        let err = optimize(&input).unwrap_err();
        assert!(matches!(err, SimulationError::Infeasible(_)));
    }

    #[test]
    fn test_range_without_whole_year_rejected() {
        let mut input = base_input();
        input.min_duration_months = 121;
        input.max_duration_months = 130;
        let err = optimize(&input).unwrap_err();
        match err {
            SimulationError::InvalidInput { field, .. } => assert_eq!(field, "duration_range"),
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_tie_break_prefers_shorter_then_larger_down_payment() {
        let base = OptimizationCandidate {
            duration_months: 240,
            down_payment_pct: dec!(10),
            down_payment: dec!(25000),
            principal: dec!(225000),
            monthly_payment: dec!(1000),
            total_cost: dec!(300000),
            total_interest: dec!(50000),
            effort_ratio_pct: dec!(25),
            feasible: true,
        };
        let shorter = OptimizationCandidate { duration_months: 180, ..base.clone() };
        let bigger_down = OptimizationCandidate { down_payment: dec!(50000), ..base.clone() };
        assert_eq!(rank(&shorter, &base), Ordering::Less);
        assert_eq!(rank(&bigger_down, &base), Ordering::Less);
    }
}
