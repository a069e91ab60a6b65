use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::amortization;
use crate::error::SimulationError;
use crate::types::*;
use crate::SimulationResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Rate in force from `from_month` (0-based instalment index) until the next
/// segment starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatePathSegment {
    pub from_month: Months,
    pub annual_rate_pct: RatePct,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableRateInput {
    pub principal: Money,
    pub term_months: Months,
    /// Ordered rate path; the first segment must start at month 0.
    pub segments: Vec<RatePathSegment>,
}

/// State of the loan at the end of one loan year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearProjection {
    /// 1-based loan year
    pub year: u32,
    /// Rate in force at year end
    pub annual_rate_pct: RatePct,
    /// Instalment in force at year end
    pub monthly_payment: Money,
    pub remaining_balance: Money,
    /// Interest paid during this year
    pub interest_paid: Money,
}

/// A point where the rate changed and the loan was re-amortised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repricing {
    /// Instalments already paid when the new rate applies
    pub month: Months,
    pub annual_rate_pct: RatePct,
    pub monthly_payment: Money,
    /// Balance re-amortised at the new rate
    pub balance: Money,
    /// Instalments left over which that balance is spread
    pub remaining_term: Months,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableRateOutput {
    pub initial_payment: Money,
    pub projections: Vec<YearProjection>,
    pub repricings: Vec<Repricing>,
    pub total_interest: Money,
    pub total_paid: Money,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Project a loan along a fixed-then-variable rate path.
///
/// At each segment boundary whose rate differs from the one in force, the
/// payment is recomputed from the current balance over the remaining term.
/// The term never resets, so a flat path reproduces the fixed-rate schedule
/// exactly.
pub fn project_variable_rate(
    input: &VariableRateInput,
) -> SimulationResult<ComputationOutput<VariableRateOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_input(input)?;

    let term = input.term_months;
    let mut rate_pct = input.segments[0].annual_rate_pct;
    let mut r = monthly_rate(rate_pct);
    let mut payment = round_money(amortization::compute_payment(input.principal, r, term)?);
    let initial_payment = payment;

    let mut balance = input.principal;
    let mut next_segment = 1;
    let mut year_interest = Decimal::ZERO;
    let mut total_interest = Decimal::ZERO;
    let mut total_paid = Decimal::ZERO;
    let mut projections = Vec::with_capacity(term.div_ceil(12) as usize);
    let mut repricings = Vec::new();

    for month in 0..term {
        if let Some(segment) = input.segments.get(next_segment) {
            if segment.from_month == month {
                next_segment += 1;
                if segment.annual_rate_pct != rate_pct {
                    rate_pct = segment.annual_rate_pct;
                    r = monthly_rate(rate_pct);
                    let remaining_term = term - month;
                    payment = round_money(amortization::compute_payment(balance, r, remaining_term)?);
                    tracing::debug!(month, rate = %rate_pct, %payment, "loan repriced");
                    repricings.push(Repricing {
                        month,
                        annual_rate_pct: rate_pct,
                        monthly_payment: payment,
                        balance,
                        remaining_term,
                    });
                }
            }
        }

        let interest = round_money(balance * r);
        let mut principal_part = (payment - interest).max(Decimal::ZERO);
        if month + 1 == term || principal_part > balance {
            principal_part = balance;
        }
        balance -= principal_part;
        year_interest += interest;
        total_interest += interest;
        total_paid += principal_part + interest;

        if (month + 1) % 12 == 0 || month + 1 == term {
            projections.push(YearProjection {
                year: (month + 1).div_ceil(12),
                annual_rate_pct: rate_pct,
                monthly_payment: payment,
                remaining_balance: balance,
                interest_paid: year_interest,
            });
            year_interest = Decimal::ZERO;
        }
    }

    if initial_payment > Decimal::ZERO {
        if let Some(peak) = repricings.iter().map(|p| p.monthly_payment).max() {
            let increase = pct_of(peak - initial_payment, initial_payment);
            if increase > dec!(20) {
                warnings.push(format!(
                    "Payment rises {}% above the initial instalment",
                    round_pct(increase)
                ));
            }
        }
    }

    let output = VariableRateOutput {
        initial_payment,
        projections,
        repricings,
        total_interest,
        total_paid,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Variable-rate projection (re-amortisation over remaining term at each repricing)",
        input,
        warnings,
        elapsed,
        output,
    ))
}

/// Build an annual repricing path: the initial rate holds for
/// `fixed_period_months`, then moves by `annual_variation_pct` each year.
///
/// Rates are kept within `[0, MAX_RATE_PCT]` and, when `cap_pct` is given,
/// within `initial ± cap_pct`. A zero fixed period means the first repricing falls
/// after one year; a fixed period covering the whole term yields one segment.
pub fn build_rate_path(
    initial_rate_pct: RatePct,
    fixed_period_months: Months,
    annual_variation_pct: RatePct,
    term_months: Months,
    cap_pct: Option<RatePct>,
) -> Vec<RatePathSegment> {
    let mut segments = vec![RatePathSegment {
        from_month: 0,
        annual_rate_pct: initial_rate_pct,
    }];

    let end = term_months.min(MAX_TERM_MONTHS);
    let mut month = if fixed_period_months == 0 { 12 } else { fixed_period_months };
    let mut step = Decimal::ONE;
    while month < end {
        let mut rate = initial_rate_pct.saturating_add(annual_variation_pct.saturating_mul(step));
        if let Some(cap) = cap_pct {
            let cap = cap.abs();
            rate = rate.clamp(
                initial_rate_pct.saturating_sub(cap),
                initial_rate_pct.saturating_add(cap),
            );
        }
        segments.push(RatePathSegment {
            from_month: month,
            annual_rate_pct: rate.clamp(Decimal::ZERO, MAX_RATE_PCT),
        });
        month += 12;
        step += Decimal::ONE;
    }

    segments
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_input(input: &VariableRateInput) -> SimulationResult<()> {
    validate_term("term_months", input.term_months)?;
    validate_amount("principal", input.principal)?;

    let first = input.segments.first().ok_or_else(|| {
        SimulationError::InsufficientData("A rate path needs at least one segment".into())
    })?;
    if first.from_month != 0 {
        return Err(SimulationError::invalid(
            "segments",
            "The first rate segment must start at month 0",
        ));
    }

    for pair in input.segments.windows(2) {
        if pair[1].from_month <= pair[0].from_month {
            return Err(SimulationError::invalid(
                "segments",
                format!(
                    "Segments must be strictly increasing (month {} follows {})",
                    pair[1].from_month, pair[0].from_month
                ),
            ));
        }
    }

    for segment in &input.segments {
        if segment.from_month >= input.term_months {
            return Err(SimulationError::invalid(
                "segments",
                format!("Segment at month {} starts after the loan ends", segment.from_month),
            ));
        }
        if segment.annual_rate_pct < Decimal::ZERO || segment.annual_rate_pct > MAX_RATE_PCT {
            return Err(SimulationError::invalid(
                "annual_rate_pct",
                format!("Rate {} at month {} is out of range", segment.annual_rate_pct, segment.from_month),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn flat_input(rate: Decimal) -> VariableRateInput {
        VariableRateInput {
            principal: dec!(200000),
            term_months: 240,
            segments: vec![
                RatePathSegment { from_month: 0, annual_rate_pct: rate },
                RatePathSegment { from_month: 60, annual_rate_pct: rate },
                RatePathSegment { from_month: 72, annual_rate_pct: rate },
            ],
        }
    }

    #[test]
    fn test_flat_path_matches_fixed_schedule() {
        let out = project_variable_rate(&flat_input(dec!(3.5))).unwrap().result;
        let schedule =
            amortization::compute_schedule(dec!(200000), monthly_rate(dec!(3.5)), 240).unwrap();

        assert!(out.repricings.is_empty());
        assert_eq!(out.initial_payment, schedule.monthly_payment);
        assert_eq!(out.total_interest, schedule.total_interest);
        assert_eq!(out.projections.len(), 20);
        for p in &out.projections {
            assert_eq!(p.remaining_balance, schedule.remaining_balance_after(p.year * 12));
            assert_eq!(p.monthly_payment, schedule.monthly_payment);
        }
    }

    #[test]
    fn test_repricing_uses_remaining_term() {
        let input = VariableRateInput {
            principal: dec!(200000),
            term_months: 240,
            segments: vec![
                RatePathSegment { from_month: 0, annual_rate_pct: dec!(3.5) },
                RatePathSegment { from_month: 60, annual_rate_pct: dec!(4.5) },
            ],
        };
        let out = project_variable_rate(&input).unwrap().result;
        assert_eq!(out.repricings.len(), 1);

        let event = &out.repricings[0];
        assert_eq!(event.month, 60);
        assert_eq!(event.remaining_term, 180);

        let fixed = amortization::compute_schedule(dec!(200000), monthly_rate(dec!(3.5)), 240).unwrap();
        assert_eq!(event.balance, fixed.remaining_balance_after(60));

        let expected =
            amortization::compute_payment(event.balance, monthly_rate(dec!(4.5)), 180).unwrap();
        assert_eq!(event.monthly_payment, expected.round_dp(2));
        assert!(event.monthly_payment > out.initial_payment);

        // Year 6 reports the new rate, the loan still closes on time
        assert_eq!(out.projections[5].annual_rate_pct, dec!(4.5));
        assert_eq!(out.projections.len(), 20);
        assert_eq!(out.projections[19].remaining_balance, Decimal::ZERO);
    }

    #[test]
    fn test_fixed_period_covering_term_has_single_segment() {
        let path = build_rate_path(dec!(3.5), 240, dec!(0.2), 240, None);
        assert_eq!(path.len(), 1);

        let out = project_variable_rate(&VariableRateInput {
            principal: dec!(150000),
            term_months: 240,
            segments: path,
        })
        .unwrap()
        .result;
        assert!(out.repricings.is_empty());
    }

    #[test]
    fn test_build_rate_path_annual_steps() {
        let path = build_rate_path(dec!(3.5), 60, dec!(0.2), 240, None);
        // month 0, then 60, 72, ..., 228
        assert_eq!(path.len(), 1 + 15);
        assert_eq!(path[1], RatePathSegment { from_month: 60, annual_rate_pct: dec!(3.7) });
        assert_eq!(path[2], RatePathSegment { from_month: 72, annual_rate_pct: dec!(3.9) });
        assert_eq!(path.last().unwrap().from_month, 228);
    }

    #[test]
    fn test_build_rate_path_cap_and_floor() {
        let capped = build_rate_path(dec!(3.0), 12, dec!(0.5), 120, Some(dec!(1)));
        assert!(capped.iter().all(|s| s.annual_rate_pct <= dec!(4.0)));
        assert_eq!(capped.last().unwrap().annual_rate_pct, dec!(4.0));

        let falling = build_rate_path(dec!(1.0), 12, dec!(-0.5), 120, None);
        assert!(falling.iter().all(|s| s.annual_rate_pct >= Decimal::ZERO));
        assert_eq!(falling.last().unwrap().annual_rate_pct, Decimal::ZERO);
    }

    #[test]
    fn test_zero_fixed_period_reprices_after_first_year() {
        let path = build_rate_path(dec!(3.0), 0, dec!(0.1), 36, None);
        assert_eq!(path.iter().map(|s| s.from_month).collect::<Vec<_>>(), vec![0, 12, 24]);
    }

    #[test]
    fn test_first_segment_must_start_at_zero() {
        let input = VariableRateInput {
            principal: dec!(100000),
            term_months: 120,
            segments: vec![RatePathSegment { from_month: 12, annual_rate_pct: dec!(3) }],
        };
        let err = project_variable_rate(&input).unwrap_err();
        match err {
            SimulationError::InvalidInput { field, .. } => assert_eq!(field, "segments"),
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_unordered_segments_rejected() {
        let input = VariableRateInput {
            principal: dec!(100000),
            term_months: 120,
            segments: vec![
                RatePathSegment { from_month: 0, annual_rate_pct: dec!(3) },
                RatePathSegment { from_month: 48, annual_rate_pct: dec!(3.2) },
                RatePathSegment { from_month: 36, annual_rate_pct: dec!(3.4) },
            ],
        };
        assert!(project_variable_rate(&input).is_err());
    }

    #[test]
    fn test_partial_final_year_reported() {
        let input = VariableRateInput {
            principal: dec!(50000),
            term_months: 30,
            segments: vec![RatePathSegment { from_month: 0, annual_rate_pct: dec!(2) }],
        };
        let out = project_variable_rate(&input).unwrap().result;
        assert_eq!(out.projections.len(), 3);
        assert_eq!(out.projections[2].year, 3);
        assert_eq!(out.projections[2].remaining_balance, Decimal::ZERO);
    }

    #[test]
    fn test_extreme_path_parameters_stay_in_range() {
        let path = build_rate_path(dec!(3.5), 12, Decimal::MAX, u32::MAX, Some(Decimal::MAX));
        assert_eq!(path.len() as u32, MAX_TERM_MONTHS / 12);
        assert!(path.iter().skip(1).all(|s| s.annual_rate_pct == MAX_RATE_PCT));
    }

    #[test]
    fn test_term_beyond_ceiling_rejected() {
        let input = VariableRateInput {
            principal: dec!(100000),
            term_months: u32::MAX,
            segments: vec![RatePathSegment { from_month: 0, annual_rate_pct: dec!(3) }],
        };
        match project_variable_rate(&input).unwrap_err() {
            SimulationError::InvalidInput { field, .. } => assert_eq!(field, "term_months"),
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
    }
}
