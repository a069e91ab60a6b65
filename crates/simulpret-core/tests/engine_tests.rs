use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use simulpret_core::amortization::{self, LoanTerms};
use simulpret_core::capacity::{self, CapacityInput, IncomeProfile};
use simulpret_core::offers::{self, BankOffer, OfferComparisonInput};
use simulpret_core::optimizer::{self, OptimizationInput};
use simulpret_core::stress_test::{self, RiskLevel, StressTestInput};
use simulpret_core::variable_rate::{self, RatePathSegment, VariableRateInput};
use simulpret_core::{monthly_rate, SimulationError, SimulationPolicy};

fn household() -> IncomeProfile {
    IncomeProfile {
        net_monthly_income: dec!(4000),
        other_monthly_income: Decimal::ZERO,
        monthly_expenses: dec!(500),
        max_effort_ratio: dec!(0.33),
    }
}

// ===========================================================================
// Amortization
// ===========================================================================

#[test]
fn test_schedules_close_at_zero_across_terms_and_rates() {
    for (principal, rate, term) in [
        (dec!(200000), dec!(3.5), 240),
        (dec!(12345.67), dec!(1.1), 37),
        (dec!(999999), dec!(7.25), 300),
        (dec!(50000), Decimal::ZERO, 61),
        (dec!(1), dec!(4), 12),
    ] {
        let schedule = amortization::compute_schedule(principal, monthly_rate(rate), term).unwrap();
        let repaid: Decimal = schedule.periods.iter().map(|p| p.principal).sum();
        assert_eq!(repaid, principal, "principal sum for {principal} @ {rate}% / {term}");
        assert_eq!(schedule.periods.last().unwrap().remaining_balance, Decimal::ZERO);
        assert_eq!(schedule.periods.len(), term as usize);
    }
}

#[test]
fn test_build_schedule_warns_beyond_25_years() {
    let out = amortization::build_schedule(&LoanTerms {
        principal: dec!(150000),
        annual_rate_pct: dec!(3.9),
        term_months: 360,
    })
    .unwrap();
    assert_eq!(out.warnings.len(), 1);
    assert_eq!(out.result.periods.len(), 360);
}

// ===========================================================================
// Capacity
// ===========================================================================

#[test]
fn test_capacity_round_trips_through_the_primitive() {
    for (rate, term) in [(dec!(3.5), 240), (dec!(4.2), 300), (dec!(2.1), 180)] {
        let out = capacity::compute_capacity(&CapacityInput {
            income: household(),
            annual_rate_pct: rate,
            term_months: term,
        })
        .unwrap()
        .result;
        let payment =
            amortization::compute_payment(out.max_principal, monthly_rate(rate), term).unwrap();
        assert!((payment - out.max_monthly_payment).abs() < dec!(0.01));
    }
}

// ===========================================================================
// Variable rate
// ===========================================================================

#[test]
fn test_rising_path_reprices_over_remaining_term() {
    let segments = variable_rate::build_rate_path(dec!(3), 60, dec!(0.5), 240, None);
    let out = variable_rate::project_variable_rate(&VariableRateInput {
        principal: dec!(200000),
        term_months: 240,
        segments,
    })
    .unwrap()
    .result;

    assert_eq!(out.repricings.len(), 15);
    for event in &out.repricings {
        assert_eq!(event.remaining_term, 240 - event.month);
    }
    let payments: Vec<Decimal> = out.repricings.iter().map(|r| r.monthly_payment).collect();
    assert!(payments.windows(2).all(|w| w[1] > w[0]));
    assert_eq!(out.projections.last().unwrap().remaining_balance, Decimal::ZERO);
}

#[test]
fn test_flat_path_matches_fixed_schedule() {
    let fixed = amortization::compute_schedule(dec!(180000), monthly_rate(dec!(3.7)), 300).unwrap();
    let segments: Vec<RatePathSegment> = (0..25)
        .map(|y| RatePathSegment {
            from_month: y * 12,
            annual_rate_pct: dec!(3.7),
        })
        .collect();
    let out = variable_rate::project_variable_rate(&VariableRateInput {
        principal: dec!(180000),
        term_months: 300,
        segments,
    })
    .unwrap()
    .result;

    assert!(out.repricings.is_empty());
    assert_eq!(out.total_interest, fixed.total_interest);
    for row in &out.projections {
        assert_eq!(row.remaining_balance, fixed.remaining_balance_after(row.year * 12));
    }
}

// ===========================================================================
// Optimizer
// ===========================================================================

#[test]
fn test_optimizer_respects_effort_threshold() {
    let input = OptimizationInput {
        property_price: dec!(320000),
        income: household(),
        annual_rate_pct: dec!(3.6),
        min_duration_months: 180,
        max_duration_months: 300,
        down_payment_grid_pct: SimulationPolicy::default().down_payment_grid_pct,
        available_savings: Some(dec!(70000)),
    };
    let out = optimizer::optimize(&input).unwrap().result;
    assert!(out.optimal.effort_ratio_pct <= dec!(33));
    assert!(out.optimal.down_payment <= dec!(70000));
    let cheaper_feasible = out
        .alternatives
        .iter()
        .filter(|c| c.feasible)
        .any(|c| c.total_cost < out.optimal.total_cost);
    assert!(!cheaper_feasible);
}

// ===========================================================================
// Stress test
// ===========================================================================

#[test]
fn test_stress_risk_never_rises_with_income() {
    let policy = SimulationPolicy::default();
    let mut previous = RiskLevel::High;
    for income in (2000..=12000).step_by(500) {
        let out = stress_test::run_stress_test(
            &StressTestInput {
                monthly_income: Decimal::from(income),
                monthly_expenses: dec!(400),
                monthly_payment: dec!(1100),
            },
            &policy.stress,
        )
        .unwrap()
        .result;
        assert!(out.global_risk <= previous);
        previous = out.global_risk;
    }
    assert_eq!(previous, RiskLevel::Medium);
}

// ===========================================================================
// Offers
// ===========================================================================

#[test]
fn test_offers_first_entry_is_best() {
    let offer = |name: &str, rate: Decimal, fees: Decimal| BankOffer {
        bank_name: name.into(),
        annual_rate_pct: rate,
        term_months: 240,
        upfront_fees: fees,
        monthly_insurance_flat: dec!(40),
        annual_insurance_rate_pct: Decimal::ZERO,
    };
    let out = offers::compare_offers(&OfferComparisonInput {
        borrowed_amount: dec!(250000),
        offers: vec![
            offer("CIC", dec!(3.72), dec!(500)),
            offer("Crédit Mutuel", dec!(3.75), Decimal::ZERO),
            offer("BNP Paribas", dec!(3.70), dec!(1500)),
        ],
    })
    .unwrap()
    .result;

    assert_eq!(out.comparisons[0].cost_delta_vs_best, Decimal::ZERO);
    assert!(out
        .comparisons
        .windows(2)
        .all(|w| w[0].total_cost <= w[1].total_cost));
    let ranks: Vec<usize> = out.comparisons.iter().map(|c| c.rank).collect();
    assert_eq!(ranks, vec![1, 2, 3]);
}

#[test]
fn test_one_offer_is_insufficient() {
    let err = offers::compare_offers(&OfferComparisonInput {
        borrowed_amount: dec!(250000),
        offers: vec![BankOffer {
            bank_name: "LCL".into(),
            annual_rate_pct: dec!(3.8),
            term_months: 240,
            upfront_fees: Decimal::ZERO,
            monthly_insurance_flat: Decimal::ZERO,
            annual_insurance_rate_pct: Decimal::ZERO,
        }],
    })
    .unwrap_err();
    match err {
        SimulationError::InsufficientData(_) => {}
        other => panic!("Expected InsufficientData, got {other:?}"),
    }
}
