//! Wire records exchanged with the web front-end.
//!
//! Field names are the French ones the forms post and the result tables read.
//! Each request converts into the typed calculator input, runs it under a
//! [`SimulationPolicy`] and converts the result back, rounding money and
//! percentages to two decimals and emitting them as JSON numbers.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::amortization::{self, LoanTerms};
use crate::capacity::{self, CapacityInput, IncomeProfile, INSUFFICIENT_INCOME};
use crate::error::SimulationError;
use crate::offers::{self, BankOffer, OfferComparisonInput};
use crate::optimizer::{self, OptimizationCandidate, OptimizationInput};
use crate::policy::SimulationPolicy;
use crate::rental::{self, RentalInput};
use crate::stress_test::{self, RiskLevel, StressTestInput};
use crate::types::*;
use crate::variable_rate::{self, VariableRateInput};
use crate::SimulationResult;

fn income(
    policy: &SimulationPolicy,
    salaire: Money,
    autres_revenus: Money,
    charges: Money,
    taux_effort_max: Option<Ratio>,
) -> IncomeProfile {
    IncomeProfile {
        net_monthly_income: salaire,
        other_monthly_income: autres_revenus,
        monthly_expenses: charges,
        max_effort_ratio: taux_effort_max.unwrap_or(policy.default_max_effort_ratio),
    }
}

// ---------------------------------------------------------------------------
// Capacity  (POST /calculate)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapacityRequest {
    pub salaire: Money,
    #[serde(default)]
    pub autres_revenus: Money,
    #[serde(default)]
    pub charges: Money,
    pub taux: RatePct,
    pub duree: Months,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taux_effort_max: Option<Ratio>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapacityResponse {
    #[serde(with = "rust_decimal::serde::float")]
    pub montant: Money,
    #[serde(with = "rust_decimal::serde::float")]
    pub mensualite_max: Money,
    #[serde(with = "rust_decimal::serde::float")]
    pub cout_total: Money,
    #[serde(with = "rust_decimal::serde::float")]
    pub cout_credit: Money,
    #[serde(with = "rust_decimal::serde::float")]
    pub revenu_total: Money,
    /// Ratio, e.g. 0.33
    #[serde(with = "rust_decimal::serde::float")]
    pub taux_effort_utilise: Ratio,
    #[serde(with = "rust_decimal::serde::float")]
    pub reste_a_vivre: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CapacityRequest {
    pub fn to_input(&self, policy: &SimulationPolicy) -> CapacityInput {
        CapacityInput {
            income: income(policy, self.salaire, self.autres_revenus, self.charges, self.taux_effort_max),
            annual_rate_pct: self.taux,
            term_months: self.duree,
        }
    }

    pub fn run(&self, policy: &SimulationPolicy) -> SimulationResult<ComputationOutput<CapacityResponse>> {
        policy.check_loan_bounds(self.taux, self.duree)?;
        let out = capacity::compute_capacity(&self.to_input(policy))?;
        Ok(out.map(|r| CapacityResponse {
            montant: round_money(r.max_principal),
            mensualite_max: round_money(r.max_monthly_payment),
            cout_total: round_money(r.total_cost),
            cout_credit: round_money(r.total_interest),
            revenu_total: round_money(r.total_income),
            taux_effort_utilise: r.effort_ratio_used,
            reste_a_vivre: round_money(r.residual_income),
            error: r.error,
        }))
    }
}

// ---------------------------------------------------------------------------
// Amortization schedule
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleRequest {
    pub montant: Money,
    pub taux: RatePct,
    pub duree: Months,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleRow {
    pub mois: Months,
    #[serde(with = "rust_decimal::serde::float")]
    pub mensualite: Money,
    #[serde(with = "rust_decimal::serde::float")]
    pub interets: Money,
    #[serde(with = "rust_decimal::serde::float")]
    pub capital: Money,
    #[serde(with = "rust_decimal::serde::float")]
    pub capital_restant: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleResponse {
    #[serde(with = "rust_decimal::serde::float")]
    pub mensualite: Money,
    #[serde(with = "rust_decimal::serde::float")]
    pub cout_total: Money,
    #[serde(with = "rust_decimal::serde::float")]
    pub cout_credit: Money,
    pub echeancier: Vec<ScheduleRow>,
}

impl ScheduleRequest {
    pub fn run(&self, policy: &SimulationPolicy) -> SimulationResult<ComputationOutput<ScheduleResponse>> {
        policy.check_loan_bounds(self.taux, self.duree)?;
        let terms = LoanTerms {
            principal: self.montant,
            annual_rate_pct: self.taux,
            term_months: self.duree,
        };
        let out = amortization::build_schedule(&terms)?;
        // Schedule values are already in cents.
        Ok(out.map(|s| ScheduleResponse {
            mensualite: s.monthly_payment,
            cout_total: s.total_paid,
            cout_credit: s.total_interest,
            echeancier: s
                .periods
                .into_iter()
                .map(|p| ScheduleRow {
                    mois: p.period,
                    mensualite: p.payment,
                    interets: p.interest,
                    capital: p.principal,
                    capital_restant: p.remaining_balance,
                })
                .collect(),
        }))
    }
}

// ---------------------------------------------------------------------------
// Variable rate  (POST /calculate/variable-rate)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableRateRequest {
    pub salaire: Money,
    #[serde(default)]
    pub charges: Money,
    pub taux_initial: RatePct,
    pub duree: Months,
    /// Months at the initial rate before the first revision
    pub periode_fixe: Months,
    /// Rate change applied each year after the fixed period, in points
    pub variation_annuelle: RatePct,
    /// Maximum move away from the initial rate, in points
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cap_taux: Option<RatePct>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taux_effort_max: Option<Ratio>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableRateRow {
    pub annee: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub taux: RatePct,
    #[serde(with = "rust_decimal::serde::float")]
    pub mensualite: Money,
    #[serde(with = "rust_decimal::serde::float")]
    pub capital_restant: Money,
    #[serde(with = "rust_decimal::serde::float")]
    pub interets_annee: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableRateResponse {
    #[serde(with = "rust_decimal::serde::float")]
    pub montant_initial: Money,
    #[serde(with = "rust_decimal::serde::float")]
    pub mensualite_initiale: Money,
    #[serde(with = "rust_decimal::serde::float")]
    pub cout_credit: Money,
    pub projections: Vec<VariableRateRow>,
}

impl VariableRateRequest {
    pub fn run(&self, policy: &SimulationPolicy) -> SimulationResult<ComputationOutput<VariableRateResponse>> {
        policy.check_loan_bounds(self.taux_initial, self.duree)?;

        // The loan is sized on the borrower's capacity at the initial rate.
        let sizing = CapacityInput {
            income: income(policy, self.salaire, Decimal::ZERO, self.charges, self.taux_effort_max),
            annual_rate_pct: self.taux_initial,
            term_months: self.duree,
        };
        let sized = capacity::compute_capacity(&sizing)?.result;
        if sized.error.is_some() {
            return Err(SimulationError::Infeasible(INSUFFICIENT_INCOME.into()));
        }

        let input = VariableRateInput {
            principal: sized.max_principal,
            term_months: self.duree,
            segments: variable_rate::build_rate_path(
                self.taux_initial,
                self.periode_fixe,
                self.variation_annuelle,
                self.duree,
                self.cap_taux,
            ),
        };
        let out = variable_rate::project_variable_rate(&input)?;
        Ok(out.map(|v| VariableRateResponse {
            montant_initial: round_money(input.principal),
            mensualite_initiale: round_money(v.initial_payment),
            cout_credit: round_money(v.total_interest),
            projections: v
                .projections
                .into_iter()
                .map(|p| VariableRateRow {
                    annee: p.year,
                    taux: round_pct(p.annual_rate_pct),
                    mensualite: round_money(p.monthly_payment),
                    capital_restant: round_money(p.remaining_balance),
                    interets_annee: round_money(p.interest_paid),
                })
                .collect(),
        }))
    }
}

// ---------------------------------------------------------------------------
// Optimization  (POST /calculate/optimization)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationRequest {
    pub salaire: Money,
    #[serde(default)]
    pub autres_revenus: Money,
    #[serde(default)]
    pub charges: Money,
    pub prix_bien: Money,
    pub taux: RatePct,
    pub duree_min: Months,
    pub duree_max: Months,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taux_effort_max: Option<Ratio>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epargne_disponible: Option<Money>,
    /// Overrides the policy's down-payment grid
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apports_pct: Option<Vec<Decimal>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationRow {
    pub duree: Months,
    #[serde(with = "rust_decimal::serde::float")]
    pub apport: Money,
    #[serde(with = "rust_decimal::serde::float")]
    pub apport_pct: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub montant_emprunte: Money,
    #[serde(with = "rust_decimal::serde::float")]
    pub mensualite: Money,
    #[serde(with = "rust_decimal::serde::float")]
    pub cout_total: Money,
    #[serde(with = "rust_decimal::serde::float")]
    pub cout_credit: Money,
    #[serde(with = "rust_decimal::serde::float")]
    pub taux_effort: Decimal,
    pub viable: bool,
}

impl From<OptimizationCandidate> for OptimizationRow {
    fn from(c: OptimizationCandidate) -> Self {
        Self {
            duree: c.duration_months,
            apport: round_money(c.down_payment),
            apport_pct: round_pct(c.down_payment_pct),
            montant_emprunte: round_money(c.principal),
            mensualite: round_money(c.monthly_payment),
            cout_total: round_money(c.total_cost),
            cout_credit: round_money(c.total_interest),
            taux_effort: round_pct(c.effort_ratio_pct),
            viable: c.feasible,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationResponse {
    pub optimal: OptimizationRow,
    pub alternatives: Vec<OptimizationRow>,
    pub combinaisons_evaluees: usize,
    pub combinaisons_viables: usize,
}

impl OptimizationRequest {
    pub fn run(&self, policy: &SimulationPolicy) -> SimulationResult<ComputationOutput<OptimizationResponse>> {
        policy.check_loan_bounds(self.taux, self.duree_max)?;
        let input = OptimizationInput {
            property_price: self.prix_bien,
            income: income(policy, self.salaire, self.autres_revenus, self.charges, self.taux_effort_max),
            annual_rate_pct: self.taux,
            min_duration_months: self.duree_min,
            max_duration_months: self.duree_max,
            down_payment_grid_pct: self
                .apports_pct
                .clone()
                .unwrap_or_else(|| policy.down_payment_grid_pct.clone()),
            available_savings: self.epargne_disponible,
        };
        let out = optimizer::optimize(&input)?;
        Ok(out.map(|o| OptimizationResponse {
            optimal: o.optimal.into(),
            alternatives: o.alternatives.into_iter().map(Into::into).collect(),
            combinaisons_evaluees: o.evaluated,
            combinaisons_viables: o.feasible_count,
        }))
    }
}

// ---------------------------------------------------------------------------
// Investment  (POST /calculate/investment)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestmentRequest {
    pub prix_bien: Money,
    #[serde(default)]
    pub apport: Money,
    pub taux: RatePct,
    pub duree: Months,
    pub loyer_mensuel: Money,
    #[serde(default)]
    pub charges_mensuelles: Money,
    #[serde(default)]
    pub impots_annuels: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestmentRow {
    pub annees: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub cash_flow_cumule: Money,
    #[serde(with = "rust_decimal::serde::float")]
    pub capital_rembourse: Money,
    #[serde(with = "rust_decimal::serde::float")]
    pub interets_annee: Money,
    #[serde(with = "rust_decimal::serde::float")]
    pub rendement_brut: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub rendement_net: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestmentResponse {
    #[serde(with = "rust_decimal::serde::float")]
    pub montant_emprunte: Money,
    #[serde(with = "rust_decimal::serde::float")]
    pub mensualite: Money,
    #[serde(with = "rust_decimal::serde::float")]
    pub cash_flow_mensuel: Money,
    #[serde(with = "rust_decimal::serde::float")]
    pub rentabilite_brute: Decimal,
    #[serde(
        default,
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub rendement_fonds_propres: Option<Decimal>,
    pub projections: Vec<InvestmentRow>,
}

impl InvestmentRequest {
    pub fn run(&self, policy: &SimulationPolicy) -> SimulationResult<ComputationOutput<InvestmentResponse>> {
        policy.check_loan_bounds(self.taux, self.duree)?;
        let input = RentalInput {
            property_price: self.prix_bien,
            down_payment: self.apport,
            annual_rate_pct: self.taux,
            term_months: self.duree,
            monthly_rent: self.loyer_mensuel,
            monthly_charges: self.charges_mensuelles,
            annual_taxes: self.impots_annuels,
            horizons_years: policy.rental_horizons_years.clone(),
        };
        let out = rental::analyze_investment(&input)?;
        Ok(out.map(|r| InvestmentResponse {
            montant_emprunte: round_money(r.principal),
            mensualite: round_money(r.monthly_payment),
            cash_flow_mensuel: round_money(r.monthly_cash_flow),
            rentabilite_brute: round_pct(r.gross_yield_pct),
            rendement_fonds_propres: r.cash_on_cash_pct.map(round_pct),
            projections: r
                .projections
                .into_iter()
                .map(|p| InvestmentRow {
                    annees: p.years,
                    cash_flow_cumule: round_money(p.cumulative_cash_flow),
                    capital_rembourse: round_money(p.capital_repaid),
                    interets_annee: round_money(p.interest_paid_in_year),
                    rendement_brut: round_pct(p.gross_yield_pct),
                    rendement_net: round_pct(p.net_yield_pct),
                })
                .collect(),
        }))
    }
}

// ---------------------------------------------------------------------------
// Stress test  (POST /calculate/stress-test)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressTestRequest {
    pub salaire: Money,
    #[serde(default)]
    pub charges: Money,
    pub mensualite_actuelle: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressScenarioRow {
    pub scenario: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub salaire: Money,
    #[serde(with = "rust_decimal::serde::float")]
    pub charges: Money,
    #[serde(with = "rust_decimal::serde::float")]
    pub capacite_paiement: Money,
    /// `null` when the scenario leaves no income
    #[serde(with = "rust_decimal::serde::float_option")]
    pub taux_effort: Option<Decimal>,
    pub viable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressTestResponse {
    pub scenarios: Vec<StressScenarioRow>,
    #[serde(with = "rust_decimal::serde::float")]
    pub marge_securite: Decimal,
    pub risque_global: RiskLevel,
}

impl StressTestRequest {
    pub fn run(&self, policy: &SimulationPolicy) -> SimulationResult<ComputationOutput<StressTestResponse>> {
        let input = StressTestInput {
            monthly_income: self.salaire,
            monthly_expenses: self.charges,
            monthly_payment: self.mensualite_actuelle,
        };
        let out = stress_test::run_stress_test(&input, &policy.stress)?;
        Ok(out.map(|s| StressTestResponse {
            scenarios: s
                .scenarios
                .into_iter()
                .map(|sc| StressScenarioRow {
                    scenario: sc.label,
                    salaire: round_money(sc.adjusted_income),
                    charges: round_money(sc.adjusted_expenses),
                    capacite_paiement: round_money(sc.payment_headroom),
                    taux_effort: sc.effort_ratio_pct.map(round_pct),
                    viable: sc.viable,
                })
                .collect(),
            marge_securite: round_pct(s.safety_margin_pct),
            risque_global: s.global_risk,
        }))
    }
}

// ---------------------------------------------------------------------------
// Multi-offer  (POST /calculate/multi-offer)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfferRequest {
    pub bank_name: String,
    pub taux: RatePct,
    pub duree: Months,
    #[serde(default)]
    pub frais_dossier: Money,
    #[serde(default)]
    pub assurance_mensuelle: Money,
    /// Annual insurance rate on the borrowed amount; wins over the flat amount
    #[serde(default)]
    pub taux_assurance: RatePct,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiOfferRequest {
    pub prix_bien: Money,
    #[serde(default)]
    pub apport: Money,
    pub offers: Vec<OfferRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfferRow {
    pub rang: usize,
    pub bank_name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub mensualite_credit: Money,
    #[serde(with = "rust_decimal::serde::float")]
    pub assurance_mensuelle: Money,
    #[serde(with = "rust_decimal::serde::float")]
    pub mensualite_totale: Money,
    #[serde(with = "rust_decimal::serde::float")]
    pub frais_dossier: Money,
    #[serde(with = "rust_decimal::serde::float")]
    pub cout_total: Money,
    #[serde(with = "rust_decimal::serde::float")]
    pub cout_credit: Money,
    #[serde(with = "rust_decimal::serde::float")]
    pub taux: RatePct,
    pub duree: Months,
    #[serde(
        default,
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub taeg: Option<Decimal>,
    /// Extra cost versus the cheapest offer (0 for the best one)
    #[serde(with = "rust_decimal::serde::float")]
    pub economie: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiOfferResponse {
    pub comparisons: Vec<OfferRow>,
    #[serde(with = "rust_decimal::serde::float")]
    pub montant_emprunte: Money,
}

impl MultiOfferRequest {
    pub fn run(&self, policy: &SimulationPolicy) -> SimulationResult<ComputationOutput<MultiOfferResponse>> {
        if self.apport < Decimal::ZERO || self.apport >= self.prix_bien {
            return Err(SimulationError::invalid(
                "apport",
                "Down payment must lie in [0, prix_bien)",
            ));
        }
        for o in &self.offers {
            policy.check_loan_bounds(o.taux, o.duree)?;
        }

        let input = OfferComparisonInput {
            borrowed_amount: self.prix_bien - self.apport,
            offers: self
                .offers
                .iter()
                .map(|o| BankOffer {
                    bank_name: o.bank_name.clone(),
                    annual_rate_pct: o.taux,
                    term_months: o.duree,
                    upfront_fees: o.frais_dossier,
                    monthly_insurance_flat: o.assurance_mensuelle,
                    annual_insurance_rate_pct: o.taux_assurance,
                })
                .collect(),
        };
        let out = offers::compare_offers(&input)?;
        Ok(out.map(|c| {
            // Displayed savings are the difference of the displayed totals.
            let best_total = c
                .comparisons
                .first()
                .map(|o| round_money(o.total_cost))
                .unwrap_or_default();
            MultiOfferResponse {
                montant_emprunte: round_money(c.borrowed_amount),
                comparisons: c
                    .comparisons
                    .into_iter()
                    .map(|o| OfferRow {
                        rang: o.rank,
                        bank_name: o.bank_name,
                        mensualite_credit: round_money(o.monthly_credit_payment),
                        assurance_mensuelle: round_money(o.monthly_insurance),
                        mensualite_totale: round_money(o.total_monthly),
                        frais_dossier: round_money(o.upfront_fees),
                        cout_total: round_money(o.total_cost),
                        cout_credit: round_money(o.credit_cost),
                        taux: o.annual_rate_pct,
                        duree: o.term_months,
                        taeg: o.taeg_pct.map(round_pct),
                        economie: round_money(o.total_cost) - best_total,
                    })
                    .collect(),
            }
        }))
    }
}

// ---------------------------------------------------------------------------
// Tagged entry point
// ---------------------------------------------------------------------------

/// Any calculator request, tagged by `"calculateur"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "calculateur", rename_all = "kebab-case")]
pub enum CalculationRequest {
    Capacity(CapacityRequest),
    Schedule(ScheduleRequest),
    VariableRate(VariableRateRequest),
    Optimization(OptimizationRequest),
    Investment(InvestmentRequest),
    StressTest(StressTestRequest),
    MultiOffer(MultiOfferRequest),
}

impl CalculationRequest {
    pub fn name(&self) -> &'static str {
        match self {
            CalculationRequest::Capacity(_) => "capacity",
            CalculationRequest::Schedule(_) => "schedule",
            CalculationRequest::VariableRate(_) => "variable-rate",
            CalculationRequest::Optimization(_) => "optimization",
            CalculationRequest::Investment(_) => "investment",
            CalculationRequest::StressTest(_) => "stress-test",
            CalculationRequest::MultiOffer(_) => "multi-offer",
        }
    }
}

/// Run a tagged request and return its envelope as JSON.
pub fn dispatch(
    request: &CalculationRequest,
    policy: &SimulationPolicy,
) -> SimulationResult<serde_json::Value> {
    let _span = tracing::debug_span!("dispatch", calculator = request.name()).entered();
    let value = match request {
        CalculationRequest::Capacity(r) => serde_json::to_value(r.run(policy)?)?,
        CalculationRequest::Schedule(r) => serde_json::to_value(r.run(policy)?)?,
        CalculationRequest::VariableRate(r) => serde_json::to_value(r.run(policy)?)?,
        CalculationRequest::Optimization(r) => serde_json::to_value(r.run(policy)?)?,
        CalculationRequest::Investment(r) => serde_json::to_value(r.run(policy)?)?,
        CalculationRequest::StressTest(r) => serde_json::to_value(r.run(policy)?)?,
        CalculationRequest::MultiOffer(r) => serde_json::to_value(r.run(policy)?)?,
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    #[test]
    fn test_capacity_wire_names_and_rounding() {
        let req: CapacityRequest = serde_json::from_str(
            r#"{"salaire": 4000, "charges": 500, "taux": 3.5, "duree": 240, "taux_effort_max": 0.33}"#,
        )
        .unwrap();
        let out = req.run(&SimulationPolicy::default()).unwrap().result;
        assert_eq!(out.mensualite_max, dec!(1320));
        assert_eq!(out.montant, out.montant.round_dp(2));
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["mensualite_max"], serde_json::json!(1320.0));
        assert_eq!(json["taux_effort_utilise"], serde_json::json!(0.33));
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_capacity_uses_policy_ratio_when_absent() {
        let req = CapacityRequest {
            salaire: dec!(3000),
            autres_revenus: Decimal::ZERO,
            charges: Decimal::ZERO,
            taux: dec!(3.5),
            duree: 240,
            taux_effort_max: None,
        };
        let policy = SimulationPolicy {
            default_max_effort_ratio: dec!(0.35),
            ..SimulationPolicy::default()
        };
        let out = req.run(&policy).unwrap().result;
        assert_eq!(out.mensualite_max, dec!(1050));
    }

    #[test]
    fn test_term_over_policy_maximum_rejected() {
        let req = CapacityRequest {
            salaire: dec!(3000),
            autres_revenus: Decimal::ZERO,
            charges: Decimal::ZERO,
            taux: dec!(3.5),
            duree: 700,
            taux_effort_max: None,
        };
        let err = req.run(&SimulationPolicy::default()).unwrap_err();
        assert_eq!(err.kind(), "invalid_input");
    }

    #[test]
    fn test_variable_rate_sized_on_capacity() {
        let req = VariableRateRequest {
            salaire: dec!(4000),
            charges: dec!(500),
            taux_initial: dec!(3.5),
            duree: 240,
            periode_fixe: 60,
            variation_annuelle: dec!(0.25),
            cap_taux: Some(dec!(1)),
            taux_effort_max: None,
        };
        let out = req.run(&SimulationPolicy::default()).unwrap().result;
        assert!(out.montant_initial > dec!(227500) && out.montant_initial < dec!(227700));
        assert_eq!(out.mensualite_initiale, dec!(1320));
        assert_eq!(out.projections.len(), 20);
        assert_eq!(out.projections[0].taux, dec!(3.5));
        assert_eq!(out.projections[19].taux, dec!(4.5));
        assert_eq!(out.projections[19].capital_restant, Decimal::ZERO);
    }

    #[test]
    fn test_variable_rate_without_income_is_infeasible() {
        let req = VariableRateRequest {
            salaire: Decimal::ZERO,
            charges: Decimal::ZERO,
            taux_initial: dec!(3.5),
            duree: 240,
            periode_fixe: 60,
            variation_annuelle: dec!(0.25),
            cap_taux: None,
            taux_effort_max: None,
        };
        let err = req.run(&SimulationPolicy::default()).unwrap_err();
        assert!(matches!(err, SimulationError::Infeasible(_)));
    }

    #[test]
    fn test_stress_test_wire_shape() {
        let req = StressTestRequest {
            salaire: dec!(4000),
            charges: dec!(500),
            mensualite_actuelle: dec!(1200),
        };
        let out = req.run(&SimulationPolicy::default()).unwrap().result;
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["scenarios"][1]["scenario"], "Perte d'emploi");
        assert_eq!(json["marge_securite"], serde_json::json!(14.5));
        assert_eq!(json["risque_global"], "Élevé");
    }

    #[test]
    fn test_multi_offer_economie() {
        let req: MultiOfferRequest = serde_json::from_value(serde_json::json!({
            "prix_bien": 300000,
            "apport": 30000,
            "offers": [
                {"bank_name": "LCL", "taux": 3.5, "duree": 240, "frais_dossier": 1000, "taux_assurance": 0.35},
                {"bank_name": "Société Générale", "taux": 3.2, "duree": 240, "frais_dossier": 1000, "taux_assurance": 0.35}
            ]
        }))
        .unwrap();
        let out = req.run(&SimulationPolicy::default()).unwrap().result;
        assert_eq!(out.montant_emprunte, dec!(270000));
        assert_eq!(out.comparisons[0].bank_name, "Société Générale");
        assert_eq!(out.comparisons[0].economie, Decimal::ZERO);
        assert_eq!(out.comparisons[0].cout_total, dec!(385801.51));
        assert_eq!(out.comparisons[1].cout_total, dec!(395713.90));
        assert_eq!(out.comparisons[1].economie, dec!(9912.39));
        assert_eq!(
            out.comparisons[1].economie,
            out.comparisons[1].cout_total - out.comparisons[0].cout_total
        );
    }

    #[test]
    fn test_tagged_dispatch() {
        let req: CalculationRequest = serde_json::from_value(serde_json::json!({
            "calculateur": "investment",
            "prix_bien": 200000,
            "apport": 40000,
            "taux": 3.8,
            "duree": 240,
            "loyer_mensuel": 800
        }))
        .unwrap();
        assert_eq!(req.name(), "investment");
        let value = dispatch(&req, &SimulationPolicy::default()).unwrap();
        assert_eq!(value["result"]["mensualite"], serde_json::json!(952.79));
        assert_eq!(value["result"]["cash_flow_mensuel"], serde_json::json!(-152.79));
        assert_eq!(value["result"]["projections"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn test_capacity_rejects_out_of_range_salary() {
        let req: CapacityRequest = serde_json::from_str(
            r#"{"salaire": 1e27, "taux": 0, "duree": 600, "taux_effort_max": 0.33}"#,
        )
        .unwrap();
        match req.run(&SimulationPolicy::default()).unwrap_err() {
            SimulationError::InvalidInput { field, .. } => assert_eq!(field, "net_monthly_income"),
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_optimization_rejects_out_of_range_price() {
        let req: OptimizationRequest = serde_json::from_str(
            r#"{"salaire": 1e27, "prix_bien": 7e28, "taux": 5, "duree_min": 120, "duree_max": 600}"#,
        )
        .unwrap();
        match req.run(&SimulationPolicy::default()).unwrap_err() {
            SimulationError::InvalidInput { field, .. } => assert_eq!(field, "property_price"),
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
    }
}
