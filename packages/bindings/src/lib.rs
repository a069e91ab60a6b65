use napi::Result as NapiResult;
use napi_derive::napi;
use simulpret_core::SimulationPolicy;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

/// Parse an optional policy document; `None` or an empty string means defaults.
fn parse_policy(policy_json: Option<String>) -> NapiResult<SimulationPolicy> {
    match policy_json.filter(|s| !s.trim().is_empty()) {
        Some(json) => SimulationPolicy::from_json_str(&json).map_err(to_napi_error),
        None => Ok(SimulationPolicy::default()),
    }
}

// ---------------------------------------------------------------------------
// Loan
// ---------------------------------------------------------------------------

#[napi]
pub fn calculate_capacity(input_json: String) -> NapiResult<String> {
    let input: simulpret_core::capacity::CapacityInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = simulpret_core::capacity::compute_capacity(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn build_schedule(input_json: String, policy_json: Option<String>) -> NapiResult<String> {
    let input: simulpret_core::amortization::LoanTerms =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    parse_policy(policy_json)?
        .check_loan_bounds(input.annual_rate_pct, input.term_months)
        .map_err(to_napi_error)?;
    let output = simulpret_core::amortization::build_schedule(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn project_variable_rate(input_json: String) -> NapiResult<String> {
    let input: simulpret_core::variable_rate::VariableRateInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = simulpret_core::variable_rate::project_variable_rate(&input)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

#[napi]
pub fn optimize_loan(input_json: String, policy_json: Option<String>) -> NapiResult<String> {
    let input: simulpret_core::optimizer::OptimizationInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    parse_policy(policy_json)?
        .check_loan_bounds(input.annual_rate_pct, input.max_duration_months)
        .map_err(to_napi_error)?;
    let output = simulpret_core::optimizer::optimize(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn analyze_investment(input_json: String) -> NapiResult<String> {
    let input: simulpret_core::rental::RentalInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = simulpret_core::rental::analyze_investment(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Risk
// ---------------------------------------------------------------------------

#[napi]
pub fn run_stress_test(input_json: String, policy_json: Option<String>) -> NapiResult<String> {
    let input: simulpret_core::stress_test::StressTestInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let policy = parse_policy(policy_json)?;
    let output = simulpret_core::stress_test::run_stress_test(&input, &policy.stress)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn compare_offers(input_json: String) -> NapiResult<String> {
    let input: simulpret_core::offers::OfferComparisonInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = simulpret_core::offers::compare_offers(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Bank rates
// ---------------------------------------------------------------------------

/// Reference table, with an optional fetched table merged over it.
#[napi]
pub fn bank_rates(fetched_json: Option<String>) -> NapiResult<String> {
    let table = load_rate_table(fetched_json)?;
    serde_json::to_string(&table).map_err(to_napi_error)
}

#[napi]
pub fn evaluate_rate_alerts(alerts_json: String, fetched_json: Option<String>) -> NapiResult<String> {
    let alerts: Vec<simulpret_core::bank_rates::RateAlert> =
        serde_json::from_str(&alerts_json).map_err(to_napi_error)?;
    let table = load_rate_table(fetched_json)?;
    let output = simulpret_core::bank_rates::evaluate_alerts(&table, &alerts);
    serde_json::to_string(&output).map_err(to_napi_error)
}

fn load_rate_table(
    fetched_json: Option<String>,
) -> NapiResult<simulpret_core::bank_rates::BankRateTable> {
    let reference = simulpret_core::bank_rates::BankRateTable::reference(chrono::Utc::now());
    match fetched_json.filter(|s| !s.trim().is_empty()) {
        Some(json) => {
            let fetched = simulpret_core::bank_rates::BankRateTable::from_json_str(&json)
                .map_err(to_napi_error)?;
            Ok(reference.merge(fetched))
        }
        None => Ok(reference),
    }
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

/// Run a request tagged by `"calculateur"` and return its envelope.
#[napi]
pub fn calculate(request_json: String, policy_json: Option<String>) -> NapiResult<String> {
    let request: simulpret_core::api::CalculationRequest =
        serde_json::from_str(&request_json).map_err(to_napi_error)?;
    let policy = parse_policy(policy_json)?;
    let output = simulpret_core::api::dispatch(&request, &policy).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
