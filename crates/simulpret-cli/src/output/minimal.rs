use serde_json::Value;

use super::{cell, result_of};

/// Headline figure of each calculator, in lookup order.
const HEADLINE_KEYS: [&str; 9] = [
    "montant",
    "mensualite",
    "montant_initial",
    "optimal",
    "cash_flow_mensuel",
    "risque_global",
    "comparisons",
    "rate_pct",
    "results",
];

/// Print just the headline value of a result, falling back to its first
/// field.
pub fn print_minimal(value: &Value) {
    let result = result_of(value);

    if let Value::Object(map) = result {
        if let Some(val) = HEADLINE_KEYS
            .iter()
            .filter_map(|key| map.get(*key))
            .find(|val| !val.is_null())
        {
            println!("{}", headline(val));
            return;
        }
        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, headline(val));
            return;
        }
    }

    println!("{}", headline(result));
}

/// Collections collapse to their first entry (the best offer, the optimum).
fn headline(value: &Value) -> String {
    match value {
        Value::Array(items) => items.first().map(headline).unwrap_or_default(),
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
        other => cell(other),
    }
}
