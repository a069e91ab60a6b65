use serde_json::Value;
use tabled::{builder::Builder, Table};

use super::{cell, result_of, split_rows};

/// Format output as tables: one Field/Value table for the scalar results,
/// then one table per row collection (schedule, scenarios, offers...).
pub fn print_table(value: &Value) {
    match result_of(value) {
        Value::Object(map) => {
            let (scalars, rows) = split_rows(map);
            if !scalars.is_empty() {
                let mut builder = Builder::default();
                builder.push_record(["Field", "Value"]);
                for (key, val) in scalars {
                    builder.push_record([key.to_string(), cell(val)]);
                }
                println!("{}", Table::from(builder));
            }
            for (key, items) in rows {
                println!("\n{}:", key);
                print_rows(items);
            }
        }
        Value::Array(items) => print_rows(items),
        other => println!("{}", cell(other)),
    }

    if let Some(envelope) = value.as_object().filter(|m| m.contains_key("result")) {
        if let Some(Value::Array(warnings)) = envelope.get("warnings") {
            if !warnings.is_empty() {
                println!("\nWarnings:");
                for w in warnings {
                    println!("  - {}", cell(w));
                }
            }
        }
        if let Some(Value::String(meth)) = envelope.get("methodology") {
            println!("\nMethodology: {}", meth);
        }
    }
}

fn print_rows(items: &[Value]) {
    let Some(Value::Object(first)) = items.first() else {
        for item in items {
            println!("{}", cell(item));
        }
        return;
    };

    let headers: Vec<String> = first.keys().cloned().collect();
    let mut builder = Builder::default();
    builder.push_record(headers.iter().cloned());
    for item in items {
        if let Value::Object(map) = item {
            builder.push_record(
                headers
                    .iter()
                    .map(|h| map.get(h.as_str()).map(cell).unwrap_or_default()),
            );
        }
    }
    println!("{}", Table::from(builder));
}
