use serde_json::Value;
use std::io;

use super::{cell, result_of, split_rows};

type StdoutWriter<'a> = csv::Writer<io::StdoutLock<'a>>;

/// Write output as CSV to stdout.
///
/// A result holding a row collection (an amortization schedule, yearly
/// projections...) is written as that table; the first collection wins.
/// Otherwise the result is written as two columns, field and value.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    let written = match result_of(value) {
        Value::Object(map) => {
            let (scalars, rows) = split_rows(map);
            match rows.first() {
                Some((_, items)) => write_rows(&mut wtr, items),
                None => write_fields(&mut wtr, &scalars),
            }
        }
        Value::Array(items) => write_rows(&mut wtr, items),
        other => wtr.write_record([cell(other)]),
    };

    if let Err(e) = written.and_then(|_| wtr.flush().map_err(csv::Error::from)) {
        eprintln!("CSV output error: {}", e);
    }
}

fn write_fields(wtr: &mut StdoutWriter<'_>, fields: &[(&str, &Value)]) -> csv::Result<()> {
    wtr.write_record(["field", "value"])?;
    for (key, val) in fields {
        wtr.write_record([key.to_string(), cell(val)])?;
    }
    Ok(())
}

fn write_rows(wtr: &mut StdoutWriter<'_>, items: &[Value]) -> csv::Result<()> {
    let Some(Value::Object(first)) = items.first() else {
        for item in items {
            wtr.write_record([cell(item)])?;
        }
        return Ok(());
    };

    let headers: Vec<&str> = first.keys().map(String::as_str).collect();
    wtr.write_record(&headers)?;
    for item in items {
        if let Value::Object(map) = item {
            wtr.write_record(headers.iter().map(|h| map.get(*h).map(cell).unwrap_or_default()))?;
        }
    }
    Ok(())
}
