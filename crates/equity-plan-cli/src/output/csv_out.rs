use serde_json::Value;
use std::io;

use super::series_points;
use super::table::flatten_row;

/// Write output as CSV to stdout.
///
/// Chart results become one row per point; anything else is field/value.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    match value {
        Value::Object(map) => {
            let body = map.get("result").unwrap_or(value);
            if let Some(points) = series_points(body) {
                write_rows(&mut wtr, points);
            } else if let Value::Object(fields) = body {
                let _ = wtr.write_record(["field", "value"]);
                for (key, val) in fields {
                    let _ = wtr.write_record([key.as_str(), &format_csv_value(val)]);
                }
            }
        }
        Value::Array(arr) => write_rows(&mut wtr, arr),
        _ => {
            let _ = wtr.write_record([&format_csv_value(value)]);
        }
    }

    let _ = wtr.flush();
}

fn write_rows(wtr: &mut csv::Writer<io::StdoutLock<'_>>, arr: &[Value]) {
    if arr.is_empty() {
        return;
    }

    let rows: Vec<_> = arr.iter().map(flatten_row).collect();
    let mut headers: Vec<String> = Vec::new();
    for row in &rows {
        for key in row.keys() {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
    }
    let _ = wtr.write_record(&headers);

    for row in &rows {
        let record: Vec<String> = headers
            .iter()
            .map(|h| row.get(h).map(format_csv_value).unwrap_or_default())
            .collect();
        let _ = wtr.write_record(&record);
    }
}

fn format_csv_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
