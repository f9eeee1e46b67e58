use serde_json::Value;

use super::{format_value, series_points};

/// Print just the key answer value from the output.
///
/// Chart results print the final cumulative total. Otherwise look for
/// well-known fields in priority order, then fall back to the first field.
pub fn print_minimal(value: &Value) {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    if let Some(points) = series_points(result_obj) {
        let last = points
            .last()
            .and_then(|p| p.get("cumulative"))
            .and_then(Value::as_u64)
            .unwrap_or(0);
        println!("{last}");
        return;
    }

    let priority_keys = [
        "submittable",
        "start_date",
        "months",
        "date",
        "active",
        "grant_schedule_url",
    ];

    if let Value::Object(map) = result_obj {
        for key in &priority_keys {
            if let Some(val) = map.get(*key) {
                if !val.is_null() {
                    println!("{}", format_value(val));
                    return;
                }
            }
        }

        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, format_value(val));
            return;
        }
    }

    println!("{}", format_value(result_obj));
}
