use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::{format_value, series_points};

/// Format output as tables using the tabled crate.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(result) = map.get("result") {
                print_result_table(result, map);
            } else {
                print_fields(map);
            }
        }
        Value::Array(arr) => print_rows(arr),
        _ => println!("{}", value),
    }
}

fn print_result_table(result: &Value, envelope: &Map<String, Value>) {
    match result {
        Value::Object(res_map) => {
            print_fields(res_map);
            if let Some(points) = series_points(result) {
                println!();
                print_rows(points);
            }
            if let Some(Value::Array(employees)) = res_map.get("employees") {
                println!();
                print_rows(employees);
            }
        }
        other => println!("{}", format_value(other)),
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings {
                if let Value::String(s) = w {
                    println!("  - {}", s);
                }
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

/// Scalar fields as a Field/Value table. Row-shaped arrays are printed
/// separately, so they are skipped here.
fn print_fields(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in map {
        if is_row_array(val) || key == "series" {
            continue;
        }
        builder.push_record([key.as_str(), &format_value(val)]);
    }
    println!("{}", Table::from(builder));
}

fn is_row_array(value: &Value) -> bool {
    matches!(value, Value::Array(items) if items.first().is_some_and(Value::is_object))
}

fn print_rows(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    let rows: Vec<Map<String, Value>> = arr.iter().map(flatten_row).collect();
    let mut headers: Vec<String> = Vec::new();
    for row in &rows {
        for key in row.keys() {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
    }

    let mut builder = Builder::default();
    builder.push_record(&headers);
    for row in &rows {
        let record: Vec<String> = headers
            .iter()
            .map(|h| row.get(h).map(format_value).unwrap_or_default())
            .collect();
        builder.push_record(record);
    }
    println!("{}", Table::from(builder));
}

/// One level of nesting becomes `parent.child` columns.
pub(crate) fn flatten_row(item: &Value) -> Map<String, Value> {
    let mut out = Map::new();
    match item {
        Value::Object(map) => {
            for (key, val) in map {
                match val {
                    Value::Object(inner) => {
                        for (ik, iv) in inner {
                            out.insert(format!("{key}.{ik}"), iv.clone());
                        }
                    }
                    _ => {
                        out.insert(key.clone(), val.clone());
                    }
                }
            }
        }
        other => {
            out.insert("value".into(), other.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flatten_row_nests_one_level() {
        let row = flatten_row(&json!({
            "key": "2024",
            "cumulative": 10,
            "by_bucket": {"iso": 10, "rsu": 0}
        }));
        assert_eq!(row.get("by_bucket.iso"), Some(&json!(10)));
        assert_eq!(row.get("key"), Some(&json!("2024")));
        assert!(row.get("by_bucket").is_none());
    }

    #[test]
    fn test_series_points_found_under_series() {
        let result = json!({"series": {"points": [{"key": "2024-01"}]}, "employees": []});
        assert_eq!(series_points(&result).map(Vec::len), Some(1));
        assert!(series_points(&json!({"total": 3})).is_none());
    }
}
