use colored::Colorize;
use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::{format_scalar, result_of};

/// Columns shown for each portfolio row, when present.
const HOLDING_COLUMNS: [&str; 6] = ["name", "type", "category", "score", "adjusted_score", "allocation"];

/// Format output as tables using the tabled crate.
pub fn print_table(value: &Value) {
    let result = result_of(value);
    match result {
        Value::Object(map) => print_result(map),
        Value::Array(arr) => print_rows(arr),
        _ => println!("{}", result),
    }

    if let Some(Value::Array(warnings)) = value.get("warnings") {
        if !warnings.is_empty() {
            println!("\n{}", "Warnings:".yellow().bold());
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {}", w);
            }
        }
    }
    if let Some(Value::String(meth)) = value.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn print_result(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    let mut scalars = 0;
    let mut sections: Vec<(&str, &Value)> = Vec::new();
    for (key, val) in map {
        match val {
            Value::Array(arr) if arr.iter().any(Value::is_object) => sections.push((key.as_str(), val)),
            Value::Object(_) => sections.push((key.as_str(), val)),
            _ => {
                builder.push_record([key.as_str(), &format_value(val)]);
                scalars += 1;
            }
        }
    }
    if scalars > 0 {
        println!("{}", Table::from(builder));
    }

    for (key, val) in sections {
        println!("\n{}", key.bold());
        match val {
            Value::Array(arr) => print_rows(arr),
            Value::Object(obj) => print_nested(obj),
            _ => {}
        }
    }
}

/// A map of objects (e.g. per-scenario results) becomes one row per key.
fn print_nested(obj: &Map<String, Value>) {
    if obj.values().all(Value::is_object) && !obj.is_empty() {
        let mut headers: Vec<String> = vec!["key".to_string()];
        if let Some(Value::Object(first)) = obj.values().next() {
            headers.extend(
                first
                    .iter()
                    .filter(|(_, v)| !v.is_array())
                    .map(|(k, _)| k.clone()),
            );
        }
        let mut builder = Builder::default();
        builder.push_record(&headers);
        for (key, val) in obj {
            let mut row = vec![key.clone()];
            row.extend(headers.iter().skip(1).map(|h| {
                val.get(h.as_str()).map(format_value).unwrap_or_default()
            }));
            builder.push_record(row);
        }
        println!("{}", Table::from(builder));
    } else {
        let mut builder = Builder::default();
        builder.push_record(["Field", "Value"]);
        for (key, val) in obj {
            builder.push_record([key.as_str(), &format_value(val)]);
        }
        println!("{}", Table::from(builder));
    }
}

fn print_rows(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    let Some(Value::Object(first)) = arr.first() else {
        for item in arr {
            println!("{}", format_value(item));
        }
        return;
    };

    let is_holding = first.contains_key("allocation");
    let headers: Vec<String> = if is_holding {
        HOLDING_COLUMNS
            .iter()
            .filter(|c| first.contains_key(**c))
            .map(|c| c.to_string())
            .collect()
    } else {
        first.keys().cloned().collect()
    };

    let mut builder = Builder::default();
    builder.push_record(&headers);
    for item in arr {
        if let Value::Object(map) = item {
            let row: Vec<String> = headers
                .iter()
                .map(|h| map.get(h.as_str()).map(format_value).unwrap_or_default())
                .collect();
            builder.push_record(row);
        }
    }
    println!("{}", Table::from(builder));
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() => format!("{:.4}", f),
            _ => n.to_string(),
        },
        Value::Array(arr) => arr.iter().map(format_value).collect::<Vec<_>>().join(", "),
        Value::Null => "null".to_string(),
        _ => format_scalar(value),
    }
}
