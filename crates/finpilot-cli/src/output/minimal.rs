use serde_json::Value;

use super::{format_scalar, result_of};

/// Print just the headline value of the output.
///
/// Looks for well-known result fields in priority order, then falls back to
/// the first field of the result object.
pub fn print_minimal(value: &Value) {
    let result = result_of(value);

    let priority_keys = [
        "suggested_weekly",
        "rebalance_required",
        "sharpe_ratio",
        "expected_return",
        "equity",
        "level",
    ];

    if let Value::Object(map) = result {
        if let Some(Value::Object(metrics)) = map.get("portfolio_metrics") {
            if let Some(sharpe) = metrics.get("sharpe_ratio") {
                println!("{}", format_scalar(sharpe));
                return;
            }
        }
        for key in &priority_keys {
            if let Some(val) = map.get(*key) {
                if !val.is_null() {
                    println!("{}", format_scalar(val));
                    return;
                }
            }
        }
        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, format_scalar(val));
            return;
        }
    }

    println!("{}", format_scalar(result));
}
