//! Best-effort training diagnostics from a `fit` result.

use serde_json::Value;

const LOSS_KEY: &str = "loss";
const ACCURACY_KEY: &str = "accuracy";

/// Loss and accuracy reported by a model for one batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Diagnostics {
    pub loss: f64,
    pub accuracy: f64,
}

impl Diagnostics {
    /// Normalize batch totals to per-record values.
    pub fn per_record(self, batch_size: usize) -> Self {
        let n = batch_size.max(1) as f64;
        Self {
            loss: self.loss / n,
            accuracy: self.accuracy / n,
        }
    }
}

/// Pull `loss` and `accuracy` out of a fit result.
///
/// Returns `None` when the result is not a map or either field is missing or
/// not numeric. Absence is never an error.
pub fn extract_diagnostics(result: &Value) -> Option<Diagnostics> {
    let map = result.as_object()?;
    let loss = map.get(LOSS_KEY).and_then(to_float)?;
    let accuracy = map.get(ACCURACY_KEY).and_then(to_float)?;
    Some(Diagnostics { loss, accuracy })
}

fn to_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
