//! Arithmetic operations and operand validation
//!
//! Operands arrive as loosely typed JSON. JSON numbers and numeric strings are
//! accepted; `null` or an absent field counts as missing; anything else is
//! rejected as not a number.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

use super::history::HistoryLedger;
use crate::types::{ApiError, Result};

/// Supported operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
    Sqrt,
}

impl Operation {
    /// Parse the route segment (`/api/calculator/<op>`)
    pub fn from_path(segment: &str) -> Option<Self> {
        match segment {
            "add" => Some(Operation::Add),
            "subtract" => Some(Operation::Subtract),
            "multiply" => Some(Operation::Multiply),
            "divide" => Some(Operation::Divide),
            "power" => Some(Operation::Power),
            "sqrt" => Some(Operation::Sqrt),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operation::Add => "add",
            Operation::Subtract => "subtract",
            Operation::Multiply => "multiply",
            Operation::Divide => "divide",
            Operation::Power => "power",
            Operation::Sqrt => "sqrt",
        }
    }

    /// Names of the operands this operation reads from the body
    pub fn operands(&self) -> &'static [&'static str] {
        match self {
            Operation::Add | Operation::Subtract | Operation::Multiply | Operation::Divide => {
                &["a", "b"]
            }
            Operation::Power => &["base", "exponent"],
            Operation::Sqrt => &["number"],
        }
    }

    fn missing_message(&self) -> &'static str {
        match self {
            Operation::Power => r#"Both "base" and "exponent" parameters are required"#,
            Operation::Sqrt => r#"The "number" parameter is required"#,
            _ => r#"Both "a" and "b" parameters are required"#,
        }
    }

    fn invalid_message(&self) -> &'static str {
        match self {
            Operation::Sqrt => "Parameter must be a valid number",
            _ => "Parameters must be valid numbers",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A recorded calculation
#[derive(Debug, Clone, Serialize)]
pub struct Calculation {
    pub id: u64,
    pub operation: Operation,
    #[serde(serialize_with = "serialize_operands")]
    pub inputs: BTreeMap<String, f64>,
    #[serde(serialize_with = "serialize_number")]
    pub result: f64,
    pub timestamp: DateTime<Utc>,
}

/// Validated operands and the computed result, before recording
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub inputs: BTreeMap<String, f64>,
    pub result: f64,
}

enum Operand {
    Missing,
    Invalid,
    Number(f64),
}

/// Strict numeric coercion of one operand.
///
/// Absent and `null` operands count as missing. Only JSON numbers and
/// non-blank numeric strings are accepted; booleans, blank strings, arrays,
/// objects and anything non-finite (`"Infinity"`, `"NaN"`) are invalid rather
/// than silently becoming `0`, `1` or infinity.
fn coerce(value: Option<&Value>) -> Operand {
    let number = match value {
        None | Some(Value::Null) => return Operand::Missing,
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                trimmed.parse::<f64>().ok()
            }
        }
        Some(_) => None,
    };

    match number {
        Some(n) if n.is_finite() => Operand::Number(n),
        _ => Operand::Invalid,
    }
}

/// Validate operands from a JSON body and compute the result
pub fn evaluate(operation: Operation, body: &Map<String, Value>) -> Result<Evaluation> {
    let names = operation.operands();
    let coerced: Vec<Operand> = names.iter().map(|name| coerce(body.get(*name))).collect();

    if coerced.iter().any(|o| matches!(o, Operand::Missing)) {
        return Err(ApiError::BadRequest(operation.missing_message().into()));
    }

    let mut values = Vec::with_capacity(names.len());
    for operand in coerced {
        match operand {
            Operand::Number(n) => values.push(n),
            _ => return Err(ApiError::BadRequest(operation.invalid_message().into())),
        }
    }

    let result = match (operation, values.as_slice()) {
        (Operation::Add, &[a, b]) => a + b,
        (Operation::Subtract, &[a, b]) => a - b,
        (Operation::Multiply, &[a, b]) => a * b,
        (Operation::Divide, &[_, b]) if b == 0.0 => {
            return Err(ApiError::BadRequest("Cannot divide by zero".into()));
        }
        (Operation::Divide, &[a, b]) => a / b,
        // Invalid combinations (negative base, fractional exponent) yield NaN
        // and are passed through rather than rejected.
        (Operation::Power, &[base, exponent]) => base.powf(exponent),
        (Operation::Sqrt, &[n]) if n < 0.0 => {
            return Err(ApiError::BadRequest(
                "Cannot calculate square root of a negative number".into(),
            ));
        }
        (Operation::Sqrt, &[n]) => n.sqrt(),
        _ => {
            return Err(ApiError::Internal(format!(
                "Operand count mismatch for {}",
                operation
            )))
        }
    };

    let inputs = names
        .iter()
        .map(|name| name.to_string())
        .zip(values)
        .collect();

    Ok(Evaluation { inputs, result })
}

/// Evaluate and record the calculation in the ledger
pub async fn calculate(
    ledger: &HistoryLedger,
    operation: Operation,
    body: &Map<String, Value>,
) -> Result<Calculation> {
    let Evaluation { inputs, result } = evaluate(operation, body)?;
    Ok(ledger.record(operation, inputs, result).await)
}

/// Numbers serialise the way a JSON client expects: integral values without a
/// fractional part, non-finite values as `null`.
fn serialize_number<S: Serializer>(value: &f64, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

    if !value.is_finite() {
        serializer.serialize_none()
    } else if value.fract() == 0.0 && value.abs() <= MAX_SAFE_INTEGER {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

fn serialize_operands<S: Serializer>(
    inputs: &BTreeMap<String, f64>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    use serde::ser::SerializeMap;

    struct Num(f64);
    impl Serialize for Num {
        fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
            serialize_number(&self.0, serializer)
        }
    }

    let mut map = serializer.serialize_map(Some(inputs.len()))?;
    for (name, value) in inputs {
        map.serialize_entry(name, &Num(*value))?;
    }
    map.end()
}
