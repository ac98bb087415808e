//! Seam for the structured-record expression evaluator behind `$EVAL`

use super::functions::format_real;
use std::collections::BTreeMap;
use std::fmt;

/// Result of evaluating a record expression
#[derive(Debug, Clone, PartialEq)]
pub enum RecordValue {
    Undefined,
    Error,
    Bool(bool),
    Integer(i64),
    Real(f64),
    String(String),
    List(Vec<RecordValue>),
    /// Attributes in their original order
    Record(Vec<(String, RecordValue)>),
}

/// Canonical text form: strings quoted, `{ a, b }` lists,
/// `[ name = value; ... ]` records
impl fmt::Display for RecordValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordValue::Undefined => f.write_str("undefined"),
            RecordValue::Error => f.write_str("error"),
            RecordValue::Bool(b) => write!(f, "{}", b),
            RecordValue::Integer(n) => write!(f, "{}", n),
            RecordValue::Real(r) => f.write_str(&format_real(*r)),
            RecordValue::String(s) => {
                write!(f, "\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
            }
            RecordValue::List(items) => {
                let items: Vec<String> = items.iter().map(ToString::to_string).collect();
                write!(f, "{{ {} }}", items.join(", "))
            }
            RecordValue::Record(attrs) => {
                let attrs: Vec<String> = attrs
                    .iter()
                    .map(|(name, value)| format!("{} = {}", name, value))
                    .collect();
                write!(f, "[ {} ]", attrs.join("; "))
            }
        }
    }
}

/// Evaluates `$EVAL` expressions.
///
/// `context` holds every configuration binding (raw, unexpanded) except the
/// numbered template parameters.
pub trait RecordEvaluator {
    fn evaluate(&self, expr: &str, context: &BTreeMap<String, String>)
        -> Result<RecordValue, String>;
}
