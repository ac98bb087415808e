//! Evaluation of `if`/`elif` conditions
//!
//! Conditions are evaluated after macro expansion of the whole line.
//! Precedence, lowest first: `&&` / `||` (split at the first textual
//! occurrence, left side first, short-circuit), unary `!`, then atoms:
//! `defined`, `version`, a bare variable name, `==` / `!=`, numeric
//! comparisons, and finally the truthiness of the text itself.

use super::expand::is_ident_start;
use super::Config;
use std::cmp::Ordering;

/// Assumed `CONDOR_VERSION` when none is configured
pub const DEFAULT_CONDOR_VERSION: &str = "9.0.0";

const VERSION_OPS: [&str; 6] = [">=", "<=", "==", "!=", ">", "<"];

/// `true/yes/1/on` and any other non-empty text are true;
/// `false/no/0/off` and empty text are false. Case-insensitive.
pub fn is_truthy(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "false" | "no" | "0" | "off" | ""
    )
}

/// Version number part of `$CondorVersion: 9.0.0 2021-05-01 $` style text
fn version_number(version: &str) -> &str {
    let version = match version.find(':') {
        Some(idx) => &version[idx + 1..],
        None => version,
    };
    version.split_whitespace().next().unwrap_or("")
}

/// Compare dotted versions component-wise; missing components count as 0
pub fn compare_versions(left: &str, right: &str) -> Ordering {
    let parse = |v: &str| -> Vec<i64> {
        version_number(v)
            .split('.')
            .map(|part| part.trim().parse().unwrap_or(0))
            .collect()
    };
    let (left, right) = (parse(left), parse(right));
    let len = left.len().max(right.len());
    (0..len)
        .map(|i| {
            let l = left.get(i).copied().unwrap_or(0);
            let r = right.get(i).copied().unwrap_or(0);
            l.cmp(&r)
        })
        .find(|ord| ord.is_ne())
        .unwrap_or(Ordering::Equal)
}

fn is_variable_name(text: &str) -> bool {
    text.starts_with(is_ident_start)
        && text
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

impl Config {
    /// Evaluate an already expanded condition
    pub fn evaluate_condition(&self, condition: &str) -> Result<bool, String> {
        let condition = condition.trim();

        if let Some((left, right)) = condition.split_once("&&") {
            return Ok(self.evaluate_condition(left)? && self.evaluate_condition(right)?);
        }
        if let Some((left, right)) = condition.split_once("||") {
            return Ok(self.evaluate_condition(left)? || self.evaluate_condition(right)?);
        }

        if let Some(rest) = condition.strip_prefix('!') {
            return Ok(!self.evaluate_condition(rest)?);
        }

        if let Some(name) = condition
            .strip_prefix("defined(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            return Ok(self.contains(name.trim()));
        }
        if let Some(name) = condition.strip_prefix("defined ") {
            return Ok(self.contains(name.trim()));
        }

        if let Some(spec) = condition.strip_prefix("version ") {
            return self.evaluate_version(spec);
        }

        if is_variable_name(condition) {
            if let Some(raw) = self.get_raw(condition) {
                return Ok(is_truthy(raw));
            }
        }

        if let Some((left, right)) = condition.split_once("==") {
            return Ok(self.expand_operand(left)? == self.expand_operand(right)?);
        }
        if let Some((left, right)) = condition.split_once("!=") {
            return Ok(self.expand_operand(left)? != self.expand_operand(right)?);
        }

        for op in [">=", "<=", ">", "<"] {
            if let Some((left, right)) = condition.split_once(op) {
                let left = self.expand_operand(left)?;
                let right = self.expand_operand(right)?;
                let ord = match (left.parse::<f64>(), right.parse::<f64>()) {
                    (Ok(l), Ok(r)) => l.partial_cmp(&r),
                    _ => Some(left.cmp(&right)),
                };
                return Ok(match (op, ord) {
                    (_, None) => false,
                    (">=", Some(o)) => o.is_ge(),
                    ("<=", Some(o)) => o.is_le(),
                    (">", Some(o)) => o.is_gt(),
                    (_, Some(o)) => o.is_lt(),
                });
            }
        }

        let expanded = self.expand(condition).map_err(|e| e.to_string())?;
        Ok(is_truthy(&expanded))
    }

    fn expand_operand(&self, operand: &str) -> Result<String, String> {
        self.expand(operand.trim()).map_err(|e| e.to_string())
    }

    /// `OP VERSION` against `CONDOR_VERSION`
    fn evaluate_version(&self, spec: &str) -> Result<bool, String> {
        let spec = spec.trim();
        let (op, wanted) = VERSION_OPS
            .iter()
            .find_map(|op| spec.strip_prefix(op).map(|rest| (*op, rest.trim())))
            .ok_or_else(|| format!("invalid version condition: {}", spec))?;
        let wanted = wanted.trim_matches('"');
        if version_number(wanted).is_empty() {
            return Err(format!("missing version in condition: {}", spec));
        }

        let current = self
            .get_raw("CONDOR_VERSION")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(DEFAULT_CONDOR_VERSION);
        let ord = compare_versions(current, wanted);
        Ok(match op {
            ">=" => ord.is_ge(),
            "<=" => ord.is_le(),
            "==" => ord.is_eq(),
            "!=" => ord.is_ne(),
            ">" => ord.is_gt(),
            _ => ord.is_lt(),
        })
    }
}
