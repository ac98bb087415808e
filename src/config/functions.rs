//! Function macros: `$ENV(...)`, `$INT(...)`, `$SUBSTR(...)`, ...
//!
//! Arguments arrive already macro-expanded.

use super::expand::ExpandError;
use super::record::RecordValue;
use super::Config;
use rand::Rng;
use std::collections::BTreeMap;
use std::path::MAIN_SEPARATOR;

/// Split an argument list on commas that are not inside parentheses.
/// Each piece is trimmed; an empty list yields no pieces.
pub(crate) fn split_args(args: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;
    for c in args.chars() {
        match c {
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth -= 1;
                current.push(c);
            }
            ',' if depth == 0 => {
                parts.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() || !parts.is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}

/// Remove one layer of surrounding double quotes
fn unquote(text: &str) -> &str {
    text.strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(text)
}

/// Format a float the way `%g` does with shortest precision: `3` not
/// `3.0`, exponent form below 1e-4 and from 1e6 up
pub(crate) fn format_real(value: f64) -> String {
    let magnitude = value.abs();
    if value != 0.0 && value.is_finite() && !(1e-4..1e6).contains(&magnitude) {
        let formatted = format!("{:e}", value);
        match formatted.split_once('e') {
            Some((mantissa, exp)) => {
                let (sign, digits) = match exp.strip_prefix('-') {
                    Some(digits) => ('-', digits),
                    None => ('+', exp),
                };
                format!("{}e{}{:0>2}", mantissa, sign, digits)
            }
            None => formatted,
        }
    } else {
        format!("{}", value)
    }
}

fn parse_int(function: &str, what: &str, text: &str) -> Result<i64, ExpandError> {
    text.trim()
        .parse()
        .map_err(|_| ExpandError::function(function, format!("invalid {} {:?}", what, text)))
}

impl Config {
    /// Dispatch a function macro by (case-insensitive) name
    pub(crate) fn call_function(&self, name: &str, args: &str) -> Result<String, ExpandError> {
        let upper = name.to_ascii_uppercase();
        match upper.as_str() {
            "ENV" => Ok(std::env::var(args.trim()).unwrap_or_default()),
            "INT" => fn_int(args),
            "STRING" => Ok(args.to_string()),
            "REAL" => fn_real(args),
            "SUBSTR" => fn_substr(args),
            "RANDOM_INTEGER" => fn_random_integer(args),
            "RANDOM_CHOICE" => fn_random_choice(args),
            "CHOICE" => fn_choice(args),
            "DIRNAME" => filename_function("DIRNAME", "p", args),
            "BASENAME" => fn_basename(args),
            "EVAL" => self.fn_eval(args),
            _ => match upper.strip_prefix('F') {
                Some(flags) if !flags.is_empty() && flags.chars().all(|c| "PDUWNXBQA".contains(c)) => {
                    filename_function(&upper, &flags.to_ascii_lowercase(), args)
                }
                _ => Err(ExpandError::UnknownFunction(name.to_string())),
            },
        }
    }

    /// Evaluate through the configured record evaluator, with the current
    /// bindings (minus template parameters) as context
    fn fn_eval(&self, args: &str) -> Result<String, ExpandError> {
        let expr = args.trim();
        if expr.is_empty() {
            return Err(ExpandError::function("EVAL", "requires an expression"));
        }
        let evaluator = self
            .record_evaluator
            .as_deref()
            .ok_or(ExpandError::NoRecordEvaluator)?;

        let context: BTreeMap<String, String> = self
            .values
            .iter()
            .filter(|(name, _)| !(name.len() == 1 && name.as_bytes()[0].is_ascii_digit()))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        let value = evaluator
            .evaluate(expr, &context)
            .map_err(|message| ExpandError::function("EVAL", message))?;
        Ok(match value {
            RecordValue::String(text) => text,
            other => other.to_string(),
        })
    }
}

fn fn_int(args: &str) -> Result<String, ExpandError> {
    let text = args.trim();
    if text.is_empty() {
        return Ok("0".to_string());
    }
    let value: f64 = text
        .parse()
        .map_err(|_| ExpandError::function("INT", format!("cannot convert {:?} to integer", text)))?;
    Ok((value.trunc() as i64).to_string())
}

fn fn_real(args: &str) -> Result<String, ExpandError> {
    let text = args.trim();
    if text.is_empty() {
        return Ok("0.0".to_string());
    }
    let value: f64 = text
        .parse()
        .map_err(|_| ExpandError::function("REAL", format!("cannot convert {:?} to real", text)))?;
    Ok(format_real(value))
}

/// `SUBSTR(s, start[, length])`; a negative length leaves that many
/// characters off the end
fn fn_substr(args: &str) -> Result<String, ExpandError> {
    let parts = split_args(args);
    if parts.len() < 2 {
        return Err(ExpandError::function("SUBSTR", "requires (string, start [, length])"));
    }
    let chars: Vec<char> = unquote(&parts[0]).chars().collect();
    let total = chars.len() as i64;
    let start = parse_int("SUBSTR", "start", &parts[1])?;
    if start < 0 || start > total {
        return Ok(String::new());
    }
    let end = match parts.get(2) {
        Some(len) => {
            let len = parse_int("SUBSTR", "length", len)?;
            if len < 0 {
                (total + len).max(start)
            } else {
                (start + len).min(total)
            }
        }
        None => total,
    };
    Ok(chars[start as usize..end as usize].iter().collect())
}

/// `RANDOM_INTEGER(min, max[, step])`: `min + k*step` for a random `k`
fn fn_random_integer(args: &str) -> Result<String, ExpandError> {
    const NAME: &str = "RANDOM_INTEGER";
    let parts = split_args(args);
    if !(2..=3).contains(&parts.len()) {
        return Err(ExpandError::function(NAME, "requires (min, max [, step])"));
    }
    let min = parse_int(NAME, "min", &parts[0])?;
    let max = parse_int(NAME, "max", &parts[1])?;
    let step = match parts.get(2) {
        Some(step) => parse_int(NAME, "step", step)?,
        None => 1,
    };
    if step <= 0 {
        return Err(ExpandError::function(NAME, "step must be positive"));
    }
    if min > max {
        return Err(ExpandError::function(NAME, "min must be <= max"));
    }
    let (min, step) = (i128::from(min), i128::from(step));
    let steps = (i128::from(max) - min) / step;
    let k = rand::thread_rng().gen_range(0..=steps);
    Ok((min + k * step).to_string())
}

fn fn_random_choice(args: &str) -> Result<String, ExpandError> {
    let parts = split_args(args);
    if parts.is_empty() {
        return Err(ExpandError::function("RANDOM_CHOICE", "requires at least one item"));
    }
    let index = rand::thread_rng().gen_range(0..parts.len());
    Ok(unquote(&parts[index]).to_string())
}

/// `CHOICE(index, item0, item1, ...)`, zero-based
fn fn_choice(args: &str) -> Result<String, ExpandError> {
    let parts = split_args(args);
    if parts.len() < 2 {
        return Err(ExpandError::function("CHOICE", "requires (index, item [, item ...])"));
    }
    let index = parse_int("CHOICE", "index", &parts[0])?;
    let items = &parts[1..];
    if index < 0 || index as usize >= items.len() {
        return Err(ExpandError::function(
            "CHOICE",
            format!("index {} out of range (0-{})", index, items.len() - 1),
        ));
    }
    Ok(unquote(&items[index as usize]).to_string())
}

/// `BASENAME(path[, suffix])`
fn fn_basename(args: &str) -> Result<String, ExpandError> {
    let parts = split_args(args);
    let path = parts.first().map(|p| unquote(p)).unwrap_or("");
    if path.is_empty() {
        return Err(ExpandError::function("BASENAME", "requires a filename"));
    }
    let base = base_name(path);
    Ok(match parts.get(1) {
        Some(suffix) => base.strip_suffix(unquote(suffix)).unwrap_or(base).to_string(),
        None => base.to_string(),
    })
}

fn is_separator(c: char) -> bool {
    c == '/' || c == MAIN_SEPARATOR
}

/// Final path component, ignoring trailing separators
fn base_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches(is_separator);
    if trimmed.is_empty() {
        return if path.is_empty() { "." } else { &path[..1] };
    }
    match trimmed.rfind(is_separator) {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    }
}

/// Everything before the final component, without a trailing separator;
/// `.` when there is no directory part
fn dir_name(path: &str) -> &str {
    match path.rfind(is_separator) {
        Some(0) => &path[..1],
        Some(idx) => path[..idx].trim_end_matches(is_separator),
        None => ".",
    }
}

/// Extension of the final component including the dot
fn extension(base: &str) -> &str {
    match base.rfind('.') {
        Some(idx) => &base[idx..],
        None => "",
    }
}

/// The `$F[fpduwnxbqa](path)` family. `f` makes the path absolute; `p`,
/// `d`, `n` and `x` select parts of it, concatenated in that order; then
/// slash style and quoting are applied.
fn filename_function(name: &str, flags: &str, args: &str) -> Result<String, ExpandError> {
    let path = unquote(args.trim());
    if path.is_empty() {
        return Err(ExpandError::function(name, "requires a filename"));
    }
    let has = |flag: char| flags.contains(flag);
    let mut full = path.to_string();
    if has('f') && !std::path::Path::new(&full).is_absolute() {
        if let Ok(cwd) = std::env::current_dir() {
            full = cwd.join(&full).to_string_lossy().into_owned();
        }
    }

    // Directory and name parts are taken from the full path and joined
    let selects_part = flags.contains(['p', 'd', 'n', 'x']);
    let mut result = if selects_part { String::new() } else { full.clone() };
    let dir = dir_name(&full);
    let has_dir = dir != "." && !dir.is_empty();

    if has('p') && has_dir {
        result.push_str(dir);
        if !result.ends_with(is_separator) {
            result.push(MAIN_SEPARATOR);
        }
    }

    if has('d') && has_dir {
        result.push_str(base_name(dir));
        if !has('b') {
            result.push(MAIN_SEPARATOR);
        }
    }

    let base = base_name(&full);
    let ext = extension(base);
    match (has('n'), has('x')) {
        (true, true) => result.push_str(base),
        (true, false) => result.push_str(&base[..base.len() - ext.len()]),
        (false, true) if has('b') => result.push_str(ext.trim_start_matches('.')),
        (false, true) => result.push_str(ext),
        (false, false) => {}
    }

    if has('u') {
        result = result.replace('\\', "/");
    }
    if has('w') {
        result = result.replace('/', "\\");
    }

    if has('q') {
        let quote = if has('a') { '\'' } else { '"' };
        result = format!("{}{}{}", quote, result, quote);
    }

    Ok(result)
}
