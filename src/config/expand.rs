//! Macro expansion
//!
//! Grammar after a `$`:
//!
//! - `$(NAME)`, `$(NAME:default)`: variable reference
//! - `$($(PTR))`: indirection, the inner reference names the variable
//! - `$(1)`, `$(2?)`, `$(0#)`, ...: template parameter reference
//! - `$(FUNC(args))`, `$FUNC(args)`: function macro
//! - `$$(...)`: left alone
//!
//! Each substitution splices fully expanded text back into the value and the
//! scan resumes at the splice point. The set of names being expanded and the
//! substitution count live in a `Guard` owned by one top-level expansion,
//! never in the store.

use super::Config;
use std::collections::HashSet;
use thiserror::Error;

/// Substitutions allowed within one top-level expansion, nested ones included
pub(crate) const MAX_EXPANSION_PASSES: usize = 100;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpandError {
    #[error("macro expansion depth exceeded")]
    DepthExceeded,
    #[error("circular reference detected: {0}")]
    CircularReference(String),
    #[error("unmatched parentheses in {0:?}")]
    UnmatchedParens(String),
    #[error("unknown function: {0}")]
    UnknownFunction(String),
    #[error("{name}: {message}")]
    Function { name: String, message: String },
    #[error("$EVAL needs a record evaluator, none is configured")]
    NoRecordEvaluator,
}

impl ExpandError {
    pub(crate) fn function(name: &str, message: impl Into<String>) -> Self {
        ExpandError::Function {
            name: name.to_string(),
            message: message.into(),
        }
    }
}

/// Per-expansion state: the keys currently being expanded and the
/// substitutions spent so far at any depth
#[derive(Debug, Default)]
pub(crate) struct Guard {
    active: HashSet<String>,
    substitutions: usize,
}

impl Guard {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn contains(&self, key: &str) -> bool {
        self.active.contains(key)
    }

    fn enter(&mut self, key: &str) {
        self.active.insert(key.to_string());
    }

    fn leave(&mut self, key: &str) {
        self.active.remove(key);
    }

    /// Spend one substitution from the shared budget
    fn spend(&mut self) -> Result<(), ExpandError> {
        self.substitutions += 1;
        if self.substitutions > MAX_EXPANSION_PASSES {
            return Err(ExpandError::DepthExceeded);
        }
        Ok(())
    }
}

enum Macro {
    /// Text inside `$( ... )`
    Reference(String),
    /// `$NAME(args)`
    Call { name: String, args: String },
}

struct Found {
    start: usize,
    end: usize,
    kind: Macro,
}

pub(crate) fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Index of the `)` closing the `(` at `open`
pub(crate) fn matching_paren(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (idx, c) in text[open..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + idx);
                }
            }
            _ => {}
        }
    }
    None
}

/// Find the first macro at or after `from`
fn find_macro(text: &str, from: usize) -> Result<Option<Found>, ExpandError> {
    let mut pos = from;
    while let Some(offset) = text[pos..].find('$') {
        let start = pos + offset;
        let after = &text[start + 1..];

        if after.starts_with("$(") {
            match matching_paren(text, start + 2) {
                Some(close) => {
                    pos = close + 1;
                    continue;
                }
                None => return Ok(None),
            }
        }

        if after.starts_with('(') {
            let close = matching_paren(text, start + 1)
                .ok_or_else(|| ExpandError::UnmatchedParens(text[start..].to_string()))?;
            return Ok(Some(Found {
                start,
                end: close + 1,
                kind: Macro::Reference(text[start + 2..close].to_string()),
            }));
        }

        if after.starts_with(is_ident_start) {
            let name_len = after.find(|c: char| !is_ident_char(c)).unwrap_or(after.len());
            let open = start + 1 + name_len;
            if text[open..].starts_with('(') {
                let close = matching_paren(text, open)
                    .ok_or_else(|| ExpandError::UnmatchedParens(text[start..].to_string()))?;
                return Ok(Some(Found {
                    start,
                    end: close + 1,
                    kind: Macro::Call {
                        name: text[start + 1..open].to_string(),
                        args: text[open + 1..close].to_string(),
                    },
                }));
            }
        }

        pos = start + 1;
    }
    Ok(None)
}

/// Split `NAME:default` at the first `:` outside parentheses
fn split_default(content: &str) -> (&str, Option<&str>) {
    let mut depth = 0i32;
    for (idx, c) in content.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            ':' if depth == 0 => return (&content[..idx], Some(&content[idx + 1..])),
            _ => {}
        }
    }
    (content, None)
}

/// `$(WRAPPED)` -> `WRAPPED`
fn strip_macro_wrapper(name: &str) -> &str {
    name.strip_prefix("$(")
        .and_then(|inner| inner.strip_suffix(')'))
        .unwrap_or(name)
}

impl Config {
    /// Expanded value of `name`, or `None` if it is not bound.
    ///
    /// Expansion failures are not reported: the raw value is returned
    /// instead.
    pub fn get(&self, name: &str) -> Option<String> {
        let name = strip_macro_wrapper(name);
        let (key, raw) = self
            .qualified_names(name)
            .into_iter()
            .find_map(|key| self.get_raw(&key).map(|raw| (key, raw)))?;
        let mut guard = Guard::new();
        guard.enter(&key);
        match self.expand_with(raw, &mut guard) {
            Ok(value) => Some(value),
            Err(err) => {
                log::trace!("{}: returning unexpanded value: {}", name, err);
                Some(raw.to_string())
            }
        }
    }

    /// Expand every macro in `text` against the current bindings
    pub fn expand(&self, text: &str) -> Result<String, ExpandError> {
        self.expand_with(text, &mut Guard::new())
    }

    pub(crate) fn expand_with(&self, text: &str, guard: &mut Guard) -> Result<String, ExpandError> {
        let mut result = text.to_string();
        let mut cursor = 0;
        while let Some(found) = find_macro(&result, cursor)? {
            guard.spend()?;
            let replacement = match &found.kind {
                Macro::Reference(content) => self.resolve_reference(content, guard)?,
                Macro::Call { name, args } => self.call_function_macro(name, args, guard)?,
            };
            result.replace_range(found.start..found.end, &replacement);
            cursor = found.start;
        }
        Ok(result)
    }

    /// Resolve the text inside one `$( ... )`
    fn resolve_reference(&self, content: &str, guard: &mut Guard) -> Result<String, ExpandError> {
        let (head, default) = split_default(content);

        let starts_with_digit = head.starts_with(|c: char| c.is_ascii_digit());
        if default.is_none() && head.contains('(') && !head.starts_with('$') && !starts_with_digit {
            let open = head.find('(').unwrap_or(0);
            if !head.ends_with(')') {
                return Err(ExpandError::UnmatchedParens(content.to_string()));
            }
            let name = head[..open].trim();
            let args = &head[open + 1..head.len() - 1];
            return self.call_function_macro(name, args, guard);
        }

        let mut name = if head.contains('$') {
            self.expand_with(head, guard)?
        } else {
            head.to_string()
        };
        let mut default = default.map(str::to_string);
        // An indirection may itself produce `NAME:default`
        if default.is_none() {
            if let Some((inner_name, inner_default)) = name.split_once(':') {
                default = Some(inner_default.to_string());
                name = inner_name.to_string();
            }
        }
        let name = name.trim();

        if name.starts_with(|c: char| c.is_ascii_digit()) {
            let default = match default {
                Some(text) => Some(self.expand_with(&text, guard)?),
                None => None,
            };
            return Ok(self.param_reference(name, default));
        }

        // `$(NAME)` inside `SCHEDD.NAME` falls through to the less
        // qualified binding
        let mut blocked = false;
        for key in self.qualified_names(name) {
            let Some(raw) = self.get_raw(&key) else {
                continue;
            };
            if guard.contains(&key) {
                blocked = true;
                continue;
            }
            guard.enter(&key);
            let expanded = self.expand_with(raw, guard);
            guard.leave(&key);
            return expanded;
        }
        if blocked {
            return Err(ExpandError::CircularReference(name.to_string()));
        }

        match default {
            Some(text) => self.expand_with(&text, guard),
            None => Ok(String::new()),
        }
    }

    /// Expand the argument text, then dispatch to the named function
    fn call_function_macro(
        &self,
        name: &str,
        raw_args: &str,
        guard: &mut Guard,
    ) -> Result<String, ExpandError> {
        let args = self.expand_with(raw_args, guard)?;
        self.call_function(name, &args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(pairs: &[(&str, &str)]) -> Config {
        let mut config = Config::empty();
        for (name, value) in pairs {
            config.set(name, value);
        }
        config
    }

    #[test]
    fn split_default_ignores_nested_colons() {
        assert_eq!(split_default("A:b"), ("A", Some("b")));
        assert_eq!(split_default("A:$(B:c)"), ("A", Some("$(B:c)")));
        assert_eq!(split_default("F(a:b)"), ("F(a:b)", None));
        assert_eq!(split_default("$(X):d"), ("$(X)", Some("d")));
    }

    #[test]
    fn matching_paren_balances() {
        assert_eq!(matching_paren("$(A(b)c)", 1), Some(7));
        assert_eq!(matching_paren("$(A", 1), None);
    }

    #[test]
    fn simple_reference() {
        let config = store(&[("A", "hello"), ("B", "$(A) world")]);
        assert_eq!(config.get("B").as_deref(), Some("hello world"));
    }

    #[test]
    fn undefined_reference_is_empty() {
        let config = store(&[("B", "[$(NOPE)]")]);
        assert_eq!(config.get("B").as_deref(), Some("[]"));
    }

    #[test]
    fn default_is_expanded_only_when_needed() {
        let config = store(&[("D", "dflt"), ("B", "$(MISSING:$(D))"), ("C", "$(D:other)")]);
        assert_eq!(config.get("B").as_deref(), Some("dflt"));
        assert_eq!(config.get("C").as_deref(), Some("dflt"));
    }

    #[test]
    fn indirection() {
        let config = store(&[
            ("POINTER", "TARGET"),
            ("TARGET", "hello world"),
            ("RESULT", "$($(POINTER))"),
        ]);
        assert_eq!(config.get("RESULT").as_deref(), Some("hello world"));
    }

    #[test]
    fn double_dollar_is_left_alone() {
        let config = store(&[("A", "x"), ("REQ", "$$(Memory) and $(A)")]);
        assert_eq!(config.get("REQ").as_deref(), Some("$$(Memory) and x"));
    }

    #[test]
    fn lone_dollar_is_literal() {
        let config = store(&[("PRICE", "$5 and $ more")]);
        assert_eq!(config.get("PRICE").as_deref(), Some("$5 and $ more"));
    }

    #[test]
    fn circular_reference_returns_raw_value() {
        let config = store(&[("A", "$(B)"), ("B", "$(A)")]);
        assert_eq!(config.get("A").as_deref(), Some("$(B)"));
        assert!(matches!(
            config.expand("$(A)"),
            Err(ExpandError::CircularReference(_))
        ));
    }

    #[test]
    fn unmatched_parens_is_an_error() {
        let config = Config::empty();
        assert!(matches!(
            config.expand("$(A"),
            Err(ExpandError::UnmatchedParens(_))
        ));
    }

    #[test]
    fn many_references_within_budget() {
        let config = store(&[("X", "x")]);
        let text = "$(X)".repeat(50);
        assert_eq!(config.expand(&text).unwrap(), "x".repeat(50));
    }

    #[test]
    fn too_many_substitutions() {
        let config = store(&[("X", "x")]);
        let text = "$(X)".repeat(MAX_EXPANSION_PASSES + 1);
        assert_eq!(config.expand(&text), Err(ExpandError::DepthExceeded));
    }

    #[test]
    fn budget_is_shared_by_nested_references() {
        let mut config = store(&[("A0", "x")]);
        for i in 1..=30 {
            config.set(&format!("A{}", i), &format!("$(A{0})$(A{0})", i - 1));
        }
        assert_eq!(config.get("A5").as_deref(), Some("x".repeat(32).as_str()));
        assert_eq!(config.expand("$(A30)"), Err(ExpandError::DepthExceeded));
        assert_eq!(config.get("A30").as_deref(), Some("$(A29)$(A29)"));
    }

    #[test]
    fn get_strips_macro_wrapper() {
        let config = store(&[("A", "1")]);
        assert_eq!(config.get("$(A)").as_deref(), Some("1"));
    }
}
