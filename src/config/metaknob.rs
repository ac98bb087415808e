//! Templates ("metaknobs") and their positional parameters
//!
//! `use TYPE : NAME(a, b)` runs the statements stored under `$TYPE.NAME`
//! with `a` and `b` bound to the names `1` and `2`. Inside the body:
//!
//! | form     | value                                          |
//! |----------|------------------------------------------------|
//! | `$(N)`   | argument N, or the default                     |
//! | `$(N?)`  | `1` if argument N is present and non-empty     |
//! | `$(N+)`  | arguments N.. joined with `, `                 |
//! | `$(0)`   | all arguments joined with `, `                 |
//! | `$(0?)`  | `1` if there are any arguments                 |
//! | `$(0#)`  | the number of arguments                        |

use super::executor::Session;
use super::functions::split_args;
use super::{Config, ConfigError};
use crate::parser::parse;

/// Deepest allowed chain of templates using templates
pub const MAX_TEMPLATE_DEPTH: usize = 32;

/// Positional names that may hold arguments
const PARAM_NAMES: [&str; 9] = ["1", "2", "3", "4", "5", "6", "7", "8", "9"];

/// Parsed `TYPE : NAME(args)`
#[derive(Debug, Clone, PartialEq)]
struct UseSpec {
    key: String,
    args: Vec<String>,
}

fn parse_use(role: &str) -> Result<Option<UseSpec>, ConfigError> {
    let Some((kind, spec)) = role.split_once(':') else {
        return Ok(None);
    };
    let kind = kind.trim().to_ascii_uppercase();
    let spec = spec.trim();

    let (name, args) = match spec.find('(') {
        Some(open) => {
            let close = spec.rfind(')').filter(|&close| close > open).ok_or_else(|| {
                ConfigError::Use(format!("mismatched parentheses in {:?}", spec))
            })?;
            (spec[..open].trim(), split_args(&spec[open + 1..close]))
        }
        None => (spec, Vec::new()),
    };

    Ok(Some(UseSpec {
        key: format!("${}.{}", kind, name),
        args,
    }))
}

impl Config {
    /// Arguments currently bound: `1`, `2`, ... up to the first gap
    fn template_args(&self) -> Vec<&str> {
        PARAM_NAMES
            .iter()
            .map_while(|name| self.get_raw(name))
            .collect()
    }

    /// Resolve `$(N...)` given the text after `$(` and before any `:`
    pub(crate) fn param_reference(&self, spec: &str, default: Option<String>) -> String {
        let args = self.template_args();
        let mut chars = spec.chars();
        let index = chars.next().and_then(|c| c.to_digit(10)).unwrap_or(0) as usize;
        let suffix = chars.as_str();
        let flag = |present: bool| (if present { "1" } else { "0" }).to_string();
        let or_default = |value: Option<String>| value.or(default.clone()).unwrap_or_default();

        match (index, suffix) {
            (0, "?") => flag(!args.is_empty()),
            (0, "#") => args.len().to_string(),
            (0, _) => or_default((!args.is_empty()).then(|| args.join(", "))),
            (n, "?") => flag(args.get(n - 1).is_some_and(|a| !a.is_empty())),
            (n, "+") => or_default(
                args.get(n - 1..)
                    .filter(|rest| !rest.is_empty())
                    .map(|rest| rest.join(", ")),
            ),
            (n, _) => or_default(args.get(n - 1).map(|a| a.to_string())),
        }
    }

    /// Execute a `use` directive
    pub(crate) fn execute_use(&mut self, role: &str, session: &mut Session) -> Result<(), ConfigError> {
        let role = match self.expand(role) {
            Ok(role) => role,
            Err(err) => {
                log::warn!("use {}: continuing unexpanded: {}", role, err);
                role.to_string()
            }
        };

        let spec = match parse_use(&role)? {
            Some(spec) if self.contains(&spec.key) => spec,
            _ => {
                self.set("ROLE", &role);
                return Ok(());
            }
        };

        if session.template_depth >= MAX_TEMPLATE_DEPTH {
            return Err(ConfigError::TemplateRecursion(MAX_TEMPLATE_DEPTH));
        }
        if spec.args.len() > PARAM_NAMES.len() {
            return Err(ConfigError::Use(format!(
                "{} takes at most {} arguments",
                spec.key,
                PARAM_NAMES.len()
            )));
        }

        let body = self.get_raw(&spec.key).unwrap_or_default().to_string();
        let statements = parse(&body).into_result()?;
        log::debug!("use {} with {} argument(s)", spec.key, spec.args.len());

        let saved: Vec<(&str, Option<String>)> = PARAM_NAMES
            .iter()
            .map(|name| (*name, self.values.remove(*name)))
            .collect();
        for (name, arg) in PARAM_NAMES.iter().zip(&spec.args) {
            self.values.insert(name.to_string(), arg.clone());
        }

        let outer_eager = std::mem::replace(&mut session.eager, true);
        session.template_depth += 1;
        let result = self.execute_in(&statements, session);
        session.template_depth -= 1;
        session.eager = outer_eager;

        for (name, previous) in saved {
            match previous {
                Some(value) => self.values.insert(name.to_string(), value),
                None => self.values.remove(name),
            };
        }

        result.map_err(|err| match err {
            ConfigError::Directive(_) | ConfigError::TemplateRecursion(_) => err,
            other => ConfigError::Use(format!("{}: {}", spec.key, other)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_args(args: &[&str]) -> Config {
        let mut config = Config::empty();
        for (name, arg) in PARAM_NAMES.iter().zip(args) {
            config.set(name, arg);
        }
        config
    }

    #[test]
    fn parse_use_forms() {
        assert_eq!(parse_use("SECURITY").unwrap(), None);
        assert_eq!(
            parse_use("policy : ALWAYS_RUN_JOBS").unwrap(),
            Some(UseSpec { key: "$POLICY.ALWAYS_RUN_JOBS".into(), args: vec![] })
        );
        assert_eq!(
            parse_use("POLICY : WANT_HOLD_IF(A, f(b, c), d)").unwrap(),
            Some(UseSpec {
                key: "$POLICY.WANT_HOLD_IF".into(),
                args: vec!["A".into(), "f(b, c)".into(), "d".into()],
            })
        );
        assert_eq!(parse_use("POLICY : X()").unwrap().unwrap().args.len(), 0);
        assert!(parse_use("POLICY : X(a").is_err());
    }

    #[test]
    fn single_parameters() {
        let c = with_args(&["a", "", "c"]);
        assert_eq!(c.param_reference("1", None), "a");
        assert_eq!(c.param_reference("2", Some("d".into())), "");
        assert_eq!(c.param_reference("4", Some("d".into())), "d");
        assert_eq!(c.param_reference("1?", None), "1");
        assert_eq!(c.param_reference("2?", None), "0");
        assert_eq!(c.param_reference("5?", None), "0");
    }

    #[test]
    fn aggregate_parameters() {
        let c = with_args(&["a", "b", "c"]);
        assert_eq!(c.param_reference("0", None), "a, b, c");
        assert_eq!(c.param_reference("0?", None), "1");
        assert_eq!(c.param_reference("0#", None), "3");
        assert_eq!(c.param_reference("2+", None), "b, c");
        assert_eq!(c.param_reference("4+", Some("none".into())), "none");
    }

    #[test]
    fn no_arguments() {
        let c = Config::empty();
        assert_eq!(c.param_reference("0", Some("x".into())), "x");
        assert_eq!(c.param_reference("0?", None), "0");
        assert_eq!(c.param_reference("0#", None), "0");
        assert_eq!(c.param_reference("1", None), "");
    }

    #[test]
    fn use_line_that_fails_to_expand_keeps_its_text() {
        let mut c = Config::empty();
        c.load_str("A = $(B)\nB = $(A)\nuse $(A)\nAFTER = 1\n").unwrap();
        assert_eq!(c.get_raw("ROLE"), Some("$(A)"));
        assert_eq!(c.get("AFTER").as_deref(), Some("1"));
    }

    #[test]
    fn parameters_in_expansion() {
        let c = with_args(&["COND", "104"]);
        assert_eq!(c.expand("$(1) / $(2) / $(3:none) / $(0#)").unwrap(), "COND / 104 / none / 2");
    }
}
