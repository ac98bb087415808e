//! The configuration store and everything that mutates or reads it
//!
//! A [`Config`] maps variable names to *unexpanded* text. Statements are
//! executed against it in program order; reads through [`Config::get`]
//! expand macros lazily, so a value always reflects the bindings in place at
//! read time.
//!
//! The implementation is split by concern, each file adding an `impl Config`
//! block:
//!
//! - `expand.rs`: macro scanning and substitution
//! - `functions.rs`: `$ENV`, `$INT`, `$SUBSTR`, the `$F` family, ...
//! - `metaknob.rs`: positional parameters and `use TYPE : NAME(args)`
//! - `conditions.rs`: `if`/`elif` condition evaluation
//! - `executor.rs`: statement dispatch
//! - `include.rs`: `include` files, globs and commands
//! - `environment.rs`: process environment and local config files

mod command;
mod conditions;
mod defaults;
mod environment;
mod executor;
mod expand;
mod functions;
mod include;
mod metaknob;
mod probe;
mod record;

pub use command::{CommandRunner, ShellRunner};
pub use conditions::{compare_versions, is_truthy};
pub use defaults::{ParamDefault, DEFAULT_PARAMS};
pub use expand::ExpandError;
pub use probe::{HostProbe, SystemProbe};
pub use record::{RecordEvaluator, RecordValue};

use crate::ast::QueueStatement;
use crate::parser::ParseError;
use executor::Session;
use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("syntax error: {0}")]
    Syntax(#[from] ParseError),
    #[error("configuration error: {0}")]
    Directive(String),
    #[error("circular include detected: {0}")]
    CircularInclude(String),
    #[error("include file not found: {0}")]
    IncludeNotFound(String),
    #[error("no files match pattern: {0}")]
    NoGlobMatch(String),
    #[error("invalid include pattern {pattern}: {message}")]
    Glob { pattern: String, message: String },
    #[error("error executing command {command:?}: {message}")]
    Command { command: String, message: String },
    #[error("error expanding {context}: {source}")]
    Expansion {
        context: String,
        #[source]
        source: ExpandError,
    },
    #[error("error evaluating condition {condition:?}: {message}")]
    Condition { condition: String, message: String },
    #[error("use directive: {0}")]
    Use(String),
    #[error("template nesting exceeds {0} levels")]
    TemplateRecursion(usize),
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Identity of the process reading the configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOptions {
    /// Local name (e.g. `worker`); enables `LOCAL_NAME.VAR` lookups
    pub local_name: Option<String>,
    /// Subsystem (e.g. `SCHEDD`); enables `SUBSYSTEM.VAR` lookups
    pub subsystem: Option<String>,
}

/// A configuration: the value store plus the collaborators statement
/// execution needs
pub struct Config {
    /// Name -> unexpanded value
    pub(crate) values: HashMap<String, String>,
    pub(crate) options: ConfigOptions,
    pub(crate) runner: Box<dyn CommandRunner>,
    pub(crate) record_evaluator: Option<Box<dyn RecordEvaluator>>,
    /// `queue` statements in execution order
    pub(crate) queue: Vec<QueueStatement>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("values", &self.values.len())
            .field("options", &self.options)
            .field("queue", &self.queue)
            .finish()
    }
}

/// Builds a [`Config`] with chosen seed data and collaborators
pub struct ConfigBuilder {
    options: ConfigOptions,
    defaults: &'static [ParamDefault],
    probe: Option<Box<dyn HostProbe>>,
    runner: Box<dyn CommandRunner>,
    record_evaluator: Option<Box<dyn RecordEvaluator>>,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        ConfigBuilder {
            options: ConfigOptions::default(),
            defaults: DEFAULT_PARAMS,
            probe: Some(Box::new(SystemProbe)),
            runner: Box::new(ShellRunner),
            record_evaluator: None,
        }
    }
}

impl ConfigBuilder {
    pub fn options(mut self, options: ConfigOptions) -> Self {
        self.options = options;
        self
    }

    pub fn subsystem(mut self, subsystem: impl Into<String>) -> Self {
        self.options.subsystem = Some(subsystem.into());
        self
    }

    pub fn local_name(mut self, local_name: impl Into<String>) -> Self {
        self.options.local_name = Some(local_name.into());
        self
    }

    /// Replace the default-parameter table
    pub fn defaults(mut self, defaults: &'static [ParamDefault]) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn probe(mut self, probe: impl HostProbe + 'static) -> Self {
        self.probe = Some(Box::new(probe));
        self
    }

    /// Skip host probing; only time constants and identity are seeded
    pub fn without_probe(mut self) -> Self {
        self.probe = None;
        self
    }

    pub fn command_runner(mut self, runner: impl CommandRunner + 'static) -> Self {
        self.runner = Box::new(runner);
        self
    }

    pub fn record_evaluator(mut self, evaluator: impl RecordEvaluator + 'static) -> Self {
        self.record_evaluator = Some(Box::new(evaluator));
        self
    }

    /// Create the store: default table, then built-in constants, then probe
    /// values
    pub fn build(self) -> Config {
        let mut config = Config {
            values: HashMap::new(),
            options: self.options,
            runner: self.runner,
            record_evaluator: self.record_evaluator,
            queue: Vec::new(),
        };

        let windows = cfg!(windows);
        for param in self.defaults {
            let value = match param.win32_default {
                Some(win) if windows => win,
                _ => param.default,
            };
            config.values.insert(param.name.to_string(), value.to_string());
        }

        config.init_builtins(self.probe.as_deref());
        config
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// A store seeded with the bundled defaults, built-ins and host values
    pub fn new() -> Self {
        ConfigBuilder::default().build()
    }

    /// A store with no bindings at all
    pub fn empty() -> Self {
        Config {
            values: HashMap::new(),
            options: ConfigOptions::default(),
            runner: Box::new(ShellRunner),
            record_evaluator: None,
            queue: Vec::new(),
        }
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Parse and execute `text` on top of a default store
    pub fn from_text(text: &str) -> Result<Self, ConfigError> {
        let mut config = Config::new();
        config.load_str(text)?;
        Ok(config)
    }

    pub fn options(&self) -> &ConfigOptions {
        &self.options
    }

    fn init_builtins(&mut self, probe: Option<&dyn HostProbe>) {
        for (name, value) in [
            ("SECOND", "1"),
            ("MINUTE", "60"),
            ("HOUR", "3600"),
            ("DAY", "86400"),
            ("WEEK", "604800"),
        ] {
            self.set(name, value);
        }

        if let Some(probe) = probe {
            for (name, value) in probe.values() {
                self.set(&name, &value);
            }
        }

        let subsystem = self.options.subsystem.clone();
        self.set("SUBSYSTEM", subsystem.as_deref().unwrap_or("TOOL"));
        if let Some(local_name) = self.options.local_name.clone() {
            self.set("LOCAL_NAME", &local_name);
        }
    }

    /// Bind `name` to the raw `value`. A literal `$(name)` inside `value`
    /// is replaced right away by the previous raw value (or nothing), so
    /// `A = $(A) more` appends instead of looping.
    pub fn set(&mut self, name: &str, value: &str) {
        let self_ref = format!("$({})", name);
        let value = if value.contains(&self_ref) {
            let previous = self.values.get(name).map(String::as_str).unwrap_or("");
            value.replace(&self_ref, previous)
        } else {
            value.to_string()
        };
        self.values.insert(name.to_string(), value);
    }

    /// Remove a binding, returning its raw value
    pub fn unset(&mut self, name: &str) -> Option<String> {
        self.values.remove(name)
    }

    /// Raw, unexpanded value of exactly `name`
    pub fn get_raw(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// All bound names, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.values.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// `queue` statements executed so far, in order
    pub fn queue_statements(&self) -> &[QueueStatement] {
        &self.queue
    }

    /// Keys a plain name resolves through, most specific first:
    /// `LOCAL_NAME.NAME`, `SUBSYSTEM.NAME`, then `NAME`
    pub(crate) fn qualified_names(&self, name: &str) -> Vec<String> {
        let mut keys = Vec::new();
        if !name.starts_with(|c: char| c.is_ascii_digit() || c == '$') {
            for prefix in [&self.options.local_name, &self.options.subsystem]
                .into_iter()
                .flatten()
            {
                keys.push(format!("{}.{}", prefix, name));
            }
        }
        keys.push(name.to_string());
        keys
    }

    /// Parse and execute configuration text
    pub fn load_str(&mut self, text: &str) -> Result<(), ConfigError> {
        self.execute_text(text, &mut Session::default())
    }

    /// Parse and execute configuration read from `reader`
    pub fn load<R: Read>(&mut self, mut reader: R) -> Result<(), ConfigError> {
        let mut text = String::new();
        reader
            .read_to_string(&mut text)
            .map_err(|source| ConfigError::Io {
                path: PathBuf::from("<reader>"),
                source,
            })?;
        self.load_str(&text)
    }

    /// Parse and execute a file. The file is on the include stack while it
    /// runs, so it cannot include itself.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        self.include_path(path.as_ref(), false, &mut Session::default())
    }
}
