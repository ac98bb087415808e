//! condor-config - the HTCondor configuration language
//!
//! # Overview
//!
//! A configuration is a sequence of statements executed top to bottom
//! against a store of named values. Values are stored unexpanded; macros
//! inside them are expanded when the value is read.
//!
//! ```text
//! # Assignments, with macros expanded lazily
//! RELEASE_DIR = /usr
//! SBIN = $(RELEASE_DIR)/sbin
//!
//! # Multi-line values
//! START @=end
//!   (Owner == "alice") || (Owner == "bob")
//! @end
//!
//! # Conditionals
//! if version >= 9.0
//!   USE_SHARED_PORT = True
//! elif defined LEGACY
//!   USE_SHARED_PORT = False
//! endif
//!
//! # Includes: files, globs, command output
//! include ifexist : /etc/condor/config.d/*.conf
//! include command : /usr/bin/make_config
//!
//! # Templates
//! use POLICY : PREEMPT_IF_MEMORY_EXCEEDED
//! ```
//!
//! # Macros
//!
//! - `$(NAME)`, `$(NAME:default)`, `$($(POINTER))`
//! - `$ENV(HOME)`, `$INT(3.7)`, `$SUBSTR(text, 1, 2)`, `$Fpn(/a/b.c)`, ...
//! - `$(1)`, `$(2?)`, `$(3+)`, `$(0#)` inside templates
//! - `$$(...)` is passed through untouched
//!
//! # Example
//!
//! ```rust
//! use condor_config::Config;
//!
//! let mut config = Config::builder().without_probe().build();
//! config.load_str("RELEASE_DIR = /opt/condor\nTOOLS = $(SBIN)/tools\n").unwrap();
//! assert_eq!(config.get("TOOLS").as_deref(), Some("/opt/condor/sbin/tools"));
//! ```

pub mod ast;
pub mod config;
pub mod lexer;
pub mod parser;

// Re-export commonly used items
pub use ast::{IncludeDirective, IncludeKind, MatchKind, QueueSource, QueueStatement, Statement};
pub use config::{
    CommandRunner, Config, ConfigBuilder, ConfigError, ConfigOptions, ExpandError, HostProbe,
    RecordEvaluator, RecordValue, ShellRunner, SystemProbe,
};
pub use lexer::{lex, Lexer, Token, TokenKind};
pub use parser::{parse, ParseError, Parsed};

/// Parse and execute `text` on top of the bundled defaults
pub fn load_str(text: &str) -> Result<Config, ConfigError> {
    Config::from_text(text)
}
