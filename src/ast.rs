//! Statement tree for the configuration language
//!
//! The parser produces an ordered `Vec<Statement>`; the executor walks it.
//! Values are kept unexpanded here; macro expansion happens at execution or
//! lookup time.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `NAME = value` (or a heredoc); `value` is the raw text
    Assignment { name: String, value: String },
    Conditional(Conditional),
    Include(IncludeDirective),
    /// `use ROLE` / `use TYPE : NAME(args)`; the whole line, unparsed
    Use { role: String },
    Error { message: String },
    Warning { message: String },
    Queue(QueueStatement),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Conditional {
    pub condition: String,
    pub then_block: Vec<Statement>,
    pub elif_clauses: Vec<ElifClause>,
    pub else_block: Option<Vec<Statement>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElifClause {
    pub condition: String,
    pub block: Vec<Statement>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncludeKind {
    Include,
    IncludeIfExist,
    IncludeCommand,
    IncludeIfExistCommand,
}

impl IncludeKind {
    pub fn new(if_exist: bool, command: bool) -> Self {
        match (if_exist, command) {
            (false, false) => IncludeKind::Include,
            (true, false) => IncludeKind::IncludeIfExist,
            (false, true) => IncludeKind::IncludeCommand,
            (true, true) => IncludeKind::IncludeIfExistCommand,
        }
    }

    /// Missing files or failing commands are tolerated
    pub fn is_optional(self) -> bool {
        matches!(
            self,
            IncludeKind::IncludeIfExist | IncludeKind::IncludeIfExistCommand
        )
    }

    pub fn is_command(self) -> bool {
        matches!(
            self,
            IncludeKind::IncludeCommand | IncludeKind::IncludeIfExistCommand
        )
    }
}

impl fmt::Display for IncludeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IncludeKind::Include => "include",
            IncludeKind::IncludeIfExist => "include_ifexist",
            IncludeKind::IncludeCommand => "include_command",
            IncludeKind::IncludeIfExistCommand => "include_ifexist_command",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IncludeDirective {
    pub kind: IncludeKind,
    /// File path, glob pattern, or command line (unexpanded)
    pub path: String,
}

/// Where a `queue` statement draws its items from
#[derive(Debug, Clone, PartialEq)]
pub enum QueueSource {
    /// Plain `queue` / `queue N`
    Count,
    /// `queue vars from FILE`
    File(String),
    /// `queue vars in (a, b, c)`
    Items(Vec<String>),
    /// `queue vars matching [files|dirs] PATTERN`
    Matching {
        kind: Option<MatchKind>,
        pattern: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Files,
    Dirs,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueueStatement {
    pub count: u32,
    pub var_names: Vec<String>,
    pub source: QueueSource,
}

impl Default for QueueStatement {
    fn default() -> Self {
        QueueStatement {
            count: 1,
            var_names: Vec::new(),
            source: QueueSource::Count,
        }
    }
}
