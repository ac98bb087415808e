//! Statement execution

use super::{Config, ConfigError};
use crate::ast::{Conditional, Statement};
use crate::parser::parse;
use std::path::PathBuf;

/// State of one load: the include stack and template nesting. Created per
/// top-level call and threaded through nested includes and templates.
#[derive(Debug, Default)]
pub(crate) struct Session {
    /// Canonical paths of the files currently being executed
    pub(crate) include_stack: Vec<PathBuf>,
    pub(crate) template_depth: usize,
    /// Expand assignment values before storing them (inside templates)
    pub(crate) eager: bool,
}

impl Config {
    /// Execute statements produced by the parser, e.g. by a caller that
    /// parsed the text itself
    pub fn execute_statements(&mut self, statements: &[Statement]) -> Result<(), ConfigError> {
        self.execute_in(statements, &mut Session::default())
    }

    /// Parse `text` and execute it within `session`
    pub(crate) fn execute_text(&mut self, text: &str, session: &mut Session) -> Result<(), ConfigError> {
        let statements = parse(text).into_result()?;
        self.execute_in(&statements, session)
    }

    pub(crate) fn execute_in(
        &mut self,
        statements: &[Statement],
        session: &mut Session,
    ) -> Result<(), ConfigError> {
        for statement in statements {
            self.execute_statement(statement, session)?;
        }
        Ok(())
    }

    fn execute_statement(&mut self, statement: &Statement, session: &mut Session) -> Result<(), ConfigError> {
        match statement {
            Statement::Assignment { name, value } => {
                if session.eager {
                    let expanded = self.expand(value).map_err(|source| ConfigError::Expansion {
                        context: name.clone(),
                        source,
                    })?;
                    self.set(name, &expanded);
                } else {
                    self.set(name, value);
                }
                Ok(())
            }
            Statement::Conditional(conditional) => self.execute_conditional(conditional, session),
            Statement::Include(include) => self.execute_include(include, session),
            Statement::Use { role } => self.execute_use(role, session),
            Statement::Error { message } => {
                Err(ConfigError::Directive(self.expand_message(message)))
            }
            Statement::Warning { message } => {
                log::warn!("configuration warning: {}", self.expand_message(message));
                Ok(())
            }
            Statement::Queue(queue) => {
                self.queue.push(queue.clone());
                Ok(())
            }
        }
    }

    /// Messages fall back to their raw text when expansion fails
    fn expand_message(&self, message: &str) -> String {
        self.expand(message).unwrap_or_else(|_| message.to_string())
    }

    fn execute_conditional(
        &mut self,
        conditional: &Conditional,
        session: &mut Session,
    ) -> Result<(), ConfigError> {
        if self.condition_holds(&conditional.condition)? {
            return self.execute_in(&conditional.then_block, session);
        }
        for clause in &conditional.elif_clauses {
            if self.condition_holds(&clause.condition)? {
                return self.execute_in(&clause.block, session);
            }
        }
        match &conditional.else_block {
            Some(block) => self.execute_in(block, session),
            None => Ok(()),
        }
    }

    fn condition_holds(&self, condition: &str) -> Result<bool, ConfigError> {
        let expanded = self.expand(condition).map_err(|source| ConfigError::Expansion {
            context: format!("condition {:?}", condition),
            source,
        })?;
        self.evaluate_condition(&expanded)
            .map_err(|message| ConfigError::Condition {
                condition: condition.to_string(),
                message,
            })
    }
}
