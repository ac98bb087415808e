//! Parser for the configuration language
//!
//! A recursive-descent parser over a one-token window. It pulls tokens from
//! the lexer lazily because a few productions (`include ... : path`,
//! `queue ... from FILE`) read the rest of the line straight from the lexer
//! instead of tokenizing it.
//!
//! On a syntax error the statements completed so far are still returned
//! alongside the error.

use crate::ast::{
    Conditional, ElifClause, IncludeDirective, IncludeKind, MatchKind, QueueSource,
    QueueStatement, Statement,
};
use crate::lexer::{Lexer, Token, TokenKind};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("line {line}, column {col}: unexpected {found}")]
    UnexpectedToken {
        found: String,
        line: usize,
        col: usize,
    },
    #[error("line {line}: unexpected end of input, expected {expected}")]
    UnexpectedEof { expected: &'static str, line: usize },
    #[error("line {line}: {message}")]
    Invalid { message: String, line: usize },
}

/// Parser output: every statement completed before any error
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed {
    pub statements: Vec<Statement>,
    pub error: Option<ParseError>,
}

impl Parsed {
    pub fn into_result(self) -> Result<Vec<Statement>, ParseError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.statements),
        }
    }
}

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    cur: Token,
}

/// Parse configuration text into statements
pub fn parse(input: &str) -> Parsed {
    Parser::new(Lexer::new(input)).parse()
}

impl<'a> Parser<'a> {
    pub fn new(mut lexer: Lexer<'a>) -> Self {
        let cur = lexer.next_token();
        Parser { lexer, cur }
    }

    fn advance(&mut self) -> Token {
        let next = self.lexer.next_token();
        std::mem::replace(&mut self.cur, next)
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.cur.kind == kind
    }

    fn unexpected(&self, expected: &'static str) -> ParseError {
        if self.at(TokenKind::Eof) {
            ParseError::UnexpectedEof {
                expected,
                line: self.cur.line,
            }
        } else {
            ParseError::UnexpectedToken {
                found: describe(&self.cur),
                line: self.cur.line,
                col: self.cur.col,
            }
        }
    }

    fn expect(&mut self, kind: TokenKind, expected: &'static str) -> Result<Token, ParseError> {
        if self.at(kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(expected))
        }
    }

    /// Read the raw remainder of the current line. Only valid while the
    /// current token is the last one on the lexer's side of the line.
    fn take_rest_of_line(&mut self) -> String {
        let rest = self.lexer.read_value();
        self.advance();
        rest
    }

    /// Parse the whole input
    pub fn parse(mut self) -> Parsed {
        let mut statements = Vec::new();
        while !self.at(TokenKind::Eof) {
            match self.parse_statement() {
                Ok(stmt) => statements.push(stmt),
                Err(error) => {
                    return Parsed {
                        statements,
                        error: Some(error),
                    }
                }
            }
        }
        Parsed {
            statements,
            error: None,
        }
    }

    /// Statements up to (not including) one of `terminators`
    fn parse_block(&mut self, terminators: &[TokenKind]) -> Result<Vec<Statement>, ParseError> {
        let mut block = Vec::new();
        while !terminators.contains(&self.cur.kind) {
            if self.at(TokenKind::Eof) {
                return Err(self.unexpected("endif"));
            }
            block.push(self.parse_statement()?);
        }
        Ok(block)
    }

    fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        match self.cur.kind {
            TokenKind::Ident => self.parse_assignment(),
            TokenKind::If => self.parse_conditional(),
            TokenKind::Include => self.parse_include(),
            TokenKind::Use => {
                self.advance();
                let role = self.expect(TokenKind::Ident, "use argument")?.lit;
                Ok(Statement::Use { role })
            }
            TokenKind::Error => {
                self.advance();
                let message = self.expect(TokenKind::String, "error message")?.lit;
                Ok(Statement::Error { message })
            }
            TokenKind::Warning => {
                self.advance();
                let message = self.expect(TokenKind::String, "warning message")?.lit;
                Ok(Statement::Warning { message })
            }
            TokenKind::Queue => self.parse_queue(),
            _ => Err(self.unexpected("statement")),
        }
    }

    fn parse_assignment(&mut self) -> Result<Statement, ParseError> {
        let name = self.advance().lit;
        let value = self.expect(TokenKind::Assign, "'='")?.lit;
        Ok(Statement::Assignment { name, value })
    }

    fn parse_conditional(&mut self) -> Result<Statement, ParseError> {
        self.advance();
        let condition = normalize_condition(&self.expect(TokenKind::Ident, "condition")?.lit);
        let branch_end = [TokenKind::Elif, TokenKind::Else, TokenKind::Endif];
        let then_block = self.parse_block(&branch_end)?;

        let mut elif_clauses = Vec::new();
        while self.at(TokenKind::Elif) {
            self.advance();
            let condition =
                normalize_condition(&self.expect(TokenKind::Ident, "elif condition")?.lit);
            let block = self.parse_block(&branch_end)?;
            elif_clauses.push(ElifClause { condition, block });
        }

        let else_block = if self.at(TokenKind::Else) {
            self.advance();
            Some(self.parse_block(&[TokenKind::Endif])?)
        } else {
            None
        };

        self.expect(TokenKind::Endif, "endif")?;
        Ok(Statement::Conditional(Conditional {
            condition,
            then_block,
            elif_clauses,
            else_block,
        }))
    }

    /// `include "path"` or `include [ifexist] [command] : path`
    fn parse_include(&mut self) -> Result<Statement, ParseError> {
        let line = self.advance().line;
        let mut if_exist = false;
        let mut command = false;
        if self.at(TokenKind::Ifexist) {
            if_exist = true;
            self.advance();
        }
        if self.at(TokenKind::Command) {
            command = true;
            self.advance();
        }

        let raw = match self.cur.kind {
            TokenKind::String => self.advance().lit,
            TokenKind::Colon => self.take_rest_of_line(),
            _ => return Err(self.unexpected("':' or quoted path after include")),
        };

        let mut path = unquote(raw.trim()).to_string();
        if let Some(stripped) = path.strip_suffix('|') {
            command = true;
            path = stripped.trim_end().to_string();
        }
        if path.is_empty() {
            return Err(ParseError::Invalid {
                message: "include directive without a path".into(),
                line,
            });
        }

        Ok(Statement::Include(IncludeDirective {
            kind: IncludeKind::new(if_exist, command),
            path,
        }))
    }

    /// `queue [N] [var, ...] [from FILE | in (items) | matching PATTERN]`,
    /// all on the line of the `queue` keyword
    fn parse_queue(&mut self) -> Result<Statement, ParseError> {
        let line = self.advance().line;
        let on_line = |p: &Self, kind: TokenKind| p.cur.line == line && p.at(kind);
        let mut queue = QueueStatement::default();

        if on_line(self, TokenKind::Number) {
            let count = self.advance();
            queue.count = count.lit.parse().map_err(|_| ParseError::Invalid {
                message: format!("queue count must be a non-negative integer, got {}", count.lit),
                line,
            })?;
        }

        while on_line(self, TokenKind::Ident) {
            queue.var_names.push(self.advance().lit);
            if on_line(self, TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }

        if on_line(self, TokenKind::From) {
            queue.source = QueueSource::File(self.take_rest_of_line());
        } else if on_line(self, TokenKind::In) {
            let first = self.lexer.read_value();
            let items = self.read_item_list(first);
            self.advance();
            queue.source = QueueSource::Items(items);
        } else if on_line(self, TokenKind::Matching) {
            queue.source = matching_source(&self.take_rest_of_line());
        } else if !queue.var_names.is_empty() {
            return Err(ParseError::Invalid {
                message: "queue with variables needs 'from', 'in' or 'matching'".into(),
                line,
            });
        } else if self.cur.line == line && !self.at(TokenKind::Eof) {
            return Err(self.unexpected("end of queue statement"));
        }

        Ok(Statement::Queue(queue))
    }

    /// Items of `in ( ... )`, comma separated; the list may span lines
    /// until the closing parenthesis
    fn read_item_list(&mut self, first: String) -> Vec<String> {
        let mut items = Vec::new();
        let mut text = first.trim().to_string();
        let mut open = false;
        if let Some(rest) = text.strip_prefix('(') {
            text = rest.to_string();
            open = true;
        }
        loop {
            let closed = match text.find(')') {
                Some(idx) if open => {
                    text.truncate(idx);
                    true
                }
                _ => !open,
            };
            items.extend(
                text.split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(String::from),
            );
            if closed {
                break;
            }
            match self.lexer.read_line() {
                Some(next) => text = next.trim().to_string(),
                None => break,
            }
        }
        items
    }
}

fn describe(token: &Token) -> String {
    match token.kind {
        TokenKind::Ident => format!("identifier '{}'", token.lit),
        TokenKind::Assign => "'='".to_string(),
        _ if token.kind.is_keyword() => format!("keyword '{}'", token.lit),
        _ => format!("'{}'", token.lit),
    }
}

/// Strip one layer of matching quotes
fn unquote(text: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = text
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    text
}

fn matching_source(rest: &str) -> QueueSource {
    let rest = rest.trim();
    let (first, tail) = match rest.split_once(char::is_whitespace) {
        Some((first, tail)) => (first, tail.trim()),
        None => (rest, ""),
    };
    let kind = match first.to_ascii_lowercase().as_str() {
        "files" if !tail.is_empty() => Some(MatchKind::Files),
        "dirs" if !tail.is_empty() => Some(MatchKind::Dirs),
        _ => None,
    };
    match kind {
        Some(kind) => QueueSource::Matching {
            kind: Some(kind),
            pattern: tail.to_string(),
        },
        None => QueueSource::Matching {
            kind: None,
            pattern: rest.to_string(),
        },
    }
}

/// Canonicalize the `defined` and `version` condition forms:
/// `Defined(X)` -> `defined(X)`, `VERSION >= "9.1"` -> `version >= 9.1`
pub fn normalize_condition(raw: &str) -> String {
    let cond = raw.trim();
    let lower = cond.to_ascii_lowercase();

    if let Some(rest) = lower.strip_prefix("defined") {
        if rest.starts_with('(') || rest.starts_with(char::is_whitespace) {
            return format!("defined{}", &cond["defined".len()..]);
        }
    }

    if let Some(rest) = lower.strip_prefix("version") {
        if rest.starts_with(char::is_whitespace) {
            let spec = cond["version".len()..].trim();
            for op in [">=", "<=", "==", "!=", ">", "<"] {
                if let Some(version) = spec.strip_prefix(op) {
                    return format!("version {} {}", op, unquote(version.trim()));
                }
            }
        }
    }

    cond.to_string()
}
