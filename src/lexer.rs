//! Tokenization for the configuration language
//!
//! The lexer is stateful: most tokens are short (identifiers, punctuation,
//! quoted strings), but several constructs swallow the remainder of a line
//! as a single literal:
//!
//! - `=` captures the whole value, honoring `\` continuation and `#` comments
//! - `@=TAG` captures a heredoc block up to a line reading `@TAG`
//! - `if`/`elif` and `use` capture their argument line verbatim
//! - `error`/`warning` capture their message (after an optional `:`)
//!
//! Leaf scanners (identifiers, numbers, quoted strings) are nom combinators.

use nom::{
    branch::alt,
    bytes::complete::{escaped_transform, take_while},
    character::complete::{anychar, char, digit1, none_of, satisfy},
    combinator::{map, opt, recognize, value},
    sequence::{delimited, pair, tuple},
    IResult,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Ident,
    Number,
    /// Quoted string, `$(...)` reference, or an error/warning message
    String,
    /// `=` or `@=`; the literal is the captured value
    Assign,
    Colon,
    LParen,
    RParen,
    Comma,
    If,
    Elif,
    Else,
    Endif,
    Defined,
    Version,
    Include,
    Use,
    True,
    False,
    Yes,
    No,
    Error,
    Warning,
    Ifexist,
    Command,
    Into,
    Queue,
    From,
    In,
    Matching,
    Illegal,
    Eof,
}

impl TokenKind {
    /// Look up a keyword, case-insensitively
    pub fn keyword(word: &str) -> Option<TokenKind> {
        let kind = match word.to_ascii_lowercase().as_str() {
            "if" => TokenKind::If,
            "elif" => TokenKind::Elif,
            "else" => TokenKind::Else,
            "endif" => TokenKind::Endif,
            "defined" => TokenKind::Defined,
            "version" => TokenKind::Version,
            "include" => TokenKind::Include,
            "use" => TokenKind::Use,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "yes" => TokenKind::Yes,
            "no" => TokenKind::No,
            "error" => TokenKind::Error,
            "warning" => TokenKind::Warning,
            "ifexist" => TokenKind::Ifexist,
            "command" => TokenKind::Command,
            "into" => TokenKind::Into,
            "queue" => TokenKind::Queue,
            "from" => TokenKind::From,
            "in" => TokenKind::In,
            "matching" => TokenKind::Matching,
            _ => return None,
        };
        Some(kind)
    }

    pub fn is_keyword(self) -> bool {
        !matches!(
            self,
            TokenKind::Ident
                | TokenKind::Number
                | TokenKind::String
                | TokenKind::Assign
                | TokenKind::Colon
                | TokenKind::LParen
                | TokenKind::RParen
                | TokenKind::Comma
                | TokenKind::Illegal
                | TokenKind::Eof
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lit: String,
    pub line: usize,
    pub col: usize,
}

impl Token {
    fn new(kind: TokenKind, lit: impl Into<String>, line: usize, col: usize) -> Self {
        Token {
            kind,
            lit: lit.into(),
            line,
            col,
        }
    }
}

/// What the next call to `next_token` must capture
#[derive(Debug, Clone, Copy, PartialEq)]
enum Mode {
    Normal,
    /// After `if`, `elif` or `use`: the rest of the line is one literal
    Line,
    /// After `error` or `warning`: optional `:` then the message
    Message,
}

pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    line: usize,
    col: usize,
    mode: Mode,
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_blank(c: char) -> bool {
    c == ' ' || c == '\t' || c == '\r'
}

/// Identifier with optional embedded dots: `MASTER.LOWPORT`
fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        satisfy(is_ident_start),
        take_while(|c: char| is_ident_char(c) || c == '.'),
    ))(input)
}

/// Integer or decimal, optionally negative
fn number(input: &str) -> IResult<&str, &str> {
    recognize(tuple((
        opt(char('-')),
        digit1,
        opt(pair(char('.'), digit1)),
    )))(input)
}

/// Quoted string with `\n`, `\t` and `\<any>` escapes.
/// Stops at end of line; a missing closing quote is tolerated.
fn quoted<'a>(quote: char) -> impl FnMut(&'a str) -> IResult<&'a str, String> {
    let stop: &'static str = if quote == '"' { "\\\"\n" } else { "\\'\n" };
    move |input: &'a str| {
        delimited(
            char(quote),
            map(
                opt(escaped_transform(
                    none_of(stop),
                    '\\',
                    alt((value('\n', char('n')), value('\t', char('t')), anychar)),
                )),
                Option::unwrap_or_default,
            ),
            opt(char(quote)),
        )(input)
    }
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input,
            pos: 0,
            line: 1,
            col: 1,
            mode: Mode::Normal,
        }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.rest().chars().nth(1)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    /// Advance past text a nom scanner consumed
    fn consume(&mut self, consumed: &str) {
        for _ in consumed.chars() {
            self.bump();
        }
    }

    fn skip_blanks(&mut self) {
        while self.peek().is_some_and(is_blank) {
            self.bump();
        }
    }

    fn skip_spaces(&mut self) {
        while matches!(self.peek(), Some(' ') | Some('\t')) {
            self.bump();
        }
    }

    fn skip_to_end_of_line(&mut self) {
        while self.peek().is_some_and(|c| c != '\n') {
            self.bump();
        }
    }

    /// Only blanks precede the current position on this line
    fn at_line_start(&self) -> bool {
        self.input[..self.pos]
            .rsplit('\n')
            .next()
            .map_or(true, |prefix| prefix.chars().all(is_blank))
    }

    /// Next non-blank character after the current position, without consuming
    fn peek_past_blanks(&self) -> Option<char> {
        self.rest().chars().find(|c| !is_blank(*c))
    }

    /// Read the rest of the logical line as a value.
    ///
    /// Leading blanks are skipped. `\` at end of line joins the next line with
    /// a single space; trailing blanks before the `\` and leading blanks on the
    /// continued line are dropped. A `#` ends the value.
    pub fn read_value(&mut self) -> String {
        self.skip_spaces();
        let mut buf = String::new();

        while let Some(c) = self.peek() {
            match c {
                '\n' | '#' => break,
                '\\' if matches!(self.peek_second(), Some('\n') | Some('\r')) => {
                    let kept = buf.trim_end_matches([' ', '\t']).len();
                    buf.truncate(kept);
                    buf.push(' ');
                    self.bump();
                    if self.bump() == Some('\r') && self.peek() == Some('\n') {
                        self.bump();
                    }
                    self.skip_spaces();
                }
                _ => {
                    buf.push(c);
                    self.bump();
                }
            }
        }

        buf.trim_end_matches([' ', '\t', '\r']).to_string()
    }

    /// Move to the next physical line and return it raw, or `None` at end
    /// of input
    pub fn read_line(&mut self) -> Option<String> {
        self.skip_to_end_of_line();
        self.bump()?;
        let start = self.pos;
        self.skip_to_end_of_line();
        Some(self.input[start..self.pos].to_string())
    }

    /// Read a heredoc body after `@=`. The opening line holds the tag; the
    /// body runs until a line that trims to `@TAG`. Unterminated heredocs
    /// return everything read.
    fn read_heredoc(&mut self) -> String {
        self.skip_spaces();
        let mut tag = String::new();
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                break;
            }
            tag.push(c);
            self.bump();
        }
        if tag.is_empty() {
            return String::new();
        }
        self.skip_to_end_of_line();
        self.bump();

        let terminator = format!("@{}", tag);
        let mut lines: Vec<&str> = Vec::new();
        while self.peek().is_some() {
            let start = self.pos;
            self.skip_to_end_of_line();
            let line = &self.input[start..self.pos];
            self.bump();
            if line.trim() == terminator {
                break;
            }
            lines.push(line);
        }
        lines.join("\n")
    }

    /// Read a `$(...)` reference as one literal, balancing parentheses
    fn read_macro(&mut self) -> String {
        let start = self.pos;
        self.bump();
        self.bump();
        let mut depth = 1usize;
        while depth > 0 {
            match self.bump() {
                Some('(') => depth += 1,
                Some(')') => depth -= 1,
                Some(_) => {}
                None => break,
            }
        }
        self.input[start..self.pos].to_string()
    }

    /// Produce the next token. Newlines and comments are skipped; the end of
    /// input yields `Eof` repeatedly.
    pub fn next_token(&mut self) -> Token {
        match std::mem::replace(&mut self.mode, Mode::Normal) {
            Mode::Line => {
                self.skip_blanks();
                let (line, col) = (self.line, self.col);
                return Token::new(TokenKind::Ident, self.read_value(), line, col);
            }
            Mode::Message => {
                self.skip_blanks();
                if self.peek() == Some(':') {
                    self.bump();
                    self.skip_blanks();
                }
                let (line, col) = (self.line, self.col);
                return Token::new(TokenKind::String, self.read_value(), line, col);
            }
            Mode::Normal => {}
        }

        loop {
            self.skip_blanks();
            let (line, col) = (self.line, self.col);
            let c = match self.peek() {
                Some(c) => c,
                None => return Token::new(TokenKind::Eof, "", line, col),
            };

            match c {
                '\n' => {
                    self.bump();
                }
                '#' => self.skip_to_end_of_line(),
                // [Section] headers
                '[' if self.at_line_start() => self.skip_to_end_of_line(),
                '=' => {
                    self.bump();
                    return Token::new(TokenKind::Assign, self.read_value(), line, col);
                }
                '@' if self.peek_second() == Some('=') => {
                    self.bump();
                    self.bump();
                    return Token::new(TokenKind::Assign, self.read_heredoc(), line, col);
                }
                ':' => return self.punct(TokenKind::Colon, line, col),
                '(' => return self.punct(TokenKind::LParen, line, col),
                ')' => return self.punct(TokenKind::RParen, line, col),
                ',' => return self.punct(TokenKind::Comma, line, col),
                '"' | '\'' => {
                    let rest = self.rest();
                    return match quoted(c)(rest) {
                        Ok((remaining, text)) => {
                            self.consume(&rest[..rest.len() - remaining.len()]);
                            Token::new(TokenKind::String, text, line, col)
                        }
                        Err(_) => self.punct(TokenKind::Illegal, line, col),
                    };
                }
                '$' if self.peek_second() == Some('(') => {
                    return Token::new(TokenKind::String, self.read_macro(), line, col);
                }
                _ => {
                    let rest = self.rest();
                    if let Ok((_, word)) = identifier(rest) {
                        self.consume(word);
                        return self.word_token(word, line, col);
                    }
                    if let Ok((_, digits)) = number(rest) {
                        self.consume(digits);
                        return Token::new(TokenKind::Number, digits, line, col);
                    }
                    return self.punct(TokenKind::Illegal, line, col);
                }
            }
        }
    }

    fn punct(&mut self, kind: TokenKind, line: usize, col: usize) -> Token {
        let lit = self.bump().map(String::from).unwrap_or_default();
        Token::new(kind, lit, line, col)
    }

    /// Classify a scanned word. A keyword directly followed by `=` is an
    /// ordinary name, so `error = err.txt` is an assignment.
    fn word_token(&mut self, word: &str, line: usize, col: usize) -> Token {
        let kind = match TokenKind::keyword(word) {
            Some(_) if self.peek_past_blanks() == Some('=') => TokenKind::Ident,
            Some(kind) => kind,
            None => TokenKind::Ident,
        };
        self.mode = match kind {
            TokenKind::If | TokenKind::Elif | TokenKind::Use => Mode::Line,
            TokenKind::Error | TokenKind::Warning => Mode::Message,
            _ => Mode::Normal,
        };
        Token::new(kind, word, line, col)
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        let token = self.next_token();
        (token.kind != TokenKind::Eof).then_some(token)
    }
}

/// Tokenize a complete input string (without the trailing `Eof`)
pub fn lex(input: &str) -> Vec<Token> {
    Lexer::new(input).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        lex(input).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn tokenize_assignment() {
        let tokens = lex("FOO = bar baz");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].kind, TokenKind::Ident);
        assert_eq!(tokens[0].lit, "FOO");
        assert_eq!(tokens[1].kind, TokenKind::Assign);
        assert_eq!(tokens[1].lit, "bar baz");
    }

    #[test]
    fn assignment_value_keeps_macros() {
        let tokens = lex("LOG = $(LOCAL_DIR)/log");
        assert_eq!(tokens[1].lit, "$(LOCAL_DIR)/log");
    }

    #[test]
    fn tokenize_subsystem_name() {
        let tokens = lex("MASTER.LOWPORT = 9600");
        assert_eq!(tokens[0].lit, "MASTER.LOWPORT");
        assert_eq!(tokens[1].lit, "9600");
    }

    #[test]
    fn comment_lines_are_skipped() {
        let tokens = lex("# comment\nA = 1 # trailing\n");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[1].lit, "1");
    }

    #[test]
    fn section_headers_only_at_line_start() {
        let tokens = lex("[Networking]\n  [Daemons]\nA = 1\n");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].lit, "A");

        assert_eq!(
            kinds("queue [x]\n"),
            vec![TokenKind::Queue, TokenKind::Illegal, TokenKind::Ident, TokenKind::Illegal]
        );
    }

    #[test]
    fn line_continuation_joins_with_one_space() {
        let tokens = lex("LIST = a, \\\n      b, \\\n   c\n");
        assert_eq!(tokens[1].lit, "a, b, c");
    }

    #[test]
    fn crlf_continuation() {
        let tokens = lex("A = one \\\r\n  two\r\n");
        assert_eq!(tokens[1].lit, "one two");
    }

    #[test]
    fn keywords_are_case_insensitive() {
        assert_eq!(kinds("ENDIF"), vec![TokenKind::Endif]);
        assert_eq!(kinds("Else"), vec![TokenKind::Else]);
        assert_eq!(
            kinds("include ifexist command"),
            vec![TokenKind::Include, TokenKind::Ifexist, TokenKind::Command]
        );
    }

    #[test]
    fn if_captures_whole_line() {
        let tokens = lex("if defined(FOO) && $(BAR)\nendif");
        assert_eq!(tokens[0].kind, TokenKind::If);
        assert_eq!(tokens[1].kind, TokenKind::Ident);
        assert_eq!(tokens[1].lit, "defined(FOO) && $(BAR)");
        assert_eq!(tokens[2].kind, TokenKind::Endif);
    }

    #[test]
    fn use_captures_whole_line() {
        let tokens = lex("use POLICY : PREEMPT_IF(A, B)");
        assert_eq!(tokens[1].lit, "POLICY : PREEMPT_IF(A, B)");
    }

    #[test]
    fn error_directive_message() {
        let tokens = lex("error : something broke");
        assert_eq!(tokens[0].kind, TokenKind::Error);
        assert_eq!(tokens[1].kind, TokenKind::String);
        assert_eq!(tokens[1].lit, "something broke");
    }

    #[test]
    fn error_followed_by_assign_is_a_name() {
        let tokens = lex("error  =  err.txt");
        assert_eq!(tokens[0].kind, TokenKind::Ident);
        assert_eq!(tokens[0].lit, "error");
        assert_eq!(tokens[1].lit, "err.txt");
    }

    #[test]
    fn quoted_strings_with_escapes() {
        let tokens = lex(r#""a\tb" 'it\'s'"#);
        assert_eq!(tokens[0].lit, "a\tb");
        assert_eq!(tokens[1].lit, "it's");
    }

    #[test]
    fn numbers() {
        let tokens = lex("42 -7 3.14");
        assert!(tokens.iter().all(|t| t.kind == TokenKind::Number));
        let lits: Vec<_> = tokens.iter().map(|t| t.lit.as_str()).collect();
        assert_eq!(lits, vec!["42", "-7", "3.14"]);
    }

    #[test]
    fn macro_reference_is_one_token() {
        let tokens = lex("$(A:$(B))");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].lit, "$(A:$(B))");
    }

    #[test]
    fn section_headers_are_skipped() {
        assert_eq!(kinds("[Global]\nA = 1"), vec![TokenKind::Ident, TokenKind::Assign]);
    }

    #[test]
    fn heredoc_preserves_indentation() {
        let tokens = lex("CONFIG @=EOF\n    line1\n    line2\n@EOF\nNEXT = 1\n");
        assert_eq!(tokens[1].kind, TokenKind::Assign);
        assert_eq!(tokens[1].lit, "    line1\n    line2");
        assert_eq!(tokens[2].lit, "NEXT");
    }

    #[test]
    fn empty_heredoc() {
        let tokens = lex("EMPTY @=END\n@END\n");
        assert_eq!(tokens[1].lit, "");
    }

    #[test]
    fn unterminated_heredoc_returns_what_was_read() {
        let tokens = lex("S @=END\none\ntwo\n");
        assert_eq!(tokens[1].lit, "one\ntwo");
    }

    #[test]
    fn token_positions() {
        let tokens = lex("A = 1\n  B = 2");
        assert_eq!((tokens[0].line, tokens[0].col), (1, 1));
        assert_eq!((tokens[2].line, tokens[2].col), (2, 3));
    }

    #[test]
    fn read_value_after_colon() {
        let mut lexer = Lexer::new("include : /etc/condor/*.conf # c\nA = 1");
        assert_eq!(lexer.next_token().kind, TokenKind::Include);
        assert_eq!(lexer.next_token().kind, TokenKind::Colon);
        assert_eq!(lexer.read_value(), "/etc/condor/*.conf");
        assert_eq!(lexer.next_token().lit, "A");
    }
}
