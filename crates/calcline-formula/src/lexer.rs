//! Expression lexer
//!
//! Tolerant tokenizer: never fails, unknown characters are skipped and
//! malformed constructs are left for the parser to reject.

use calcline_core::currency;
use calcline_core::numeric::scan_number;
use calcline_core::unit;
use lazy_regex::regex_find;

/// Token kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Number, or an ISO `YYYY-MM-DD` date
    Number,
    /// `+ - * / ^` and the keyword `of`
    Operator,
    LeftParen,
    RightParen,
    Comma,
    Colon,
    /// Unit written directly after a number (`km` in `2km`)
    UnitSuffix,
    /// Variable or function name; may contain single inner spaces
    Identifier,
    /// `$`, `€`, ... or a prefix ISO code such as `USD` in `USD 20`
    CurrencySymbol,
    Percent,
    /// Conversion keyword `to`, `in` or `as`
    Conversion,
}

/// A token with its byte span in the source text
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub start: usize,
    pub end: usize,
}

impl Token {
    fn new(kind: TokenKind, text: impl Into<String>, start: usize, end: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            start,
            end,
        }
    }

    /// True for an operator token with the given symbol
    pub fn is_operator(&self, symbol: &str) -> bool {
        self.kind == TokenKind::Operator && self.text == symbol
    }
}

/// True when `(` follows `tokens[i]` with no gap, as in `round(`
pub fn opens_call(tokens: &[Token], i: usize) -> bool {
    match (tokens.get(i), tokens.get(i + 1)) {
        (Some(token), Some(next)) => next.kind == TokenKind::LeftParen && next.start == token.end,
        _ => false,
    }
}

/// Words that end a phrase identifier and never start a unit suffix
const KEYWORDS: &[&str] = &["to", "in", "as", "of", "per"];

fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(&word)
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || matches!(c, '°' | 'µ' | 'Ω')
}

fn is_ident_char(c: char) -> bool {
    is_ident_start(c) || c.is_ascii_digit() || matches!(c, '²' | '³')
}

/// Split `text` into tokens
pub fn tokenize(text: &str) -> Vec<Token> {
    let tokens = Lexer::new(text).run();
    tracing::trace!(input = text, count = tokens.len(), "tokenized");
    tokens
}

struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> Vec<Token> {
        loop {
            self.skip_whitespace();
            let Some(c) = self.peek_char() else {
                break;
            };
            let start = self.pos;

            match c {
                '+' | '-' | '*' | '/' | '^' => {
                    self.advance();
                    self.push(TokenKind::Operator, c.to_string(), start);
                }
                '×' | '·' => {
                    self.advance();
                    self.push(TokenKind::Operator, "*", start);
                }
                '÷' => {
                    self.advance();
                    self.push(TokenKind::Operator, "/", start);
                }
                '(' => {
                    self.advance();
                    self.push(TokenKind::LeftParen, "(", start);
                }
                ')' => {
                    self.advance();
                    self.push(TokenKind::RightParen, ")", start);
                }
                ',' => {
                    self.advance();
                    self.push(TokenKind::Comma, ",", start);
                }
                ':' => {
                    self.advance();
                    self.push(TokenKind::Colon, ":", start);
                }
                '%' => {
                    self.advance();
                    self.push(TokenKind::Percent, "%", start);
                }
                c if currency::is_currency_symbol(c) => {
                    self.advance();
                    self.push(TokenKind::CurrencySymbol, c.to_string(), start);
                }
                c if c.is_ascii_digit()
                    || (c == '.' && self.peek_char_at(1).is_some_and(|d| d.is_ascii_digit())) =>
                {
                    self.scan_number();
                }
                c if is_ident_start(c) => self.scan_identifier(),
                // Unknown character
                _ => self.advance(),
            }
        }
        self.tokens
    }

    fn scan_number(&mut self) {
        let input = self.input;
        let start = self.pos;
        if let Some(date) = regex_find!(r"^\d{4}-\d{2}-\d{2}\b", &input[start..]) {
            self.pos += date.len();
            self.push(TokenKind::Number, date, start);
            return;
        }
        match scan_number(&input[start..]) {
            Some((_, len)) => {
                self.pos += len;
                self.push(TokenKind::Number, &input[start..self.pos], start);
                self.scan_unit_suffix();
            }
            None => self.advance(),
        }
    }

    /// A known unit right after a number, optionally separated by spaces
    fn scan_unit_suffix(&mut self) {
        let input = self.input;
        let mut pos = self.pos;
        while input[pos..].starts_with(|c: char| c == ' ' || c == '\t') {
            pos += 1;
        }
        let start = pos;
        let rest = &input[start..];
        let len: usize = rest
            .chars()
            .take_while(|&c| is_ident_char(c))
            .map(char::len_utf8)
            .sum();
        if len == 0 || !rest.starts_with(is_ident_start) {
            return;
        }
        let word = &rest[..len];
        let symbol = word.trim_end_matches(['²', '³']);
        if is_keyword(word) || rest[len..].starts_with('(') || !unit::is_unit(symbol) {
            return;
        }
        // `100 EUR` reads as a currency, not as a unit
        if currency::is_currency_code(word) {
            return;
        }
        self.pos = start + len;
        self.push(TokenKind::UnitSuffix, word, start);
    }

    fn scan_identifier(&mut self) {
        let input = self.input;
        let start = self.pos;
        self.consume_word();
        let first = &input[start..self.pos];

        if is_keyword(first) && first != "per" {
            let kind = if first == "of" {
                TokenKind::Operator
            } else {
                TokenKind::Conversion
            };
            self.push(kind, first, start);
            return;
        }

        // `USD 20`: a code immediately followed by an amount
        if currency::is_currency_code(first) {
            let rest = &input[self.pos..];
            let trimmed = rest.trim_start();
            if trimmed.len() < rest.len() && trimmed.starts_with(|c: char| c.is_ascii_digit()) {
                self.push(TokenKind::CurrencySymbol, first, start);
                return;
            }
        }

        // Phrase identifiers: join following words separated by whitespace
        let mut text = first.to_string();
        if first != "per" {
            loop {
                let rest = &input[self.pos..];
                let trimmed = rest.trim_start();
                let gap = rest.len() - trimmed.len();
                if gap == 0 || !trimmed.starts_with(is_ident_start) {
                    break;
                }
                let len: usize = trimmed
                    .chars()
                    .take_while(|&c| is_ident_char(c))
                    .map(char::len_utf8)
                    .sum();
                let word = &trimmed[..len];
                if is_keyword(word) || currency::is_currency_code(word) {
                    break;
                }
                text.push(' ');
                text.push_str(word);
                self.pos += gap + len;
            }
        }
        self.push(TokenKind::Identifier, text, start);
    }

    fn consume_word(&mut self) {
        while self.peek_char().is_some_and(is_ident_char) {
            self.advance();
        }
    }

    fn push(&mut self, kind: TokenKind, text: impl Into<String>, start: usize) {
        self.tokens.push(Token::new(kind, text, start, self.pos));
    }

    // === Helper methods ===

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_char_at(&self, offset: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(offset)
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek_char() {
            self.pos += c.len_utf8();
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek_char().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }
}
