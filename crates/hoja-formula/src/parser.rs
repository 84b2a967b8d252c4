//! Expression parser
//!
//! A recursive descent parser for substituted expressions: numbers, strings,
//! `+ - * /`, parentheses and calls whose arguments are literals.

use crate::ast::{BinaryOperator, CallArg, FormulaExpr, UnaryOperator};
use crate::error::{FormulaError, FormulaResult};

/// Deepest allowed nesting of parentheses and unary signs
pub const MAX_NESTING_DEPTH: usize = 256;

/// Parse a substituted expression into an AST
///
/// The input is what [`parse_expression`](crate::parse_expression) produces,
/// without a leading `=`.
///
/// # Example
/// ```rust
/// use hoja_formula::parse_formula;
///
/// let ast = parse_formula("1+2").unwrap();
/// let ast = parse_formula("SUM(1,2,\"3\")*2").unwrap();
/// assert!(parse_formula("SUM(1,").is_err());
/// ```
pub fn parse_formula(expression: &str) -> FormulaResult<FormulaExpr> {
    let tokens = tokenize(expression);
    let mut parser = FormulaParser::new(&tokens);
    let expr = parser.parse_expression()?;

    // Make sure we consumed all input
    if !matches!(parser.current_token(), Token::Eof) {
        return Err(FormulaError::Parse(format!(
            "Unexpected {:?} after expression",
            parser.current_token()
        )));
    }

    Ok(expr)
}

/// Check that every call has only literal arguments
///
/// After substitution a call may only contain numbers (optionally signed) and
/// strings. Anything else, such as a range too large to expand or a nested
/// call, means the references did not resolve to a plain argument list.
pub fn check_call_shape(expression: &str) -> FormulaResult<()> {
    let tokens = tokenize(expression);
    let mut i = 0;

    while i < tokens.len() {
        let is_call = matches!(tokens[i].token, Token::Identifier(_))
            && matches!(tokens.get(i + 1).map(|t| &t.token), Some(Token::LeftParen));
        if !is_call {
            i += 1;
            continue;
        }

        i += 2;
        let mut expect_literal = true;
        let mut empty = true;
        loop {
            let token = tokens.get(i).map(|t| &t.token).unwrap_or(&Token::Eof);
            match (token, expect_literal) {
                (Token::RightParen, false) => break,
                (Token::RightParen, true) if empty => break,
                (Token::Plus | Token::Minus, true)
                    if matches!(tokens.get(i + 1).map(|t| &t.token), Some(Token::Number(_))) =>
                {
                    i += 1;
                    continue;
                }
                (Token::Number(_) | Token::String(..), true) => expect_literal = false,
                (Token::Comma, false) => expect_literal = true,
                _ => {
                    return Err(FormulaError::InvalidRange(expression.to_string()));
                }
            }
            empty = false;
            i += 1;
        }
        i += 1;
    }

    Ok(())
}

/// Token types
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    // Literals
    Number(f64),
    /// String literal and its quote character
    String(String, char),

    /// Function name, cell id or stray word
    Identifier(String),

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Colon,
    Comma,
    Semicolon,

    // Delimiters
    LeftParen,
    RightParen,

    /// Any other character, including an unterminated quote
    Unknown(char),

    // End of input
    Eof,
}

/// A token and its byte span in the input
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Spanned {
    pub token: Token,
    pub start: usize,
    pub end: usize,
}

/// Split input into tokens, ending with [`Token::Eof`]
pub(crate) fn tokenize(input: &str) -> Vec<Spanned> {
    let mut lexer = Lexer { input, pos: 0 };
    let mut tokens = Vec::new();
    loop {
        lexer.skip_whitespace();
        let start = lexer.pos;
        let token = lexer.scan_token();
        let done = token == Token::Eof;
        tokens.push(Spanned {
            token,
            start,
            end: lexer.pos,
        });
        if done {
            return tokens;
        }
    }
}

struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    // === Token scanning ===

    fn scan_token(&mut self) -> Token {
        let Some(c) = self.peek_char() else {
            return Token::Eof;
        };

        // Single-character tokens
        let single = match c {
            '+' => Some(Token::Plus),
            '-' => Some(Token::Minus),
            '*' => Some(Token::Star),
            '/' => Some(Token::Slash),
            ':' => Some(Token::Colon),
            ',' => Some(Token::Comma),
            ';' => Some(Token::Semicolon),
            '(' => Some(Token::LeftParen),
            ')' => Some(Token::RightParen),
            _ => None,
        };
        if let Some(token) = single {
            self.advance();
            return token;
        }

        // String literal
        if c == '"' || c == '\'' {
            return self.scan_string(c);
        }

        // Number
        if c.is_ascii_digit()
            || (c == '.' && self.peek_char_at(1).map_or(false, |c| c.is_ascii_digit()))
        {
            return self.scan_number();
        }

        if c.is_ascii_alphabetic() || c == '_' {
            return self.scan_identifier();
        }

        self.advance();
        Token::Unknown(c)
    }

    fn scan_string(&mut self, quote: char) -> Token {
        if !self.input[self.pos + quote.len_utf8()..].contains(quote) {
            self.advance();
            return Token::Unknown(quote);
        }

        self.advance(); // Skip opening quote

        let mut s = String::new();
        while let Some(c) = self.peek_char() {
            if c == quote {
                // Doubled quote is an escaped quote
                if self.peek_char_at(1) == Some(quote) {
                    s.push(quote);
                    self.advance();
                    self.advance();
                } else {
                    break;
                }
            } else {
                s.push(c);
                self.advance();
            }
        }

        // Skip closing quote
        if self.peek_char() == Some(quote) {
            self.advance();
        }

        Token::String(s, quote)
    }

    fn scan_number(&mut self) -> Token {
        let start = self.pos;

        // Integer part
        while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
            self.advance();
        }

        // Decimal part
        if self.peek_char() == Some('.') {
            self.advance();
            while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        // Exponent part, only when digits follow
        if self.peek_char().map_or(false, |c| c == 'e' || c == 'E') {
            let sign = self
                .peek_char_at(1)
                .map_or(false, |c| c == '+' || c == '-');
            let digit_at = if sign { 2 } else { 1 };
            if self
                .peek_char_at(digit_at)
                .map_or(false, |c| c.is_ascii_digit())
            {
                for _ in 0..digit_at {
                    self.advance();
                }
                while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
                    self.advance();
                }
            }
        }

        let num_str = &self.input[start..self.pos];
        // The scanned text is always a valid float literal
        let num: f64 = num_str.parse().unwrap_or(0.0);
        Token::Number(num)
    }

    fn scan_identifier(&mut self) -> Token {
        let start = self.pos;
        while self
            .peek_char()
            .map_or(false, |c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.advance();
        }
        Token::Identifier(self.input[start..self.pos].to_string())
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
        while self.peek_char().map_or(false, |c| c.is_whitespace()) {
            self.advance();
        }
    }
}

/// Expression parser over a token list
struct FormulaParser<'t> {
    tokens: &'t [Spanned],
    index: usize,
    /// Open parentheses and pending unary signs
    depth: usize,
}

impl<'t> FormulaParser<'t> {
    fn new(tokens: &'t [Spanned]) -> Self {
        Self {
            tokens,
            index: 0,
            depth: 0,
        }
    }

    fn enter(&mut self) -> FormulaResult<()> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            return Err(FormulaError::InvalidOperationFormat(format!(
                "nesting deeper than {} levels",
                MAX_NESTING_DEPTH
            )));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn current_token(&self) -> &Token {
        self.tokens
            .get(self.index)
            .map_or(&Token::Eof, |t| &t.token)
    }

    fn consume(&mut self) -> Token {
        let token = self.current_token().clone();
        if self.index < self.tokens.len() {
            self.index += 1;
        }
        token
    }

    fn expect(&mut self, expected: &Token) -> FormulaResult<()> {
        if self.current_token() == expected {
            self.consume();
            Ok(())
        } else {
            Err(FormulaError::Parse(format!(
                "Expected {:?}, got {:?}",
                expected,
                self.current_token()
            )))
        }
    }

    // === Expression parsing with precedence ===
    // Precedence (lowest to highest):
    // 1. Addition/Subtraction: +, -
    // 2. Multiplication/Division: *, /
    // 3. Unary: -, +
    // 4. Primary: literals, function calls, parentheses

    fn parse_expression(&mut self) -> FormulaResult<FormulaExpr> {
        self.parse_additive()
    }

    fn parse_additive(&mut self) -> FormulaResult<FormulaExpr> {
        let first = self.parse_multiplicative()?;
        let mut rest = Vec::new();

        loop {
            let op = match self.current_token() {
                Token::Plus => BinaryOperator::Add,
                Token::Minus => BinaryOperator::Subtract,
                _ => break,
            };

            self.consume();
            rest.push((op, self.parse_multiplicative()?));
        }

        Ok(chain(first, rest))
    }

    fn parse_multiplicative(&mut self) -> FormulaResult<FormulaExpr> {
        let first = self.parse_unary()?;
        let mut rest = Vec::new();

        loop {
            let op = match self.current_token() {
                Token::Star => BinaryOperator::Multiply,
                Token::Slash => BinaryOperator::Divide,
                _ => break,
            };

            self.consume();
            rest.push((op, self.parse_unary()?));
        }

        Ok(chain(first, rest))
    }

    fn parse_unary(&mut self) -> FormulaResult<FormulaExpr> {
        let op = match self.current_token() {
            Token::Minus => UnaryOperator::Negate,
            Token::Plus => UnaryOperator::Plus,
            _ => return self.parse_primary(),
        };

        self.consume();
        self.enter()?;
        let operand = self.parse_unary()?;
        self.leave();
        Ok(FormulaExpr::UnaryOp {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_primary(&mut self) -> FormulaResult<FormulaExpr> {
        match self.consume() {
            Token::Number(n) => Ok(FormulaExpr::Number(n)),
            Token::String(s, _) => Ok(FormulaExpr::String(s)),
            Token::LeftParen => {
                self.enter()?;
                let expr = self.parse_expression()?;
                self.expect(&Token::RightParen)?;
                self.leave();
                Ok(expr)
            }
            Token::Identifier(name) => {
                if !matches!(self.current_token(), Token::LeftParen) {
                    return Err(FormulaError::Parse(format!("Unexpected identifier '{}'", name)));
                }
                self.consume();
                let args = self.parse_call_args()?;
                Ok(FormulaExpr::Function {
                    name: name.to_uppercase(),
                    args,
                })
            }
            token => Err(FormulaError::Parse(format!("Unexpected {:?}", token))),
        }
    }

    fn parse_call_args(&mut self) -> FormulaResult<Vec<CallArg>> {
        let mut args = Vec::new();

        if matches!(self.current_token(), Token::RightParen) {
            self.consume();
            return Ok(args);
        }

        loop {
            args.push(self.parse_literal()?);
            match self.consume() {
                Token::Comma => continue,
                Token::RightParen => return Ok(args),
                token => {
                    return Err(FormulaError::Parse(format!(
                        "Expected ',' or ')' in argument list, got {:?}",
                        token
                    )))
                }
            }
        }
    }

    fn parse_literal(&mut self) -> FormulaResult<CallArg> {
        match self.consume() {
            Token::Number(n) => Ok(CallArg::Number(n)),
            Token::String(s, _) => Ok(CallArg::String(s)),
            Token::Minus => match self.consume() {
                Token::Number(n) => Ok(CallArg::Number(-n)),
                token => Err(FormulaError::Parse(format!("Expected number, got {:?}", token))),
            },
            Token::Plus => match self.consume() {
                Token::Number(n) => Ok(CallArg::Number(n)),
                token => Err(FormulaError::Parse(format!("Expected number, got {:?}", token))),
            },
            token => Err(FormulaError::Parse(format!(
                "Expected literal argument, got {:?}",
                token
            ))),
        }
    }
}

fn chain(first: FormulaExpr, rest: Vec<(BinaryOperator, FormulaExpr)>) -> FormulaExpr {
    if rest.is_empty() {
        first
    } else {
        FormulaExpr::Chain {
            first: Box::new(first),
            rest,
        }
    }
}
