//! Formula validation
//!
//! A whitelist gate run on the raw formula text before any substitution.
//! Passing validation does not mean evaluation will succeed: circular
//! references and non-numeric arguments are only found later.

use hoja_core::Coord;

use crate::error::{FormulaError, FormulaResult};
use crate::functions::FunctionRegistry;
use crate::number::is_number_literal;
use crate::parser::{tokenize, Spanned, Token};

/// Validate a formula against the built-in function whitelist
///
/// # Example
/// ```rust
/// use hoja_core::CellError;
/// use hoja_formula::validate_expression;
///
/// assert!(validate_expression("=SUM(A1:A3, 2)").is_ok());
/// assert_eq!(
///     validate_expression("=SUM(A2,").unwrap_err().code(),
///     CellError::InvalidOperationFormat
/// );
/// ```
pub fn validate_expression(value: &str) -> FormulaResult<()> {
    validate_expression_with(value, &FunctionRegistry::new())
}

/// Validate a formula against the names in `functions`
///
/// Checks run in a fixed order and the first failing check wins:
/// leading `=`, empty body, dangling operator or unbalanced parentheses,
/// unknown function names, malformed arguments, ranges outside calls.
pub fn validate_expression_with(value: &str, functions: &FunctionRegistry) -> FormulaResult<()> {
    let body = value
        .strip_prefix('=')
        .ok_or(FormulaError::MustStartWithEqual)?
        .trim();

    if body.is_empty() {
        return Err(FormulaError::EmptyExpression);
    }

    if let Some(last) = body.chars().last() {
        if matches!(last, '+' | '-' | '*' | '/' | ',' | ';') {
            return Err(FormulaError::InvalidOperationFormat(format!(
                "expression ends with '{}'",
                last
            )));
        }
    }

    let structure = Structure::scan(body)?;

    for call in &structure.calls {
        if !functions.contains(&call.name) {
            return Err(FormulaError::InvalidFunctionName(call.name.to_uppercase()));
        }
    }

    for call in &structure.calls {
        call.check_arguments(body)?;
    }

    if let Some(range) = structure.loose_ranges.first() {
        return Err(FormulaError::RangeOutsideFunction(range.clone()));
    }

    Ok(())
}

/// What an argument token run can be
#[derive(Debug, Clone, Copy, PartialEq)]
enum Item {
    CellId,
    Range,
    Number,
    DoubleQuoted,
    Minus,
    /// Anything else: operators, single-quoted text, nested calls, words
    Other,
}

/// One call found in the formula
#[derive(Debug)]
struct Call {
    name: String,
    /// Byte offset of the name
    start: usize,
    /// Each argument's items and byte span
    args: Vec<(Vec<Item>, usize, usize)>,
}

impl Call {
    fn check_arguments(&self, body: &str) -> FormulaResult<()> {
        // `NAME()` is left for the function to reject
        if self.args.len() == 1 && self.args[0].0.is_empty() {
            return Ok(());
        }

        for (items, start, end) in &self.args {
            let valid = matches!(
                items.as_slice(),
                [Item::CellId] | [Item::Range] | [Item::Number] | [Item::DoubleQuoted]
                    | [Item::Minus, Item::Number]
            );
            if !valid {
                return Err(FormulaError::InvalidArguments {
                    function: self.name.to_uppercase(),
                    argument: body[*start..*end].trim().to_string(),
                });
            }
        }
        Ok(())
    }
}

/// An open parenthesis: a call, or plain grouping
struct Frame {
    call: Option<Call>,
    /// Items of the argument being read
    current: Vec<Item>,
    arg_start: usize,
}

impl Frame {
    fn end_argument(&mut self, end: usize, next_start: usize) {
        let items = std::mem::take(&mut self.current);
        if let Some(call) = self.call.as_mut() {
            call.args.push((items, self.arg_start, end));
        }
        self.arg_start = next_start;
    }
}

/// Calls and stray ranges of a formula body
struct Structure {
    calls: Vec<Call>,
    loose_ranges: Vec<String>,
}

impl Structure {
    fn scan(body: &str) -> FormulaResult<Self> {
        let tokens = tokenize(body);
        let mut calls = Vec::new();
        let mut loose_ranges = Vec::new();
        let mut stack: Vec<Frame> = Vec::new();
        let mut i = 0;

        while i < tokens.len() {
            let Spanned { token, start, end } = &tokens[i];
            let next = tokens.get(i + 1).map(|t| &t.token);

            let item = match token {
                Token::Eof => break,
                Token::Identifier(name) if next == Some(&Token::LeftParen) => {
                    stack.push(Frame {
                        call: Some(Call {
                            name: name.clone(),
                            start: *start,
                            args: Vec::new(),
                        }),
                        current: Vec::new(),
                        arg_start: tokens[i + 1].end,
                    });
                    i += 2;
                    continue;
                }
                Token::Identifier(first) => match range_at(&tokens, i) {
                    Some((text, consumed)) => {
                        if !stack.iter().any(|f| f.call.is_some()) {
                            loose_ranges.push(text);
                        }
                        i += consumed;
                        push_item(&mut stack, Item::Range);
                        continue;
                    }
                    None if Coord::from_id(first).is_ok() => Item::CellId,
                    None => Item::Other,
                },
                Token::Number(_) if is_number_literal(&body[*start..*end]) => Item::Number,
                Token::String(_, '"') => Item::DoubleQuoted,
                Token::Minus => Item::Minus,
                Token::LeftParen => {
                    stack.push(Frame {
                        call: None,
                        current: Vec::new(),
                        arg_start: *end,
                    });
                    i += 1;
                    continue;
                }
                Token::RightParen => {
                    let mut frame = stack.pop().ok_or_else(|| {
                        FormulaError::InvalidOperationFormat("unbalanced ')'".into())
                    })?;
                    frame.end_argument(*start, *end);
                    if let Some(call) = frame.call {
                        calls.push(call);
                    }
                    // A closed group is a single opaque item to its parent
                    Item::Other
                }
                Token::Comma | Token::Semicolon => {
                    if let Some(frame) = stack.last_mut() {
                        if frame.call.is_some() {
                            frame.end_argument(*start, *end);
                            i += 1;
                            continue;
                        }
                    }
                    Item::Other
                }
                _ => Item::Other,
            };

            push_item(&mut stack, item);
            i += 1;
        }

        if !stack.is_empty() {
            return Err(FormulaError::InvalidOperationFormat(
                "unbalanced '('".into(),
            ));
        }

        // Calls are collected as they close; report them in order of appearance
        calls.sort_by_key(|c| c.start);

        Ok(Self {
            calls,
            loose_ranges,
        })
    }
}

fn push_item(stack: &mut [Frame], item: Item) {
    if let Some(frame) = stack.last_mut() {
        frame.current.push(item);
    }
}

/// `ID ':' ID` starting at token `i`, with its text and token count
fn range_at(tokens: &[Spanned], i: usize) -> Option<(String, usize)> {
    let (Token::Identifier(first), Some(Token::Colon), Some(Token::Identifier(second))) = (
        &tokens[i].token,
        tokens.get(i + 1).map(|t| &t.token),
        tokens.get(i + 2).map(|t| &t.token),
    ) else {
        return None;
    };
    // Corners must be adjacent to the colon
    if tokens[i].end != tokens[i + 1].start || tokens[i + 1].end != tokens[i + 2].start {
        return None;
    }
    Coord::from_id(first).ok()?;
    Coord::from_id(second).ok()?;
    Some((format!("{}:{}", first, second), 3))
}
