//! Formula parser.
//!
//! Supports:
//! - Numbers (integers, floats, scientific notation)
//! - Symbols (any identifier that is not followed by a call)
//! - Arithmetic operators (+, -, *, /) and powers (`**` or `^`)
//! - Parentheses for grouping
//! - Single-argument built-in functions (see [`Function`])
//!
//! Precedence follows the usual mathematical convention: `-a**2` is `-(a**2)`
//! and powers are right associative.

use super::{BinaryOperator, Expr, Function, UnaryOperator};

/// Parse error with location info
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "parse error at position {}: {}", self.position, self.message)
    }
}

impl std::error::Error for ParseError {}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Identifier(String),
    Plus,
    Minus,
    Star,
    DoubleStar,
    Slash,
    Caret,
    LParen,
    RParen,
    Eof,
}

struct Lexer {
    chars: Vec<char>,
    position: usize,
}

impl Lexer {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            position: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.position).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.position + offset).copied()
    }

    fn next_token(&mut self) -> Result<(Token, usize), ParseError> {
        while self.peek().is_some_and(char::is_whitespace) {
            self.position += 1;
        }

        let start = self.position;
        let Some(c) = self.peek() else {
            return Ok((Token::Eof, start));
        };

        let token = match c {
            '+' => self.single(Token::Plus),
            '-' => self.single(Token::Minus),
            '/' => self.single(Token::Slash),
            '^' => self.single(Token::Caret),
            '(' => self.single(Token::LParen),
            ')' => self.single(Token::RParen),
            '*' => {
                if self.peek_at(1) == Some('*') {
                    self.position += 2;
                    Token::DoubleStar
                } else {
                    self.single(Token::Star)
                }
            }
            c if c.is_ascii_digit() || c == '.' => self.read_number()?,
            c if c.is_alphabetic() || c == '_' => Token::Identifier(self.read_identifier()),
            _ => {
                return Err(ParseError {
                    message: format!("unexpected character '{}'", c),
                    position: start,
                })
            }
        };

        Ok((token, start))
    }

    fn single(&mut self, token: Token) -> Token {
        self.position += 1;
        token
    }

    fn read_number(&mut self) -> Result<Token, ParseError> {
        let start = self.position;
        let mut has_dot = false;

        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                self.position += 1;
            } else if c == '.' && !has_dot {
                has_dot = true;
                self.position += 1;
            } else {
                break;
            }
        }

        // An exponent needs digits; a bare `e` is left for the next token
        if matches!(self.peek(), Some('e' | 'E')) {
            let digits_at = match self.peek_at(1) {
                Some('+' | '-') => 2,
                _ => 1,
            };
            if self.peek_at(digits_at).is_some_and(|c| c.is_ascii_digit()) {
                self.position += digits_at;
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.position += 1;
                }
            }
        }

        let text: String = self.chars[start..self.position].iter().collect();
        text.parse::<f64>().map(Token::Number).map_err(|_| ParseError {
            message: format!("invalid number '{}'", text),
            position: start,
        })
    }

    fn read_identifier(&mut self) -> String {
        let start = self.position;
        while self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_') {
            self.position += 1;
        }
        self.chars[start..self.position].iter().collect()
    }
}

struct Parser {
    lexer: Lexer,
    current: Token,
    current_position: usize,
}

impl Parser {
    fn new(input: &str) -> Result<Self, ParseError> {
        let mut lexer = Lexer::new(input);
        let (current, current_position) = lexer.next_token()?;
        Ok(Self {
            lexer,
            current,
            current_position,
        })
    }

    fn advance(&mut self) -> Result<(), ParseError> {
        let (token, position) = self.lexer.next_token()?;
        self.current = token;
        self.current_position = position;
        Ok(())
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            message: message.into(),
            position: self.current_position,
        }
    }

    fn parse(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_additive()?;
        if self.current != Token::Eof {
            return Err(self.error(format!(
                "unexpected token after expression: {:?}",
                self.current
            )));
        }
        Ok(expr)
    }

    // Additive: multiplicative (('+' | '-') multiplicative)*
    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match &self.current {
                Token::Plus => BinaryOperator::Add,
                Token::Minus => BinaryOperator::Sub,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_multiplicative()?;
            left = Expr::binary(op, left, right);
        }

        Ok(left)
    }

    // Multiplicative: unary (('*' | '/') unary)*
    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;

        loop {
            let op = match &self.current {
                Token::Star => BinaryOperator::Mul,
                Token::Slash => BinaryOperator::Div,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_unary()?;
            left = Expr::binary(op, left, right);
        }

        Ok(left)
    }

    // Unary: ('-' | '+') unary | power
    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        match self.current {
            Token::Minus => {
                self.advance()?;
                let operand = self.parse_unary()?;
                Ok(Expr::UnaryOp {
                    op: UnaryOperator::Neg,
                    operand: Box::new(operand),
                })
            }
            Token::Plus => {
                self.advance()?;
                self.parse_unary()
            }
            _ => self.parse_power(),
        }
    }

    // Power: primary (('**' | '^') unary)?  (right associative)
    fn parse_power(&mut self) -> Result<Expr, ParseError> {
        let base = self.parse_primary()?;

        if matches!(self.current, Token::DoubleStar | Token::Caret) {
            self.advance()?;
            let exponent = self.parse_unary()?;
            Ok(Expr::pow(base, exponent))
        } else {
            Ok(base)
        }
    }

    // Primary: number | symbol | function '(' additive ')' | '(' additive ')'
    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        match &self.current {
            Token::Number(n) => {
                let value = *n;
                self.advance()?;
                Ok(Expr::Number(value))
            }
            Token::Identifier(name) => {
                let name = name.clone();
                let name_position = self.current_position;
                self.advance()?;

                if self.current != Token::LParen {
                    return Ok(Expr::Symbol(name));
                }

                let function = Function::from_name(&name).ok_or_else(|| ParseError {
                    message: format!("unknown function '{}'", name),
                    position: name_position,
                })?;
                self.advance()?; // consume '('
                let arg = self.parse_additive()?;
                if self.current != Token::RParen {
                    return Err(self.error(format!("expected ')' after argument of '{}'", name)));
                }
                self.advance()?; // consume ')'
                Ok(Expr::call(function, arg))
            }
            Token::LParen => {
                self.advance()?;
                let expr = self.parse_additive()?;
                if self.current != Token::RParen {
                    return Err(self.error("expected ')'"));
                }
                self.advance()?;
                Ok(expr)
            }
            _ => Err(self.error(format!("unexpected token: {:?}", self.current))),
        }
    }
}

/// Parse a formula string into an expression tree
pub fn parse_expression(input: &str) -> Result<Expr, ParseError> {
    if input.trim().is_empty() {
        return Err(ParseError {
            message: "empty formula".to_string(),
            position: 0,
        });
    }
    let mut parser = Parser::new(input)?;
    parser.parse()
}

#[cfg(test)]
mod parser_tests {
    use super::*;

    #[test]
    fn test_parse_simple_number() {
        let expr = parse_expression("42").unwrap();
        assert_eq!(expr, Expr::Number(42.0));
    }

    #[test]
    fn test_parse_scientific_notation() {
        let expr = parse_expression("1.5e-3").unwrap();
        if let Expr::Number(n) = expr {
            assert!((n - 0.0015).abs() < 1e-12);
        } else {
            panic!("Expected number");
        }
    }

    #[test]
    fn test_parse_symbol() {
        let expr = parse_expression("thickness").unwrap();
        assert_eq!(expr, Expr::symbol("thickness"));
    }

    #[test]
    fn test_clashing_names_are_symbols() {
        assert_eq!(parse_expression("E").unwrap(), Expr::symbol("E"));
        assert_eq!(parse_expression("pi").unwrap(), Expr::symbol("pi"));
    }

    #[test]
    fn test_parse_precedence() {
        // a + b * c should parse as a + (b * c)
        let expr = parse_expression("a + b * c").unwrap();
        let expected = Expr::add(
            Expr::symbol("a"),
            Expr::mul(Expr::symbol("b"), Expr::symbol("c")),
        );
        assert_eq!(expr, expected);
    }

    #[test]
    fn test_parse_both_power_spellings() {
        let expected = Expr::pow(Expr::symbol("a"), Expr::number(2.0));
        assert_eq!(parse_expression("a**2").unwrap(), expected);
        assert_eq!(parse_expression("a^2").unwrap(), expected);
    }

    #[test]
    fn test_power_is_right_associative() {
        let expr = parse_expression("a**b**c").unwrap();
        let expected = Expr::pow(
            Expr::symbol("a"),
            Expr::pow(Expr::symbol("b"), Expr::symbol("c")),
        );
        assert_eq!(expr, expected);
    }

    #[test]
    fn test_negation_binds_looser_than_power() {
        let expr = parse_expression("-a**2").unwrap();
        let expected = Expr::neg(Expr::pow(Expr::symbol("a"), Expr::number(2.0)));
        assert_eq!(expr, expected);
    }

    #[test]
    fn test_negative_exponent() {
        let expr = parse_expression("2**-x").unwrap();
        let expected = Expr::pow(Expr::number(2.0), Expr::neg(Expr::symbol("x")));
        assert_eq!(expr, expected);
    }

    #[test]
    fn test_parse_function() {
        let expr = parse_expression("sqrt(a + 1)").unwrap();
        let expected = Expr::call(
            Function::Sqrt,
            Expr::add(Expr::symbol("a"), Expr::number(1.0)),
        );
        assert_eq!(expr, expected);
    }

    #[test]
    fn test_log_is_natural_logarithm() {
        let expr = parse_expression("log(x)").unwrap();
        assert_eq!(expr, Expr::call(Function::Ln, Expr::symbol("x")));
    }

    #[test]
    fn test_parse_empty_error() {
        assert!(parse_expression("   ").is_err());
    }

    #[test]
    fn test_parse_invalid_character() {
        let err = parse_expression("a $ b").unwrap_err();
        assert_eq!(err.position, 2);
    }

    #[test]
    fn test_parse_missing_paren_error() {
        assert!(parse_expression("(a + b").is_err());
    }

    #[test]
    fn test_unknown_function_error() {
        let err = parse_expression("a + mystery(b)").unwrap_err();
        assert!(err.message.contains("mystery"));
        assert_eq!(err.position, 4);
    }

    #[test]
    fn test_trailing_tokens_error() {
        assert!(parse_expression("a b").is_err());
    }
}
