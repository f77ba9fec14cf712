//! Arithmetic evaluation for the calculator tool.
//!
//! Input is checked against a character whitelist and a fixed set of
//! function and constant names before anything is evaluated. Evaluation is
//! a recursive-descent parser over this grammar:
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/' | '%') unary)*
//! unary   := ('+' | '-') unary | power
//! power   := primary ('^' unary)?
//! primary := number | constant | function '(' expr ')' | '(' expr ')'
//! ```

use crate::error::{MultitoolError, Result};

const FUNCTIONS: &[&str] = &[
    "sin", "cos", "tan", "asin", "acos", "atan", "sinh", "cosh", "tanh", "sqrt", "exp", "ln",
    "log", "log10", "log2", "abs", "floor", "ceil", "round",
];

const CONSTANTS: &[(&str, f64)] = &[
    ("pi", std::f64::consts::PI),
    ("e", std::f64::consts::E),
    ("tau", std::f64::consts::TAU),
];

/// Deepest nesting of parentheses, functions and signs accepted.
const MAX_DEPTH: usize = 256;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Op(char),
    LParen,
    RParen,
}

fn invalid(message: impl Into<String>) -> MultitoolError {
    MultitoolError::InvalidExpression(message.into())
}

fn is_allowed(c: char) -> bool {
    c.is_ascii_digit()
        || c.is_ascii_alphabetic()
        || c.is_whitespace()
        || matches!(c, '.' | '+' | '-' | '*' | '/' | '(' | ')' | '^' | '%')
}

fn tokenize(expression: &str) -> Result<Vec<Token>> {
    if let Some(bad) = expression.chars().find(|c| !is_allowed(*c)) {
        return Err(invalid(format!("character '{}' is not allowed", bad)));
    }

    let chars: Vec<char> = expression.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
        } else if c.is_ascii_digit() || c == '.' {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            let literal: String = chars[start..i].iter().collect();
            let value = literal
                .parse::<f64>()
                .map_err(|_| invalid(format!("bad number '{}'", literal)))?;
            tokens.push(Token::Number(value));
        } else if c.is_ascii_alphabetic() {
            let start = i;
            while i < chars.len() && chars[i].is_ascii_alphanumeric() {
                i += 1;
            }
            let name = chars[start..i].iter().collect::<String>().to_lowercase();
            let known = FUNCTIONS.contains(&name.as_str())
                || CONSTANTS.iter().any(|(constant, _)| *constant == name);
            if !known {
                return Err(invalid(format!("unknown name '{}'", name)));
            }
            tokens.push(Token::Ident(name));
        } else if c == '(' {
            tokens.push(Token::LParen);
            i += 1;
        } else if c == ')' {
            tokens.push(Token::RParen);
            i += 1;
        } else {
            tokens.push(Token::Op(c));
            i += 1;
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn eat_op(&mut self, ops: &[char]) -> Option<char> {
        match self.peek() {
            Some(Token::Op(op)) if ops.contains(op) => {
                let op = *op;
                self.pos += 1;
                Some(op)
            }
            _ => None,
        }
    }

    fn expect_rparen(&mut self) -> Result<()> {
        match self.next() {
            Some(Token::RParen) => Ok(()),
            _ => Err(invalid("missing ')'")),
        }
    }

    fn expr(&mut self) -> Result<f64> {
        let mut value = self.term()?;
        while let Some(op) = self.eat_op(&['+', '-']) {
            let rhs = self.term()?;
            value = if op == '+' { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<f64> {
        let mut value = self.unary()?;
        while let Some(op) = self.eat_op(&['*', '/', '%']) {
            let rhs = self.unary()?;
            value = match op {
                '*' => value * rhs,
                _ if rhs == 0.0 => return Err(invalid("division by zero")),
                '/' => value / rhs,
                _ => value % rhs,
            };
        }
        Ok(value)
    }

    /// Every recursive path passes through here, so the depth bound lives here.
    fn unary(&mut self) -> Result<f64> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(invalid(format!("nested deeper than {} levels", MAX_DEPTH)));
        }
        let value = match self.eat_op(&['+', '-']) {
            Some('-') => self.unary().map(|v| -v),
            Some(_) => self.unary(),
            None => self.power(),
        };
        self.depth -= 1;
        value
    }

    fn power(&mut self) -> Result<f64> {
        let base = self.primary()?;
        if self.eat_op(&['^']).is_some() {
            let exponent = self.unary()?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<f64> {
        match self.next() {
            Some(Token::Number(value)) => Ok(value),
            Some(Token::LParen) => {
                let value = self.expr()?;
                self.expect_rparen()?;
                Ok(value)
            }
            Some(Token::Ident(name)) => {
                if let Some((_, value)) = CONSTANTS.iter().find(|(c, _)| *c == name) {
                    return Ok(*value);
                }
                match self.next() {
                    Some(Token::LParen) => {}
                    _ => return Err(invalid(format!("'{}' must be followed by '('", name))),
                }
                let argument = self.expr()?;
                self.expect_rparen()?;
                apply_function(&name, argument)
            }
            Some(Token::Op(op)) => Err(invalid(format!("unexpected '{}'", op))),
            Some(Token::RParen) => Err(invalid("unexpected ')'")),
            None => Err(invalid("unexpected end of expression")),
        }
    }
}

fn apply_function(name: &str, x: f64) -> Result<f64> {
    let value = match name {
        "sin" => x.sin(),
        "cos" => x.cos(),
        "tan" => x.tan(),
        "asin" => x.asin(),
        "acos" => x.acos(),
        "atan" => x.atan(),
        "sinh" => x.sinh(),
        "cosh" => x.cosh(),
        "tanh" => x.tanh(),
        "sqrt" => x.sqrt(),
        "exp" => x.exp(),
        "ln" | "log" => x.ln(),
        "log10" => x.log10(),
        "log2" => x.log2(),
        "abs" => x.abs(),
        "floor" => x.floor(),
        "ceil" => x.ceil(),
        "round" => x.round(),
        _ => return Err(invalid(format!("unknown function '{}'", name))),
    };
    Ok(value)
}

/// Evaluate an arithmetic expression.
pub fn evaluate(expression: &str) -> Result<f64> {
    let tokens = tokenize(expression)?;
    if tokens.is_empty() {
        return Err(invalid("empty expression"));
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;
    if let Some(token) = parser.peek() {
        return Err(invalid(format!("unexpected trailing input {:?}", token)));
    }
    if !value.is_finite() {
        return Err(invalid("result is not a finite number"));
    }
    Ok(value)
}

/// Format a result, dropping the fractional part of integral values.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        // Avoids printing "-0".
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Evaluate and format an expression for the calculator tool.
pub fn calculate(expression: &str) -> Result<String> {
    evaluate(expression).map(format_number)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(expression: &str) -> f64 {
        evaluate(expression).unwrap()
    }

    #[test]
    fn test_basic_arithmetic() {
        assert_eq!(calculate("2+2").unwrap(), "4");
        assert_eq!(calculate("7 / 2").unwrap(), "3.5");
        assert_eq!(eval("2 + 3 * 4"), 14.0);
        assert_eq!(eval("(2 + 3) * 4"), 20.0);
        assert_eq!(eval("10 % 4"), 2.0);
        assert_eq!(eval("8 - 3 - 2"), 3.0);
    }

    #[test]
    fn test_power_is_right_associative() {
        assert_eq!(eval("2^3^2"), 512.0);
        assert_eq!(eval("-2^2"), -4.0);
        assert_eq!(eval("2^-1"), 0.5);
    }

    #[test]
    fn test_functions_and_constants() {
        assert!((eval("sin(pi/2)") - 1.0).abs() < 1e-12);
        assert_eq!(eval("sqrt(16) + abs(-2)"), 6.0);
        assert_eq!(eval("log10(1000)"), 3.0);
        assert!((eval("ln(e)") - 1.0).abs() < 1e-12);
        assert_eq!(calculate("SQRT(9)").unwrap(), "3");
    }

    #[test]
    fn test_rejects_non_whitelisted_input() {
        for expression in ["import os", "__import__('os')", "2; 3", "x + 1", "open(1)", "2 ** [3]"] {
            assert!(
                matches!(evaluate(expression), Err(MultitoolError::InvalidExpression(_))),
                "{} should be rejected",
                expression
            );
        }
    }

    #[test]
    fn test_invalid_results() {
        assert!(evaluate("1/0").is_err());
        assert!(evaluate("5 % 0").is_err());
        assert!(evaluate("sqrt(-1)").is_err());
        assert!(evaluate("").is_err());
        assert!(evaluate("(1 + 2").is_err());
        assert!(evaluate("1 2").is_err());
        assert!(evaluate("sin 1").is_err());
    }

    #[test]
    fn test_deep_nesting_is_rejected_without_overflow() {
        // Same stack size as a tokio worker thread.
        let handle = std::thread::Builder::new()
            .stack_size(2 * 1024 * 1024)
            .spawn(|| {
                let parens = format!("{}1{}", "(".repeat(200_000), ")".repeat(200_000));
                let signs = format!("{}1", "-".repeat(200_000));
                (evaluate(&parens), evaluate(&signs))
            })
            .unwrap();

        let (parens, signs) = handle.join().unwrap();
        assert!(matches!(parens, Err(MultitoolError::InvalidExpression(_))));
        assert!(matches!(signs, Err(MultitoolError::InvalidExpression(_))));

        let nested = format!("{}7{}", "(".repeat(100), ")".repeat(100));
        assert_eq!(eval(&nested), 7.0);
        assert_eq!(eval("--3"), 3.0);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(4.0), "4");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(0.25), "0.25");
    }
}
