//! Evaluator for the boolean formula subset the synthesizer emits.
//!
//! Operators from loosest to tightest: `|` (or), `+` (xor), `&` (and),
//! postfix `'` (not). Atoms are `0`, `1`, identifiers, calls and
//! parenthesized expressions.

use std::collections::HashMap;
use thiserror::Error;

const MAX_DEPTH: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormulaError {
    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("undefined function {0}")]
    Undefined(String),

    #[error("{name} expects {expected} arguments, got {found}")]
    Arity {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("recursion limit exceeded while evaluating {0}")]
    TooDeep(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Const(bool),
    LParen,
    RParen,
    Comma,
    Quote,
    And,
    Xor,
    Or,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Const(bool),
    Var(String),
    Call(String, Vec<Expr>),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Xor(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone)]
struct Definition {
    params: Vec<String>,
    body: Expr,
}

fn tokenize(text: &str) -> Result<Vec<Token>, FormulaError> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '0' | '1' => {
                chars.next();
                if chars.peek().is_some_and(|next| next.is_ascii_alphanumeric()) {
                    return Err(FormulaError::Syntax(format!("malformed constant in {text:?}")));
                }
                tokens.push(Token::Const(c == '1'));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        ident.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(ident));
            }
            _ => {
                chars.next();
                tokens.push(match c {
                    '(' => Token::LParen,
                    ')' => Token::RParen,
                    ',' => Token::Comma,
                    '\'' => Token::Quote,
                    '&' => Token::And,
                    '+' => Token::Xor,
                    '|' => Token::Or,
                    other => {
                        return Err(FormulaError::Syntax(format!("unexpected character {other:?}")))
                    }
                });
            }
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(text: &str) -> Result<Self, FormulaError> {
        Ok(Self { tokens: tokenize(text)?, pos: 0 })
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token) -> Result<(), FormulaError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(FormulaError::Syntax(format!("expected {token:?}, found {:?}", self.peek())))
        }
    }

    fn finish(&self) -> Result<(), FormulaError> {
        match self.peek() {
            None => Ok(()),
            Some(token) => Err(FormulaError::Syntax(format!("trailing {token:?}"))),
        }
    }

    fn ident(&mut self) -> Result<String, FormulaError> {
        match self.tokens.get(self.pos).cloned() {
            Some(Token::Ident(name)) => {
                self.pos += 1;
                Ok(name)
            }
            other => Err(FormulaError::Syntax(format!("expected identifier, found {other:?}"))),
        }
    }

    fn or(&mut self) -> Result<Expr, FormulaError> {
        let mut left = self.xor()?;
        while self.eat(&Token::Or) {
            left = Expr::Or(Box::new(left), Box::new(self.xor()?));
        }
        Ok(left)
    }

    fn xor(&mut self) -> Result<Expr, FormulaError> {
        let mut left = self.and()?;
        while self.eat(&Token::Xor) {
            left = Expr::Xor(Box::new(left), Box::new(self.and()?));
        }
        Ok(left)
    }

    fn and(&mut self) -> Result<Expr, FormulaError> {
        let mut left = self.postfix()?;
        while self.eat(&Token::And) {
            left = Expr::And(Box::new(left), Box::new(self.postfix()?));
        }
        Ok(left)
    }

    fn postfix(&mut self) -> Result<Expr, FormulaError> {
        let mut expr = self.atom()?;
        while self.eat(&Token::Quote) {
            expr = Expr::Not(Box::new(expr));
        }
        Ok(expr)
    }

    fn atom(&mut self) -> Result<Expr, FormulaError> {
        match self.tokens.get(self.pos).cloned() {
            Some(Token::Const(value)) => {
                self.pos += 1;
                Ok(Expr::Const(value))
            }
            Some(Token::LParen) => {
                self.pos += 1;
                let inner = self.or()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Ident(name)) => {
                self.pos += 1;
                if !self.eat(&Token::LParen) {
                    return Ok(Expr::Var(name));
                }
                let mut args = Vec::new();
                if !self.eat(&Token::RParen) {
                    loop {
                        args.push(self.or()?);
                        if self.eat(&Token::RParen) {
                            break;
                        }
                        self.expect(&Token::Comma)?;
                    }
                }
                Ok(Expr::Call(name, args))
            }
            other => Err(FormulaError::Syntax(format!("unexpected {other:?}"))),
        }
    }
}

/// Parses a standalone expression.
pub fn parse_expr(text: &str) -> Result<Expr, FormulaError> {
    let mut parser = Parser::new(text)?;
    let expr = parser.or()?;
    parser.finish()?;
    Ok(expr)
}

/// Function definitions plus a memo of evaluated calls.
#[derive(Debug, Default)]
pub struct Interpreter {
    definitions: HashMap<String, Definition>,
    memo: HashMap<(String, Vec<bool>), bool>,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `name(params) := body`, returning the defined name.
    pub fn define(&mut self, line: &str) -> Result<String, FormulaError> {
        let (head, body) = line
            .split_once(":=")
            .ok_or_else(|| FormulaError::Syntax("missing ':='".to_string()))?;

        let mut parser = Parser::new(head)?;
        let name = parser.ident()?;
        let mut params = Vec::new();
        if parser.eat(&Token::LParen) && !parser.eat(&Token::RParen) {
            loop {
                params.push(parser.ident()?);
                if parser.eat(&Token::RParen) {
                    break;
                }
                parser.expect(&Token::Comma)?;
            }
        }
        parser.finish()?;

        let body = parse_expr(body)?;
        self.definitions.insert(name.clone(), Definition { params, body });
        self.memo.clear();
        Ok(name)
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    pub fn evaluate(&mut self, text: &str) -> Result<bool, FormulaError> {
        let expr = parse_expr(text)?;
        let scope = HashMap::new();
        eval(&self.definitions, &mut self.memo, &expr, &scope, 0)
    }
}

fn eval(
    definitions: &HashMap<String, Definition>,
    memo: &mut HashMap<(String, Vec<bool>), bool>,
    expr: &Expr,
    scope: &HashMap<String, bool>,
    depth: usize,
) -> Result<bool, FormulaError> {
    Ok(match expr {
        Expr::Const(value) => *value,
        Expr::Var(name) => match scope.get(name) {
            Some(value) => *value,
            // Free variables such as the time argument `x` carry no value.
            None if definitions.contains_key(name) => {
                return call(definitions, memo, name, Vec::new(), depth)
            }
            None => false,
        },
        Expr::Call(name, args) => {
            let args = args
                .iter()
                .map(|arg| eval(definitions, memo, arg, scope, depth))
                .collect::<Result<Vec<_>, _>>()?;
            return call(definitions, memo, name, args, depth);
        }
        Expr::Not(inner) => !eval(definitions, memo, inner, scope, depth)?,
        Expr::And(l, r) => {
            eval(definitions, memo, l, scope, depth)? & eval(definitions, memo, r, scope, depth)?
        }
        Expr::Xor(l, r) => {
            eval(definitions, memo, l, scope, depth)? ^ eval(definitions, memo, r, scope, depth)?
        }
        Expr::Or(l, r) => {
            eval(definitions, memo, l, scope, depth)? | eval(definitions, memo, r, scope, depth)?
        }
    })
}

fn call(
    definitions: &HashMap<String, Definition>,
    memo: &mut HashMap<(String, Vec<bool>), bool>,
    name: &str,
    args: Vec<bool>,
    depth: usize,
) -> Result<bool, FormulaError> {
    if depth >= MAX_DEPTH {
        return Err(FormulaError::TooDeep(name.to_string()));
    }
    let definition = definitions
        .get(name)
        .ok_or_else(|| FormulaError::Undefined(name.to_string()))?;
    if definition.params.len() != args.len() {
        return Err(FormulaError::Arity {
            name: name.to_string(),
            expected: definition.params.len(),
            found: args.len(),
        });
    }

    let key = (name.to_string(), args);
    if let Some(value) = memo.get(&key) {
        return Ok(*value);
    }
    let scope: HashMap<String, bool> = definition
        .params
        .iter()
        .cloned()
        .zip(key.1.iter().copied())
        .collect();
    let value = eval(definitions, memo, &definition.body, &scope, depth + 1)?;
    memo.insert(key, value);
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence() {
        let mut interp = Interpreter::new();
        // & binds tighter than +, which binds tighter than |
        assert!(interp.evaluate("1 | 0 + 1 & 0").unwrap());
        assert!(!interp.evaluate("(1 | 0) + 1").unwrap());
        assert!(interp.evaluate("1 + 1 & 0").unwrap());
        assert!(!interp.evaluate("1'").unwrap());
        assert!(interp.evaluate("(0 & 1)'").unwrap());
    }

    #[test]
    fn test_definitions_with_arguments() {
        let mut interp = Interpreter::new();
        interp.define("a1(x) := 1").unwrap();
        interp.define("b1(x) := 0").unwrap();
        interp.define("fullAdderCarry(a, b, c) := (a & b) | (c & (a + b))").unwrap();
        interp.define("c(x) := fullAdderCarry(a1(x), 1, b1(x))").unwrap();
        assert!(interp.evaluate("c(x)").unwrap());
        assert!(interp.is_defined("fullAdderCarry"));
    }

    #[test]
    fn test_redefinition_clears_memo() {
        let mut interp = Interpreter::new();
        interp.define("v(x) := 1").unwrap();
        assert!(interp.evaluate("v(x)").unwrap());
        interp.define("v(x) := 0").unwrap();
        assert!(!interp.evaluate("v(x)").unwrap());
    }

    #[test]
    fn test_errors() {
        let mut interp = Interpreter::new();
        assert!(matches!(interp.evaluate("nope(x)"), Err(FormulaError::Undefined(_))));
        assert!(matches!(interp.evaluate("1 &"), Err(FormulaError::Syntax(_))));
        assert!(matches!(interp.define("f(x) 1"), Err(FormulaError::Syntax(_))));

        interp.define("f(a, b) := a & b").unwrap();
        assert!(matches!(interp.evaluate("f(1)"), Err(FormulaError::Arity { .. })));

        interp.define("loop(x) := loop(x)'").unwrap();
        assert!(matches!(interp.evaluate("loop(x)"), Err(FormulaError::TooDeep(_))));
    }
}
