//! Single-expression evaluator for `set_data`, `if` and trigger guards.
//!
//! Supported syntax, lowest to highest precedence:
//!
//! - `a || b`, `a && b`
//! - `==`, `!=`, `<`, `<=`, `>`, `>=` (non-associative)
//! - `+`, `-` (`+` concatenates when either side is text)
//! - `*`, `/`, `%`
//! - unary `!` and `-`
//! - number and `"text"`/`'text'` literals, `true`, `false`, parentheses
//! - variable paths such as `f.hp` or `g.score`
//!
//! A bare identifier without a dot that resolves to nothing evaluates to its
//! own name as text, so `value=idle` works without quotes. A dotted path that
//! resolves to nothing is an [`ExprError::UndefinedVariable`].

use crate::script::error::ExprError;
use crate::script::value::Value;

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Num(f64),
    Str(String),
    Ident(String),
    Op(&'static str),
    LParen,
    RParen,
}

impl Tok {
    fn describe(&self) -> String {
        match self {
            Tok::Num(n) => n.to_string(),
            Tok::Str(s) => format!("\"{}\"", s),
            Tok::Ident(s) => s.clone(),
            Tok::Op(op) => (*op).to_string(),
            Tok::LParen => "(".into(),
            Tok::RParen => ")".into(),
        }
    }
}

const OPERATORS: &[&str] = &[
    "||", "&&", "==", "!=", "<=", ">=", "<", ">", "+", "-", "*", "/", "%", "!",
];

fn lex(src: &str) -> Result<Vec<Tok>, ExprError> {
    let mut toks = Vec::new();
    let bytes = src.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let c = src[i..].chars().next().ok_or(ExprError::UnexpectedEnd)?;
        if c.is_whitespace() {
            i += c.len_utf8();
            continue;
        }
        if c.is_ascii_digit() || (c == '.' && bytes.get(i + 1).is_some_and(u8::is_ascii_digit)) {
            let start = i;
            while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
                i += 1;
            }
            let text = &src[start..i];
            let n = text
                .parse::<f64>()
                .map_err(|_| ExprError::UnexpectedToken(text.to_string()))?;
            toks.push(Tok::Num(n));
            continue;
        }
        if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < bytes.len() {
                let ch = src[i..].chars().next().ok_or(ExprError::UnexpectedEnd)?;
                if ch.is_alphanumeric() || ch == '_' || ch == '.' {
                    i += ch.len_utf8();
                } else {
                    break;
                }
            }
            toks.push(Tok::Ident(src[start..i].to_string()));
            continue;
        }
        if c == '"' || c == '\'' {
            i += 1;
            let mut s = String::new();
            let mut closed = false;
            while i < bytes.len() {
                let ch = src[i..].chars().next().ok_or(ExprError::UnexpectedEnd)?;
                i += ch.len_utf8();
                if ch == c {
                    closed = true;
                    break;
                }
                s.push(ch);
            }
            if !closed {
                return Err(ExprError::UnterminatedString);
            }
            toks.push(Tok::Str(s));
            continue;
        }
        if c == '(' {
            toks.push(Tok::LParen);
            i += 1;
            continue;
        }
        if c == ')' {
            toks.push(Tok::RParen);
            i += 1;
            continue;
        }
        match OPERATORS.iter().find(|op| src[i..].starts_with(**op)) {
            Some(op) => {
                toks.push(Tok::Op(op));
                i += op.len();
            }
            None => return Err(ExprError::UnexpectedChar(c)),
        }
    }
    Ok(toks)
}

/// Parsed expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Var(String),
    Not(Box<Expr>),
    Neg(Box<Expr>),
    Binary(&'static str, Box<Expr>, Box<Expr>),
}

struct Parser {
    toks: Vec<Tok>,
    pos: usize,
}

impl Parser {
    fn peek_op(&self) -> Option<&'static str> {
        match self.toks.get(self.pos) {
            Some(Tok::Op(op)) => Some(op),
            _ => None,
        }
    }

    fn binary_level(
        &mut self,
        ops: &[&str],
        next: fn(&mut Parser) -> Result<Expr, ExprError>,
    ) -> Result<Expr, ExprError> {
        let mut lhs = next(self)?;
        while let Some(op) = self.peek_op().filter(|op| ops.contains(op)) {
            self.pos += 1;
            let rhs = next(self)?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn or(&mut self) -> Result<Expr, ExprError> {
        self.binary_level(&["||"], Parser::and)
    }

    fn and(&mut self) -> Result<Expr, ExprError> {
        self.binary_level(&["&&"], Parser::comparison)
    }

    fn comparison(&mut self) -> Result<Expr, ExprError> {
        let lhs = self.additive()?;
        match self
            .peek_op()
            .filter(|op| ["==", "!=", "<", "<=", ">", ">="].contains(op))
        {
            Some(op) => {
                self.pos += 1;
                let rhs = self.additive()?;
                Ok(Expr::Binary(op, Box::new(lhs), Box::new(rhs)))
            }
            None => Ok(lhs),
        }
    }

    fn additive(&mut self) -> Result<Expr, ExprError> {
        self.binary_level(&["+", "-"], Parser::multiplicative)
    }

    fn multiplicative(&mut self) -> Result<Expr, ExprError> {
        self.binary_level(&["*", "/", "%"], Parser::unary)
    }

    fn unary(&mut self) -> Result<Expr, ExprError> {
        match self.peek_op() {
            Some("!") => {
                self.pos += 1;
                Ok(Expr::Not(Box::new(self.unary()?)))
            }
            Some("-") => {
                self.pos += 1;
                Ok(Expr::Neg(Box::new(self.unary()?)))
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Expr, ExprError> {
        let tok = self.toks.get(self.pos).cloned().ok_or(ExprError::UnexpectedEnd)?;
        self.pos += 1;
        match tok {
            Tok::Num(n) => Ok(Expr::Literal(Value::Number(n))),
            Tok::Str(s) => Ok(Expr::Literal(Value::Text(s))),
            Tok::Ident(name) => Ok(match name.as_str() {
                "true" => Expr::Literal(Value::Bool(true)),
                "false" => Expr::Literal(Value::Bool(false)),
                _ => Expr::Var(name),
            }),
            Tok::LParen => {
                let inner = self.or()?;
                match self.toks.get(self.pos) {
                    Some(Tok::RParen) => {
                        self.pos += 1;
                        Ok(inner)
                    }
                    Some(other) => Err(ExprError::UnexpectedToken(other.describe())),
                    None => Err(ExprError::UnexpectedEnd),
                }
            }
            other => Err(ExprError::UnexpectedToken(other.describe())),
        }
    }
}

/// Parse an expression.
pub fn parse(src: &str) -> Result<Expr, ExprError> {
    let toks = lex(src)?;
    if toks.is_empty() {
        return Err(ExprError::UnexpectedEnd);
    }
    let mut parser = Parser { toks, pos: 0 };
    let expr = parser.or()?;
    match parser.toks.get(parser.pos) {
        None => Ok(expr),
        Some(tok) => Err(ExprError::UnexpectedToken(tok.describe())),
    }
}

/// Parse and evaluate in one go.
pub fn evaluate(
    src: &str,
    lookup: &dyn Fn(&str) -> Option<Value>,
) -> Result<Value, ExprError> {
    parse(src)?.eval(lookup)
}

impl Expr {
    /// Evaluate against a variable lookup.
    pub fn eval(&self, lookup: &dyn Fn(&str) -> Option<Value>) -> Result<Value, ExprError> {
        match self {
            Expr::Literal(v) => Ok(v.clone()),
            Expr::Var(path) => match lookup(path) {
                Some(v) => Ok(v),
                None if !path.contains('.') => Ok(Value::Text(path.clone())),
                None => Err(ExprError::UndefinedVariable(path.clone())),
            },
            Expr::Not(inner) => Ok(Value::Bool(!inner.eval(lookup)?.is_truthy())),
            Expr::Neg(inner) => {
                let v = inner.eval(lookup)?;
                let n = v.as_f64().ok_or(ExprError::TypeMismatch {
                    op: "-",
                    lhs: "number",
                    rhs: v.type_name(),
                })?;
                Ok(Value::Number(-n))
            }
            Expr::Binary(op, lhs, rhs) => {
                // Short-circuit logic operators.
                match *op {
                    "&&" => {
                        let l = lhs.eval(lookup)?;
                        if !l.is_truthy() {
                            return Ok(Value::Bool(false));
                        }
                        return Ok(Value::Bool(rhs.eval(lookup)?.is_truthy()));
                    }
                    "||" => {
                        let l = lhs.eval(lookup)?;
                        if l.is_truthy() {
                            return Ok(Value::Bool(true));
                        }
                        return Ok(Value::Bool(rhs.eval(lookup)?.is_truthy()));
                    }
                    _ => {}
                }
                let l = lhs.eval(lookup)?;
                let r = rhs.eval(lookup)?;
                apply_binary(op, &l, &r)
            }
        }
    }
}

fn apply_binary(op: &'static str, l: &Value, r: &Value) -> Result<Value, ExprError> {
    let mismatch = || ExprError::TypeMismatch {
        op,
        lhs: l.type_name(),
        rhs: r.type_name(),
    };
    match op {
        "==" => Ok(Value::Bool(values_equal(l, r))),
        "!=" => Ok(Value::Bool(!values_equal(l, r))),
        "<" | "<=" | ">" | ">=" => {
            let ordering = match (l, r) {
                (Value::Text(a), Value::Text(b)) => a.partial_cmp(b),
                _ => {
                    let a = l.as_f64().ok_or_else(mismatch)?;
                    let b = r.as_f64().ok_or_else(mismatch)?;
                    a.partial_cmp(&b)
                }
            }
            .ok_or_else(mismatch)?;
            Ok(Value::Bool(match op {
                "<" => ordering.is_lt(),
                "<=" => ordering.is_le(),
                ">" => ordering.is_gt(),
                _ => ordering.is_ge(),
            }))
        }
        "+" => match (l, r) {
            (Value::Text(_), _) | (_, Value::Text(_))
                if l.as_f64().is_none() || r.as_f64().is_none() =>
            {
                Ok(Value::Text(format!("{}{}", l, r)))
            }
            _ => {
                let a = l.as_f64().ok_or_else(mismatch)?;
                let b = r.as_f64().ok_or_else(mismatch)?;
                Ok(Value::Number(a + b))
            }
        },
        "-" | "*" | "/" | "%" => {
            let a = l.as_f64().ok_or_else(mismatch)?;
            let b = r.as_f64().ok_or_else(mismatch)?;
            match op {
                "-" => Ok(Value::Number(a - b)),
                "*" => Ok(Value::Number(a * b)),
                _ if b == 0.0 => Err(ExprError::DivisionByZero),
                "/" => Ok(Value::Number(a / b)),
                _ => Ok(Value::Number(a % b)),
            }
        }
        _ => Err(ExprError::UnexpectedToken(op.to_string())),
    }
}

fn values_equal(l: &Value, r: &Value) -> bool {
    match (l, r) {
        (Value::Number(a), Value::Number(b)) => a == b,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Number(a), other) | (other, Value::Number(a)) => other.as_f64() == Some(*a),
        _ => l.to_string() == r.to_string(),
    }
}
