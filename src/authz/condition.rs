//! Condition expressions used as predicates in policy files.
//!
//! Supported syntax:
//! - Comparisons: `==`, `!=`, `>`, `<`, `>=`, `<=`
//! - Boolean operators: `&&`, `||`, `!`
//! - Membership: `x in list`
//! - Dot-path access into the evaluation context: `subject.owner`, `subject.meta.tags`
//! - Literals: integers, floats, `"strings"`, `true`, `false`, `null`
//! - Parentheses for grouping

use std::cmp::Ordering;
use std::iter::Peekable;
use std::str::Chars;

use crate::authz::errors::AuthzError;
use serde_json::{Number, Value};

/// Deepest nesting of `!`, parentheses and `&&`/`||` chains a condition may use.
/// Parsing and evaluation recurse once per level.
const MAX_DEPTH: usize = 64;

// ─── AST ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Path(Vec<String>),
    BinOp {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Not(Box<Expr>),
    In {
        element: Box<Expr>,
        collection: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinOp {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Null,
}

// ─── Lexer ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Lit(Literal),
    Dot,
    LParen,
    RParen,
    Op(BinOp),
    Not,
    In,
}

fn invalid(msg: impl Into<String>) -> AuthzError {
    AuthzError::InvalidCondition(msg.into())
}

/// Consume `second` if it follows, returning whether it did.
fn eat(chars: &mut Peekable<Chars<'_>>, second: char) -> bool {
    if chars.peek() == Some(&second) {
        chars.next();
        true
    } else {
        false
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, AuthzError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        let token = match c {
            c if c.is_whitespace() => continue,
            '.' => Token::Dot,
            '(' => Token::LParen,
            ')' => Token::RParen,
            '=' if eat(&mut chars, '=') => Token::Op(BinOp::Eq),
            '!' if eat(&mut chars, '=') => Token::Op(BinOp::Ne),
            '!' => Token::Not,
            '>' if eat(&mut chars, '=') => Token::Op(BinOp::Ge),
            '>' => Token::Op(BinOp::Gt),
            '<' if eat(&mut chars, '=') => Token::Op(BinOp::Le),
            '<' => Token::Op(BinOp::Lt),
            '&' if eat(&mut chars, '&') => Token::Op(BinOp::And),
            '|' if eat(&mut chars, '|') => Token::Op(BinOp::Or),
            '"' => Token::Lit(Literal::Str(lex_string(&mut chars)?)),
            c if c.is_ascii_digit() => lex_number(c, &mut chars)?,
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut word = String::from(c);
                while let Some(&next) = chars.peek() {
                    if !(next.is_ascii_alphanumeric() || next == '_') {
                        break;
                    }
                    word.push(next);
                    chars.next();
                }
                match word.as_str() {
                    "true" => Token::Lit(Literal::Bool(true)),
                    "false" => Token::Lit(Literal::Bool(false)),
                    "null" => Token::Lit(Literal::Null),
                    "in" => Token::In,
                    _ => Token::Ident(word),
                }
            }
            c => return Err(invalid(format!("unexpected character `{c}`"))),
        };
        tokens.push(token);
    }
    Ok(tokens)
}

/// Opening quote already consumed.
fn lex_string(chars: &mut Peekable<Chars<'_>>) -> Result<String, AuthzError> {
    let mut s = String::new();
    loop {
        match chars.next() {
            None => return Err(invalid("unterminated string literal")),
            Some('"') => return Ok(s),
            Some('\\') => match chars.next() {
                Some('n') => s.push('\n'),
                Some('t') => s.push('\t'),
                Some(escaped) => s.push(escaped),
                None => return Err(invalid("unterminated string literal")),
            },
            Some(c) => s.push(c),
        }
    }
}

fn lex_number(first: char, chars: &mut Peekable<Chars<'_>>) -> Result<Token, AuthzError> {
    let mut num = String::from(first);
    while let Some(&next) = chars.peek() {
        if !(next.is_ascii_digit() || next == '.') {
            break;
        }
        num.push(next);
        chars.next();
    }
    if num.contains('.') {
        num.parse()
            .map(|f| Token::Lit(Literal::Float(f)))
            .map_err(|_| invalid(format!("invalid float `{num}`")))
    } else {
        num.parse()
            .map(|n| Token::Lit(Literal::Int(n)))
            .map_err(|_| invalid(format!("invalid integer `{num}`")))
    }
}

// ─── Parser ─────────────────────────────────────────────────────────────

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn descend(&mut self) -> Result<(), AuthzError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(invalid(format!(
                "expression nests deeper than {MAX_DEPTH} levels"
            )));
        }
        Ok(())
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    /// or_expr = and_expr ("||" and_expr)*
    ///
    /// Each link of the chain deepens the left-nested tree by one level.
    fn parse_or(&mut self) -> Result<Expr, AuthzError> {
        let outer = self.depth;
        let mut left = self.parse_and()?;
        while self.peek() == Some(&Token::Op(BinOp::Or)) {
            self.advance();
            self.descend()?;
            let right = self.parse_and()?;
            left = binop(BinOp::Or, left, right);
        }
        self.depth = outer;
        Ok(left)
    }

    /// and_expr = comparison ("&&" comparison)*
    fn parse_and(&mut self) -> Result<Expr, AuthzError> {
        let outer = self.depth;
        let mut left = self.parse_comparison()?;
        while self.peek() == Some(&Token::Op(BinOp::And)) {
            self.advance();
            self.descend()?;
            let right = self.parse_comparison()?;
            left = binop(BinOp::And, left, right);
        }
        self.depth = outer;
        Ok(left)
    }

    /// comparison = unary ((cmp_op | "in") unary)?
    fn parse_comparison(&mut self) -> Result<Expr, AuthzError> {
        let left = self.parse_unary()?;
        match self.peek().cloned() {
            Some(Token::Op(op)) if !matches!(op, BinOp::And | BinOp::Or) => {
                self.advance();
                let right = self.parse_unary()?;
                Ok(binop(op, left, right))
            }
            Some(Token::In) => {
                self.advance();
                let right = self.parse_unary()?;
                Ok(Expr::In {
                    element: Box::new(left),
                    collection: Box::new(right),
                })
            }
            _ => Ok(left),
        }
    }

    /// unary = "!" unary | primary
    fn parse_unary(&mut self) -> Result<Expr, AuthzError> {
        if self.peek() == Some(&Token::Not) {
            self.advance();
            self.descend()?;
            let inner = self.parse_unary()?;
            self.depth -= 1;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    /// primary = literal | path | "(" or_expr ")"
    fn parse_primary(&mut self) -> Result<Expr, AuthzError> {
        match self.advance() {
            Some(Token::Lit(lit)) => Ok(Expr::Literal(lit)),
            Some(Token::Ident(name)) => {
                let mut path = vec![name];
                while self.peek() == Some(&Token::Dot) {
                    self.advance();
                    match self.advance() {
                        Some(Token::Ident(seg)) => path.push(seg),
                        _ => return Err(invalid("expected identifier after `.`")),
                    }
                }
                Ok(Expr::Path(path))
            }
            Some(Token::LParen) => {
                self.descend()?;
                let expr = self.parse_or()?;
                if self.advance() != Some(Token::RParen) {
                    return Err(invalid("expected closing parenthesis `)`"));
                }
                self.depth -= 1;
                Ok(expr)
            }
            other => Err(invalid(format!("unexpected token: {other:?}"))),
        }
    }
}

fn binop(op: BinOp, left: Expr, right: Expr) -> Expr {
    Expr::BinOp {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

/// Parse a condition expression string into an AST.
pub fn parse_condition(input: &str) -> Result<Expr, AuthzError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(invalid("empty expression"));
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.parse_or()?;
    if let Some(trailing) = parser.peek() {
        return Err(invalid(format!("unexpected trailing token: {trailing:?}")));
    }
    Ok(expr)
}

// ─── Evaluator ──────────────────────────────────────────────────────────

/// Evaluate a parsed expression against a JSON context.
/// Anything other than a boolean result is an error.
pub fn evaluate(expr: &Expr, context: &Value) -> Result<bool, AuthzError> {
    match eval_value(expr, context)? {
        Value::Bool(b) => Ok(b),
        other => Err(invalid(format!(
            "condition must evaluate to boolean, got: {other}"
        ))),
    }
}

fn literal_value(lit: &Literal) -> Value {
    match lit {
        Literal::Int(n) => Value::from(*n),
        Literal::Float(f) => Value::from(*f),
        Literal::Str(s) => Value::from(s.as_str()),
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Null => Value::Null,
    }
}

fn exact_int(n: &Number) -> Option<i128> {
    n.as_i64()
        .map(i128::from)
        .or_else(|| n.as_u64().map(i128::from))
}

/// Integers compare exactly; a float on either side compares as `f64`.
/// `None` unless both values are numbers.
fn compare_numbers(a: &Value, b: &Value) -> Option<Ordering> {
    let (Value::Number(x), Value::Number(y)) = (a, b) else {
        return None;
    };
    match (exact_int(x), exact_int(y)) {
        (Some(x), Some(y)) => Some(x.cmp(&y)),
        _ => x.as_f64()?.partial_cmp(&y.as_f64()?),
    }
}

/// Numbers compare by value regardless of integer/float representation.
fn values_equal(a: &Value, b: &Value) -> bool {
    match compare_numbers(a, b) {
        Some(ordering) => ordering.is_eq(),
        None => a == b,
    }
}

fn as_bool(value: &Value, op: &str) -> Result<bool, AuthzError> {
    value
        .as_bool()
        .ok_or_else(|| invalid(format!("`{op}` requires boolean operands")))
}

fn eval_value(expr: &Expr, context: &Value) -> Result<Value, AuthzError> {
    match expr {
        Expr::Literal(lit) => Ok(literal_value(lit)),
        Expr::Path(segments) => Ok(segments
            .iter()
            .try_fold(context, |current, seg| current.get(seg))
            .cloned()
            .unwrap_or(Value::Null)),
        Expr::Not(inner) => Ok(Value::Bool(!as_bool(&eval_value(inner, context)?, "!")?)),
        Expr::In {
            element,
            collection,
        } => {
            let elem = eval_value(element, context)?;
            match eval_value(collection, context)? {
                Value::Array(items) => Ok(Value::Bool(
                    items.iter().any(|item| values_equal(item, &elem)),
                )),
                _ => Err(invalid("`in` operator requires an array on the right side")),
            }
        }
        Expr::BinOp { op, left, right } => {
            let l = eval_value(left, context)?;
            // `&&` and `||` short-circuit; the right side is only checked when it decides
            let result = match op {
                BinOp::And => as_bool(&l, "&&")? && as_bool(&eval_value(right, context)?, "&&")?,
                BinOp::Or => as_bool(&l, "||")? || as_bool(&eval_value(right, context)?, "||")?,
                BinOp::Eq => values_equal(&l, &eval_value(right, context)?),
                BinOp::Ne => !values_equal(&l, &eval_value(right, context)?),
                BinOp::Gt | BinOp::Lt | BinOp::Ge | BinOp::Le => {
                    let ordering = compare_numbers(&l, &eval_value(right, context)?)
                        .ok_or_else(|| invalid("comparison operator requires numeric operands"))?;
                    match op {
                        BinOp::Gt => ordering.is_gt(),
                        BinOp::Lt => ordering.is_lt(),
                        BinOp::Ge => ordering.is_ge(),
                        _ => ordering.is_le(),
                    }
                }
            };
            Ok(Value::Bool(result))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_simple_comparison() {
        let expr = parse_condition("x == 5").unwrap();
        assert_eq!(
            expr,
            Expr::BinOp {
                op: BinOp::Eq,
                left: Box::new(Expr::Path(vec!["x".into()])),
                right: Box::new(Expr::Literal(Literal::Int(5))),
            }
        );
    }

    #[test]
    fn test_parse_dot_path() {
        let expr = parse_condition("subject.meta.size >= 9").unwrap();
        assert_eq!(
            expr,
            Expr::BinOp {
                op: BinOp::Ge,
                left: Box::new(Expr::Path(vec![
                    "subject".into(),
                    "meta".into(),
                    "size".into()
                ])),
                right: Box::new(Expr::Literal(Literal::Int(9))),
            }
        );
    }

    #[test]
    fn test_parse_precedence() {
        let expr = parse_condition("(a || b) && !c").unwrap();
        match expr {
            Expr::BinOp {
                op: BinOp::And,
                left,
                right,
            } => {
                assert!(matches!(*left, Expr::BinOp { op: BinOp::Or, .. }));
                assert!(matches!(*right, Expr::Not(_)));
            }
            _ => panic!("expected And"),
        }
    }

    #[test]
    fn test_parse_string_escapes() {
        let expr = parse_condition(r#"name == "say \"hi\"""#).unwrap();
        assert_eq!(
            expr,
            Expr::BinOp {
                op: BinOp::Eq,
                left: Box::new(Expr::Path(vec!["name".into()])),
                right: Box::new(Expr::Literal(Literal::Str("say \"hi\"".into()))),
            }
        );
    }

    #[test]
    fn test_evaluate_numeric_comparison() {
        let expr = parse_condition("subject.size >= 9 && subject.size < 17").unwrap();
        assert!(evaluate(&expr, &json!({ "subject": { "size": 14 } })).unwrap());
        assert!(!evaluate(&expr, &json!({ "subject": { "size": 20 } })).unwrap());
        assert!(evaluate(&expr, &json!({ "subject": { "size": 9.5 } })).unwrap());
    }

    #[test]
    fn test_evaluate_int_float_equality() {
        let expr = parse_condition("subject.n == 2.0").unwrap();
        assert!(evaluate(&expr, &json!({ "subject": { "n": 2 } })).unwrap());
    }

    #[test]
    fn test_large_integers_compare_exactly() {
        let subject = json!({ "subject": { "id": 9007199254740992_u64 } });
        let eq = parse_condition("subject.id == 9007199254740993").unwrap();
        assert!(!evaluate(&eq, &subject).unwrap());
        let ge = parse_condition("subject.id >= 9007199254740993").unwrap();
        assert!(!evaluate(&ge, &subject).unwrap());
        let lt = parse_condition("subject.id < 9007199254740993").unwrap();
        assert!(evaluate(&lt, &subject).unwrap());

        let big = json!({ "subject": { "id": u64::MAX, "ids": [u64::MAX] } });
        assert!(!evaluate(&parse_condition("subject.id == 0").unwrap(), &big).unwrap());
        assert!(evaluate(&parse_condition("subject.id > 1").unwrap(), &big).unwrap());
        assert!(evaluate(&parse_condition("subject.id in subject.ids").unwrap(), &big).unwrap());
    }

    #[test]
    fn test_nesting_limit() {
        let nots = format!("{}true", "!".repeat(200_000));
        assert!(matches!(
            parse_condition(&nots),
            Err(AuthzError::InvalidCondition(_))
        ));

        let parens = format!("{}true{}", "(".repeat(10_000), ")".repeat(10_000));
        assert!(parse_condition(&parens).is_err());

        let chain = vec!["true"; 10_000].join(" && ");
        assert!(parse_condition(&chain).is_err());

        let shallow = format!("{}true{}", "(".repeat(8), ")".repeat(8));
        assert!(parse_condition(&shallow).is_ok());
        assert!(parse_condition(&vec!["a == 1"; 16].join(" || ")).is_ok());
        assert!(parse_condition("!!!!true").is_ok());
    }

    #[test]
    fn test_evaluate_in_array() {
        let expr = parse_condition(r#""news" in subject.tags"#).unwrap();
        assert!(evaluate(&expr, &json!({ "subject": { "tags": ["news", "sport"] } })).unwrap());
        assert!(!evaluate(&expr, &json!({ "subject": { "tags": ["sport"] } })).unwrap());
        assert!(evaluate(&expr, &json!({ "subject": {} })).is_err());
    }

    #[test]
    fn test_evaluate_missing_path_is_null() {
        let expr = parse_condition("subject.owner == null").unwrap();
        assert!(evaluate(&expr, &json!({ "subject": null })).unwrap());
        assert!(!evaluate(&expr, &json!({ "subject": { "owner": "alice" } })).unwrap());
    }

    #[test]
    fn test_evaluate_short_circuit() {
        // right side would be a type error, but is never reached
        let expr = parse_condition("false && subject.size > 1").unwrap();
        assert!(!evaluate(&expr, &json!({ "subject": null })).unwrap());
        let expr = parse_condition("true || subject.size > 1").unwrap();
        assert!(evaluate(&expr, &json!({ "subject": null })).unwrap());
    }

    #[test]
    fn test_evaluate_non_boolean_is_error() {
        let expr = parse_condition("subject.owner").unwrap();
        assert!(evaluate(&expr, &json!({ "subject": { "owner": "alice" } })).is_err());
    }

    #[test]
    fn test_invalid_expressions() {
        assert!(parse_condition("").is_err());
        assert!(parse_condition(r#""hello"#).is_err());
        assert!(parse_condition("a == 1 b").is_err());
        assert!(parse_condition("(a == 1").is_err());
        assert!(parse_condition("a.").is_err());
        assert!(parse_condition("a # b").is_err());
    }
}
