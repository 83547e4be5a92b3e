//! Formula parser.
//!
//! Recursive descent over the token stream. Precedence, low to high:
//! `||`, `&&`, equality, comparison, additive, multiplicative, unary,
//! primary. Formula text is the source of truth; there is no persisted
//! AST, callers re-parse on every validation or evaluation.

use super::lexer::{Token, tokenize};
use super::{EngineError, SlotRef, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Reference(SlotRef),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

impl UnaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

/// Parse formula text into an expression.
pub fn parse(text: &str) -> Result<Expr, EngineError> {
    let tokens = tokenize(text)?;
    if tokens.is_empty() {
        return Err(EngineError::syntax(0, "empty formula"));
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        len: text.len(),
    };
    let expr = parser.or_expr()?;
    if let Some((_, at)) = parser.peek() {
        return Err(EngineError::syntax(at, "unexpected trailing input"));
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
    len: usize,
}

impl Parser {
    fn peek(&self) -> Option<(&Token, usize)> {
        self.tokens.get(self.pos).map(|(t, at)| (t, *at))
    }

    fn advance(&mut self) -> Option<(Token, usize)> {
        let entry = self.tokens.get(self.pos).cloned();
        if entry.is_some() {
            self.pos += 1;
        }
        entry
    }

    fn or_expr(&mut self) -> Result<Expr, EngineError> {
        let mut left = self.and_expr()?;
        while matches!(self.peek(), Some((Token::OrOr, _))) {
            self.advance();
            let right = self.and_expr()?;
            left = binary(BinaryOp::Or, left, right);
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr, EngineError> {
        let mut left = self.equality_expr()?;
        while matches!(self.peek(), Some((Token::AndAnd, _))) {
            self.advance();
            let right = self.equality_expr()?;
            left = binary(BinaryOp::And, left, right);
        }
        Ok(left)
    }

    fn equality_expr(&mut self) -> Result<Expr, EngineError> {
        let mut left = self.comparison_expr()?;
        loop {
            let op = match self.peek() {
                Some((Token::EqEq, _)) => BinaryOp::Eq,
                Some((Token::NotEq, _)) => BinaryOp::Ne,
                _ => break,
            };
            self.advance();
            let right = self.comparison_expr()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn comparison_expr(&mut self) -> Result<Expr, EngineError> {
        let mut left = self.additive_expr()?;
        loop {
            let op = match self.peek() {
                Some((Token::Lt, _)) => BinaryOp::Lt,
                Some((Token::LtEq, _)) => BinaryOp::Le,
                Some((Token::Gt, _)) => BinaryOp::Gt,
                Some((Token::GtEq, _)) => BinaryOp::Ge,
                _ => break,
            };
            self.advance();
            let right = self.additive_expr()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn additive_expr(&mut self) -> Result<Expr, EngineError> {
        let mut left = self.multiplicative_expr()?;
        loop {
            let op = match self.peek() {
                Some((Token::Plus, _)) => BinaryOp::Add,
                Some((Token::Minus, _)) => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.multiplicative_expr()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn multiplicative_expr(&mut self) -> Result<Expr, EngineError> {
        let mut left = self.unary_expr()?;
        loop {
            let op = match self.peek() {
                Some((Token::Star, _)) => BinaryOp::Mul,
                Some((Token::Slash, _)) => BinaryOp::Div,
                Some((Token::Percent, _)) => BinaryOp::Rem,
                _ => break,
            };
            self.advance();
            let right = self.unary_expr()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn unary_expr(&mut self) -> Result<Expr, EngineError> {
        match self.peek() {
            Some((Token::Minus, _)) => {
                self.advance();
                let operand = self.unary_expr()?;
                Ok(Expr::Unary {
                    op: UnaryOp::Neg,
                    operand: Box::new(operand),
                })
            }
            Some((Token::Bang, _)) => {
                self.advance();
                let operand = self.unary_expr()?;
                Ok(Expr::Unary {
                    op: UnaryOp::Not,
                    operand: Box::new(operand),
                })
            }
            _ => self.primary_expr(),
        }
    }

    fn primary_expr(&mut self) -> Result<Expr, EngineError> {
        let Some((token, at)) = self.advance() else {
            return Err(EngineError::syntax(self.len, "unexpected end of formula"));
        };
        match token {
            Token::Integer(n) => Ok(Expr::Literal(Value::Integer(n))),
            Token::Float(n) => Ok(Expr::Literal(Value::Float(n))),
            Token::Boolean(b) => Ok(Expr::Literal(Value::Boolean(b))),
            Token::Text(s) => Ok(Expr::Literal(Value::Text(s))),
            Token::Ident(name) => match SlotRef::parse(&name) {
                Some(slot) => Ok(Expr::Reference(slot)),
                None => Err(EngineError::UnknownIdentifier(name)),
            },
            Token::LParen => {
                let inner = self.or_expr()?;
                match self.advance() {
                    Some((Token::RParen, _)) => Ok(inner),
                    Some((_, at)) => Err(EngineError::syntax(at, "expected `)`")),
                    None => Err(EngineError::syntax(self.len, "expected `)`")),
                }
            }
            _ => Err(EngineError::syntax(at, "expected a value, reference, or `(`")),
        }
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

#[cfg(test)]
mod tests {
    use super::{BinaryOp, Expr, UnaryOp, parse};
    use crate::engine::{SlotRef, Value};

    #[test]
    fn test_parse_precedence() {
        // 1 + 2 * 3 parses as 1 + (2 * 3)
        let expr = parse("1 + 2 * 3").unwrap();
        match expr {
            Expr::Binary { op: BinaryOp::Add, right, .. } => match *right {
                Expr::Binary { op: BinaryOp::Mul, .. } => {}
                other => panic!("expected Mul on the right, got {other:?}"),
            },
            other => panic!("expected Add at the root, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_comparison_below_arithmetic() {
        let expr = parse("C0 + 1 < V2 * 2").unwrap();
        assert!(matches!(expr, Expr::Binary { op: BinaryOp::Lt, .. }));
    }

    #[test]
    fn test_parse_references() {
        assert_eq!(parse("C3").unwrap(), Expr::Reference(SlotRef::Column(3)));
        assert_eq!(parse("V0").unwrap(), Expr::Reference(SlotRef::Variable(0)));
    }

    #[test]
    fn test_parse_unknown_identifier() {
        assert!(matches!(
            parse("foo + 1"),
            Err(crate::engine::EngineError::UnknownIdentifier(name)) if name == "foo"
        ));
    }

    #[test]
    fn test_parse_unary_chain() {
        let expr = parse("--2").unwrap();
        assert!(matches!(expr, Expr::Unary { op: UnaryOp::Neg, .. }));
    }

    #[test]
    fn test_parse_parens_override_precedence() {
        let expr = parse("(1 + 2) * 3").unwrap();
        assert!(matches!(expr, Expr::Binary { op: BinaryOp::Mul, .. }));
    }

    #[test]
    fn test_parse_rejects_trailing_input() {
        assert!(parse("1 2").is_err());
        assert!(parse("(1 + 2").is_err());
        assert!(parse("").is_err());
    }

    #[test]
    fn test_parse_literals() {
        assert_eq!(parse("true").unwrap(), Expr::Literal(Value::Boolean(true)));
        assert_eq!(
            parse("\"hi\"").unwrap(),
            Expr::Literal(Value::Text("hi".into()))
        );
    }
}
