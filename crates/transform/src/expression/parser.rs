//! Recursive-descent parser
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/' | '%') unary)*
//! unary   := ('-' | '+') unary | power
//! power   := primary ('**' unary)?
//! primary := NUMBER | METER | IDENT '(' expr (',' expr)* ')' | '(' expr ')'
//! ```

use super::EvaluationError;
use super::lexer::{Spanned, Token};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Function {
    Min,
    Max,
    Abs,
    Sum,
    Avg,
}

impl Function {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "min" => Some(Self::Min),
            "max" => Some(Self::Max),
            "abs" => Some(Self::Abs),
            "sum" => Some(Self::Sum),
            "avg" => Some(Self::Avg),
            _ => None,
        }
    }

    pub(crate) const fn as_str(&self) -> &'static str {
        match self {
            Self::Min => "min",
            Self::Max => "max",
            Self::Abs => "abs",
            Self::Sum => "sum",
            Self::Avg => "avg",
        }
    }

    fn check_arity(&self, got: usize) -> Result<(), EvaluationError> {
        let ok = match self {
            Self::Abs => got == 1,
            _ => got >= 1,
        };
        if ok {
            return Ok(());
        }
        Err(EvaluationError::Arity {
            function: self.as_str(),
            expected: if matches!(self, Self::Abs) { "1" } else { "at least 1" },
            got,
        })
    }
}

/// Expression tree; meter references index into the reference list
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Node {
    Number(f64),
    Meter(usize),
    Neg(Box<Node>),
    Binary {
        op: BinaryOp,
        lhs: Box<Node>,
        rhs: Box<Node>,
    },
    Call {
        function: Function,
        args: Vec<Node>,
    },
}

pub(crate) struct Parser<'a> {
    tokens: &'a [Spanned],
    pos: usize,
    end: usize,
    references: Vec<String>,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(tokens: &'a [Spanned], source_len: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            end: source_len,
            references: Vec::new(),
        }
    }

    /// Parse the whole token stream
    pub(crate) fn parse(mut self) -> Result<(Node, Vec<String>), EvaluationError> {
        let root = self.expr()?;
        if let Some(extra) = self.peek() {
            return Err(EvaluationError::parse(
                extra.position,
                format!("unexpected token {:?}", extra.token),
            ));
        }
        Ok((root, self.references))
    }

    fn peek(&self) -> Option<&'a Spanned> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&'a Spanned> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn position(&self) -> usize {
        self.peek().map_or(self.end, |t| t.position)
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek().is_some_and(|t| &t.token == expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token, what: &str) -> Result<(), EvaluationError> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(EvaluationError::parse(self.position(), format!("expected {what}")))
        }
    }

    fn expr(&mut self) -> Result<Node, EvaluationError> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek().map(|t| &t.token) {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.term()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn term(&mut self) -> Result<Node, EvaluationError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek().map(|t| &t.token) {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::Percent) => BinaryOp::Rem,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn unary(&mut self) -> Result<Node, EvaluationError> {
        if self.eat(&Token::Minus) {
            return Ok(Node::Neg(Box::new(self.unary()?)));
        }
        if self.eat(&Token::Plus) {
            return self.unary();
        }
        self.power()
    }

    fn power(&mut self) -> Result<Node, EvaluationError> {
        let base = self.primary()?;
        if self.eat(&Token::Power) {
            let exponent = self.unary()?;
            return Ok(binary(BinaryOp::Pow, base, exponent));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Node, EvaluationError> {
        let position = self.position();
        let Some(spanned) = self.next() else {
            return Err(EvaluationError::parse(position, "unexpected end of expression"));
        };

        match &spanned.token {
            Token::Number(n) => Ok(Node::Number(*n)),
            Token::Meter(name) => Ok(Node::Meter(self.reference(name))),
            Token::LParen => {
                let inner = self.expr()?;
                self.expect(&Token::RParen, "')'")?;
                Ok(inner)
            }
            Token::Ident(name) => {
                let function = Function::parse(name)
                    .ok_or_else(|| EvaluationError::UnknownFunction(name.clone()))?;
                self.expect(&Token::LParen, "'(' after function name")?;
                let mut args = vec![self.expr()?];
                while self.eat(&Token::Comma) {
                    args.push(self.expr()?);
                }
                self.expect(&Token::RParen, "')'")?;
                function.check_arity(args.len())?;
                Ok(Node::Call { function, args })
            }
            other => Err(EvaluationError::parse(
                spanned.position,
                format!("unexpected token {other:?}"),
            )),
        }
    }

    /// Index of a meter in the reference list, adding it on first use
    fn reference(&mut self, name: &str) -> usize {
        if let Some(idx) = self.references.iter().position(|r| r == name) {
            return idx;
        }
        self.references.push(name.to_string());
        self.references.len() - 1
    }
}

fn binary(op: BinaryOp, lhs: Node, rhs: Node) -> Node {
    Node::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}
