use super::ast::{ComparisonOp, ConditionNode, FieldPath, Literal};
use super::coerce::{parse_bool, FieldTypeResolver, LiteralCoercion};
use crate::{Error, Result};

/// Characters that terminate selectors and unquoted arguments.
fn is_reserved(c: char) -> bool {
    c.is_whitespace() || matches!(c, '\'' | '"' | '(' | ')' | ';' | ',' | '=' | '!' | '<' | '>' | '~')
}

/// Deepest parenthesised group accepted. Parsing and every compiler recurse
/// once per level, so the bound keeps hostile input off the stack limit.
pub const MAX_NESTING_DEPTH: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Compare(ComparisonOp),
    Exists,
    In,
    Out,
}

impl Operator {
    fn from_fiql(word: &str) -> Option<Self> {
        match word.to_ascii_lowercase().as_str() {
            "gt" => Some(Self::Compare(ComparisonOp::Gt)),
            "ge" => Some(Self::Compare(ComparisonOp::Ge)),
            "lt" => Some(Self::Compare(ComparisonOp::Lt)),
            "le" => Some(Self::Compare(ComparisonOp::Le)),
            "ex" => Some(Self::Exists),
            "in" => Some(Self::In),
            "out" => Some(Self::Out),
            _ => None,
        }
    }
}

struct Argument {
    raw: String,
    quoted: bool,
}

pub(super) struct Parser<'a> {
    input: &'a str,
    pos: usize,
    depth: usize,
    coercion: &'a LiteralCoercion,
    resolver: &'a dyn FieldTypeResolver,
}

impl<'a> Parser<'a> {
    pub(super) fn new(
        input: &'a str,
        coercion: &'a LiteralCoercion,
        resolver: &'a dyn FieldTypeResolver,
    ) -> Self {
        Self {
            input,
            pos: 0,
            depth: 0,
            coercion,
            resolver,
        }
    }

    pub(super) fn parse(mut self) -> Result<ConditionNode> {
        self.skip_ws();
        if self.is_eof() {
            return Err(Error::parse(0, "empty filter"));
        }
        let node = self.parse_or()?;
        self.skip_ws();
        if !self.is_eof() {
            return Err(self.error(format!("unexpected trailing input '{}'", self.remaining())));
        }
        Ok(node)
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::parse(self.pos, message)
    }

    fn remaining(&self) -> &str {
        &self.input[self.pos..]
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn peek_char(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn consume_char(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek_char(), Some(c) if c.is_whitespace()) {
            self.consume_char();
        }
    }

    /// Consume a whitespace-delimited keyword such as `and`.
    fn eat_keyword(&mut self, kw: &str) -> bool {
        let save = self.pos;
        self.skip_ws();
        let rest = self.remaining();
        let matches = rest
            .get(..kw.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(kw))
            && rest[kw.len()..]
                .chars()
                .next()
                .is_some_and(|c| c.is_whitespace() || c == '(');
        if matches {
            self.pos += kw.len();
            true
        } else {
            self.pos = save;
            false
        }
    }

    fn eat_char(&mut self, expected: char) -> bool {
        let save = self.pos;
        self.skip_ws();
        if self.peek_char() == Some(expected) {
            self.consume_char();
            true
        } else {
            self.pos = save;
            false
        }
    }

    fn expect_char(&mut self, expected: char) -> Result<()> {
        if self.eat_char(expected) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{expected}'")))
        }
    }

    // OR binds looser than AND.
    fn parse_or(&mut self) -> Result<ConditionNode> {
        let mut children = vec![self.parse_and()?];
        while self.eat_char(',') || self.eat_keyword("or") {
            children.push(self.parse_and()?);
        }
        Ok(ConditionNode::any(children))
    }

    fn parse_and(&mut self) -> Result<ConditionNode> {
        let mut children = vec![self.parse_constraint()?];
        while self.eat_char(';') || self.eat_keyword("and") {
            children.push(self.parse_constraint()?);
        }
        Ok(ConditionNode::all(children))
    }

    fn parse_constraint(&mut self) -> Result<ConditionNode> {
        if self.eat_char('(') {
            if self.depth >= MAX_NESTING_DEPTH {
                return Err(Error::parse(
                    self.pos - 1,
                    format!("filter nesting exceeds {MAX_NESTING_DEPTH} levels"),
                ));
            }
            self.depth += 1;
            let inner = self.parse_or()?;
            self.expect_char(')')?;
            self.depth -= 1;
            return Ok(inner);
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<ConditionNode> {
        self.skip_ws();
        let start = self.pos;
        let selector = self.parse_unreserved();
        if selector.is_empty() {
            return Err(self.error("expected field path"));
        }
        let field = FieldPath::parse(&selector).map_err(|e| match e {
            Error::Parse { message, .. } => Error::parse(start, message),
            other => other,
        })?;

        self.skip_ws();
        let op = self.parse_operator()?;
        self.skip_ws();

        match op {
            Operator::Compare(op) => {
                let arg = self.parse_argument()?;
                let value = self.coerce(&field, &arg)?;
                Ok(ConditionNode::Comparison { field, op, value })
            }
            Operator::Exists => {
                let arg = self.parse_argument()?;
                let present = parse_bool(&arg.raw).ok_or_else(|| {
                    self.error(format!("'=ex=' expects true or false, got '{}'", arg.raw))
                })?;
                Ok(ConditionNode::Exists { field, present })
            }
            Operator::In | Operator::Out => {
                let args = self.parse_argument_list()?;
                let mut children = Vec::with_capacity(args.len());
                for arg in &args {
                    let value = self.coerce(&field, arg)?;
                    let cmp = if op == Operator::In {
                        ComparisonOp::Eq
                    } else {
                        ComparisonOp::Ne
                    };
                    children.push(ConditionNode::Comparison {
                        field: field.clone(),
                        op: cmp,
                        value,
                    });
                }
                Ok(if op == Operator::In {
                    ConditionNode::any(children)
                } else {
                    ConditionNode::all(children)
                })
            }
        }
    }

    fn coerce(&self, field: &FieldPath, arg: &Argument) -> Result<Literal> {
        let target = self.resolver.resolve(field);
        self.coercion
            .coerce(&arg.raw, arg.quoted, target)
            .map_err(|e| match e {
                Error::Parse { message, .. } => {
                    self.error(format!("{message} for field '{field}'"))
                }
                other => other,
            })
    }

    fn parse_operator(&mut self) -> Result<Operator> {
        let input = self.input;
        let start = self.pos;
        let rest = &input[start..];
        let fixed = [
            ("==", ComparisonOp::Eq),
            ("!=", ComparisonOp::Ne),
            (">=", ComparisonOp::Ge),
            ("<=", ComparisonOp::Le),
            (">", ComparisonOp::Gt),
            ("<", ComparisonOp::Lt),
        ];
        for (symbol, op) in fixed {
            if rest.starts_with(symbol) {
                self.pos += symbol.len();
                return Ok(Operator::Compare(op));
            }
        }

        if self.peek_char() == Some('=') {
            self.consume_char();
            let word_start = self.pos;
            while matches!(self.peek_char(), Some(c) if c.is_ascii_alphabetic()) {
                self.consume_char();
            }
            let word = &input[word_start..self.pos];
            if self.peek_char() == Some('=') && !word.is_empty() {
                self.consume_char();
                if let Some(op) = Operator::from_fiql(word) {
                    return Ok(op);
                }
                return Err(Error::parse(start, format!("unsupported operator '={word}='")));
            }
        }

        Err(Error::parse(start, "expected comparison operator"))
    }

    fn parse_argument(&mut self) -> Result<Argument> {
        match self.peek_char() {
            Some(q @ ('\'' | '"')) => {
                let raw = self.parse_quoted(q)?;
                Ok(Argument { raw, quoted: true })
            }
            Some('(') => Err(self.error("argument lists are only allowed with =in= and =out=")),
            _ => {
                let raw = self.parse_unreserved();
                if raw.is_empty() {
                    return Err(self.error("expected argument"));
                }
                Ok(Argument { raw, quoted: false })
            }
        }
    }

    fn parse_argument_list(&mut self) -> Result<Vec<Argument>> {
        self.expect_char('(')?;
        let mut args = Vec::new();
        loop {
            self.skip_ws();
            args.push(self.parse_argument()?);
            if self.eat_char(',') {
                continue;
            }
            self.expect_char(')')?;
            return Ok(args);
        }
    }

    fn parse_quoted(&mut self, quote: char) -> Result<String> {
        let start = self.pos;
        self.consume_char();
        let mut out = String::new();
        while let Some(c) = self.consume_char() {
            match c {
                '\\' => match self.consume_char() {
                    Some(escaped) => out.push(escaped),
                    None => break,
                },
                c if c == quote => return Ok(out),
                c => out.push(c),
            }
        }
        Err(Error::parse(start, "unterminated quoted argument"))
    }

    fn parse_unreserved(&mut self) -> String {
        let start = self.pos;
        while matches!(self.peek_char(), Some(c) if !is_reserved(c)) {
            self.consume_char();
        }
        self.input[start..self.pos].to_string()
    }
}
