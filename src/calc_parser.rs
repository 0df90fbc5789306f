use std::collections::HashMap;
use std::io::Write;

use rand::Rng;
use rug::Integer;
use tracing::trace;

use crate::calc_config::DebugFlag;
use crate::calc_constants::consts;
use crate::calc_context::FunctionDef;
use crate::calc_session::Session;
use crate::calc_types::{CalcError, Location, Token, TokenKind, Value};

/// Nesting limit for calls to user-defined operators.
pub const MAX_CALL_DEPTH: usize = 100;

const BUILTIN_BINARY: [&str; 5] = ["+", "-", "*", "/", "**"];

/// Outcome of reading one statement.
#[derive(Debug, PartialEq)]
pub enum Line {
    /// An expression was evaluated and its value should be printed.
    Value(Value),
    /// Blank line, directive, definition or assignment: nothing to print.
    Empty,
    /// No more input.
    Eof,
}

/// Reads statements from a token stream and evaluates them against a session.
///
/// Evaluation is right to left with no operator precedence: `2*3+4` is 14.
pub struct Parser<'s> {
    pub(crate) session: &'s mut Session,
    pub(crate) file: String,
    tokens: Vec<Token>,
    current: usize,
    locals: HashMap<String, Value>,
    call_depth: usize,
}

impl<'s> Parser<'s> {
    pub fn new(session: &'s mut Session, file: &str, tokens: Vec<Token>) -> Self {
        Parser {
            session,
            file: file.to_string(),
            tokens,
            current: 0,
            locals: HashMap::new(),
            call_depth: 0,
        }
    }

    /// Reads and runs one statement. On error the rest of the statement's
    /// line is skipped, so the next call starts on a fresh statement.
    pub fn line(&mut self) -> Result<Line, CalcError> {
        if self.is_at_end() {
            return Ok(Line::Eof);
        }
        let end = self.tokens[self.current..]
            .iter()
            .position(|t| t.kind == TokenKind::Newline)
            .map_or(self.tokens.len(), |p| self.current + p + 1);
        self.echo_statement(end)?;

        let result = self.statement();
        if result.is_err() && self.current < end {
            self.current = end;
        }
        result
    }

    fn echo_statement(&mut self, end: usize) -> Result<(), CalcError> {
        let statement = &self.tokens[self.current..end];
        let text: Vec<String> = statement
            .iter()
            .filter(|t| t.kind != TokenKind::Newline)
            .map(|t| t.to_string())
            .collect();
        if self.session.config.debug(DebugFlag::Tokens) {
            let classes: Vec<&str> = statement.iter().map(|t| t.class_name()).collect();
            writeln!(self.session.err(), "tokens: {}", classes.join(" "))?;
        }
        if self.session.config.debug(DebugFlag::Parse) && !text.is_empty() {
            writeln!(self.session.err(), "parse: {}", text.join(" "))?;
        }
        Ok(())
    }

    fn statement(&mut self) -> Result<Line, CalcError> {
        match self.peek_kind() {
            Some(TokenKind::Newline) => {
                self.advance();
                Ok(Line::Empty)
            }
            Some(TokenKind::RightParen) => {
                self.special()?;
                Ok(Line::Empty)
            }
            Some(TokenKind::Identifier(name)) if name == "op" => {
                self.definition()?;
                Ok(Line::Empty)
            }
            Some(TokenKind::Identifier(name))
                if matches!(self.peek_kind_at(1), Some(TokenKind::Operator(op)) if op == "=") =>
            {
                let name = name.clone();
                self.current += 2;
                let value = self.expr()?;
                self.need_newline()?;
                trace!(name = %name, "assign");
                self.session.context.assign(&name, value);
                Ok(Line::Empty)
            }
            _ => {
                let value = self.expr()?;
                self.need_newline()?;
                Ok(Line::Value(value))
            }
        }
    }

    /// `op name x = body` or `op x name y = body`.
    fn definition(&mut self) -> Result<(), CalcError> {
        self.advance(); // `op`
        let mut names = Vec::new();
        while let Some(TokenKind::Identifier(id)) = self.peek_kind() {
            names.push(id.clone());
            self.advance();
        }
        match self.peek_kind() {
            Some(TokenKind::Operator(op)) if op == "=" => self.advance(),
            _ => return Err(self.unexpected("'='")),
        }
        let (left, name, right) = match names.as_slice() {
            [name, right] => (None, name.clone(), right.clone()),
            [left, name, right] => (Some(left.clone()), name.clone(), right.clone()),
            _ => return Err(self.syntax("op definition needs a name and one or two parameters")),
        };
        if name == "op" {
            return Err(self.syntax("cannot redefine op"));
        }

        let mut body = Vec::new();
        while let Some(token) = self.peek().cloned() {
            if token.kind == TokenKind::Newline {
                break;
            }
            body.push(token);
            self.advance();
        }
        if body.is_empty() {
            return Err(self.syntax(&format!("empty body for op {}", name)));
        }
        self.need_newline()?;
        self.session.context.define(FunctionDef { name, left, right, body });
        Ok(())
    }

    pub(crate) fn expr(&mut self) -> Result<Value, CalcError> {
        let left = self.operand()?;
        match self.peek_kind().cloned() {
            Some(TokenKind::Operator(op)) if BUILTIN_BINARY.contains(&op.as_str()) => {
                self.advance();
                let right = self.expr()?;
                let prec = self.session.config.float_prec();
                left.binary(&op, &right, prec).map_err(|m| self.range(m))
            }
            Some(TokenKind::Identifier(name)) => match self.session.context.binary(&name).cloned() {
                Some(def) => {
                    self.advance();
                    let right = self.expr()?;
                    self.call(&def, Some(left), right)
                }
                None => Ok(left),
            },
            _ => Ok(left),
        }
    }

    fn operand(&mut self) -> Result<Value, CalcError> {
        let token = match self.peek().cloned() {
            Some(token) => token,
            None => return Err(self.unexpected("operand")),
        };
        match token.kind {
            TokenKind::Operator(op) if op == "-" => {
                self.advance();
                Ok(self.expr()?.neg())
            }
            TokenKind::Operator(op) if op == "?" => {
                self.advance();
                let bound = self.expr()?;
                self.roll(bound)
            }
            TokenKind::Number(text) => {
                self.advance();
                let (ibase, _) = self.session.config.base();
                let prec = self.session.config.float_prec();
                Value::parse(&text, ibase, prec).map_err(|m| self.syntax_at(&m, token.line))
            }
            TokenKind::LeftParen => {
                self.advance();
                let value = self.expr()?;
                match self.peek_kind() {
                    Some(TokenKind::RightParen) => {
                        self.advance();
                        Ok(value)
                    }
                    _ => Err(self.unexpected("')'")),
                }
            }
            TokenKind::Identifier(name) => {
                if let Some(def) = self.session.context.unary(&name).cloned() {
                    self.advance();
                    let right = self.expr()?;
                    return self.call(&def, None, right);
                }
                self.advance();
                self.variable(&name, token.line)
            }
            _ => Err(self.unexpected("operand")),
        }
    }

    fn variable(&mut self, name: &str, line: usize) -> Result<Value, CalcError> {
        if let Some(value) = self.locals.get(name) {
            return Ok(value.clone());
        }
        if let Some(value) = self.session.context.lookup(name) {
            return Ok(value.clone());
        }
        if name == "e" || name == "pi" {
            let prec = self.session.config.float_prec();
            let constants = consts(prec, self.session.err())?;
            if let Some(value) = constants.by_name(name) {
                return Ok(Value::Float(value));
            }
        }
        Err(self.syntax_at(&format!("{:?} not defined", name), line))
    }

    /// `?n`: uniform random integer in [origin, origin+n).
    fn roll(&mut self, bound: Value) -> Result<Value, CalcError> {
        let n = match bound {
            Value::Int(i) if i > 0 => i.to_u64().ok_or_else(|| self.range("roll bound too large"))?,
            other => return Err(self.range(&format!("illegal roll bound {}", other))),
        };
        let origin = self.session.config.origin() as u64;
        let drawn = self.session.config.rng().gen_range(0..n);
        Ok(Value::Int(Integer::from(drawn) + origin))
    }

    fn call(
        &mut self,
        def: &FunctionDef,
        left: Option<Value>,
        right: Value,
    ) -> Result<Value, CalcError> {
        if self.call_depth >= MAX_CALL_DEPTH {
            return Err(CalcError::Resource {
                message: format!("op {} nested too deep", def.name),
                location: self.loc(),
            });
        }
        let mut locals = HashMap::new();
        if let (Some(param), Some(value)) = (&def.left, left) {
            locals.insert(param.clone(), value);
        }
        locals.insert(def.right.clone(), right);

        let mut body = def.body.clone();
        let last_line = body.last().map_or(0, |t| t.line);
        body.push(Token::new(TokenKind::Newline, last_line));

        let file = self.file.clone();
        let call_depth = self.call_depth + 1;
        let mut inner = Parser::new(&mut *self.session, &file, body);
        inner.locals = locals;
        inner.call_depth = call_depth;
        let value = inner.expr()?;
        inner.need_newline()?;
        Ok(value)
    }

    pub(crate) fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.current)
    }

    pub(crate) fn peek_kind(&self) -> Option<&TokenKind> {
        self.peek().map(|t| &t.kind)
    }

    fn peek_kind_at(&self, offset: usize) -> Option<&TokenKind> {
        self.tokens.get(self.current + offset).map(|t| &t.kind)
    }

    pub(crate) fn peek_is_newline(&self) -> bool {
        matches!(self.peek_kind(), Some(TokenKind::Newline))
    }

    pub(crate) fn advance(&mut self) {
        if self.current < self.tokens.len() {
            self.current += 1;
        }
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.tokens.len()
    }

    /// Location of the next token, or of the last one once input is used up.
    pub(crate) fn loc(&self) -> Location {
        let line = self
            .tokens
            .get(self.current)
            .or_else(|| self.tokens.last())
            .map_or(1, |t| t.line);
        Location::new(&self.file, line)
    }

    pub(crate) fn syntax(&self, message: &str) -> CalcError {
        CalcError::Syntax {
            message: message.to_string(),
            location: self.loc(),
        }
    }

    fn syntax_at(&self, message: &str, line: usize) -> CalcError {
        CalcError::Syntax {
            message: message.to_string(),
            location: Location::new(&self.file, line),
        }
    }

    pub(crate) fn range(&self, message: &str) -> CalcError {
        CalcError::Range {
            message: message.to_string(),
            location: self.loc(),
        }
    }

    pub(crate) fn unexpected(&self, want: &str) -> CalcError {
        let got = match self.peek() {
            Some(token) if token.kind == TokenKind::Newline => "newline".to_string(),
            Some(token) => format!("{} {}", token.class_name(), token),
            None => "EOF".to_string(),
        };
        self.syntax(&format!("expected {}, got {}", want, got))
    }

    pub(crate) fn need_identifier(&mut self) -> Result<String, CalcError> {
        match self.peek_kind().cloned() {
            Some(TokenKind::Identifier(id)) => {
                self.advance();
                Ok(id)
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    pub(crate) fn need_string(&mut self) -> Result<String, CalcError> {
        match self.peek_kind().cloned() {
            Some(TokenKind::String(s)) => {
                self.advance();
                Ok(s)
            }
            _ => Err(self.unexpected("string")),
        }
    }

    pub(crate) fn need_number(&mut self) -> Result<String, CalcError> {
        match self.peek_kind().cloned() {
            Some(TokenKind::Number(n)) => {
                self.advance();
                Ok(n)
            }
            _ => Err(self.unexpected("number")),
        }
    }

    pub(crate) fn need_right_paren(&mut self) -> Result<(), CalcError> {
        match self.peek_kind() {
            Some(TokenKind::RightParen) => {
                self.advance();
                Ok(())
            }
            _ => Err(self.unexpected("')'")),
        }
    }

    pub(crate) fn need_newline(&mut self) -> Result<(), CalcError> {
        if self.peek_is_newline() {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected("newline"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calc_config::Config;
    use crate::calc_lexer::Lexer;
    use pretty_assertions::assert_eq;

    fn eval(session: &mut Session, source: &str) -> Result<Line, CalcError> {
        let tokens = Lexer::new("<test>", source).tokenize().unwrap();
        let mut parser = Parser::new(session, "<test>", tokens);
        parser.line()
    }

    fn int(n: i64) -> Line {
        Line::Value(Value::Int(Integer::from(n)))
    }

    #[test]
    fn test_right_to_left_evaluation() {
        let (mut session, _out, _err) = Session::buffered(Config::with_seed(1));
        assert_eq!(eval(&mut session, "2*3+4").unwrap(), int(14));
        assert_eq!(eval(&mut session, "(2*3)+4").unwrap(), int(10));
        assert_eq!(eval(&mut session, "2**10").unwrap(), int(1024));
        assert_eq!(eval(&mut session, "-2+3").unwrap(), int(-5));
    }

    #[test]
    fn test_input_base() {
        let (mut session, _out, _err) = Session::buffered(Config::with_seed(1));
        session.config.set_base(16, 0);
        assert_eq!(eval(&mut session, "10 + 1").unwrap(), int(17));
    }

    #[test]
    fn test_user_ops() {
        let (mut session, _out, _err) = Session::buffered(Config::with_seed(1));
        assert_eq!(eval(&mut session, "op sq x = x * x").unwrap(), Line::Empty);
        assert_eq!(eval(&mut session, "op a avg b = (a + b) / 2").unwrap(), Line::Empty);
        assert_eq!(eval(&mut session, "sq 3 + 1").unwrap(), int(16));
        assert_eq!(eval(&mut session, "4 avg 8").unwrap(), int(6));
        assert_eq!(eval(&mut session, "sq 2 avg 4").unwrap(), int(9));
    }

    #[test]
    fn test_runaway_recursion_is_a_resource_error() {
        let (mut session, _out, _err) = Session::buffered(Config::with_seed(1));
        eval(&mut session, "op loop x = loop x").unwrap();
        assert!(matches!(eval(&mut session, "loop 1"), Err(CalcError::Resource { .. })));
    }

    #[test]
    fn test_constants_follow_precision() {
        let (mut session, _out, _err) = Session::buffered(Config::with_seed(1));
        session.config.set_float_prec(64);
        match eval(&mut session, "pi").unwrap() {
            Line::Value(Value::Float(f)) => assert_eq!(f.prec(), 64),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_undefined_variable() {
        let (mut session, _out, _err) = Session::buffered(Config::with_seed(1));
        let err = eval(&mut session, "nope + 1").unwrap_err();
        assert_eq!(err.to_string(), "<test>:1: \"nope\" not defined");
    }

    #[test]
    fn test_roll_uses_origin_and_seed() {
        let (mut session, _out, _err) = Session::buffered(Config::with_seed(7));
        let mut first = Vec::new();
        for _ in 0..20 {
            match eval(&mut session, "?6").unwrap() {
                Line::Value(Value::Int(i)) => {
                    assert!(i >= 1 && i <= 6);
                    first.push(i);
                }
                other => panic!("unexpected {:?}", other),
            }
        }
        session.config.set_seed(7);
        for expected in first {
            assert_eq!(eval(&mut session, "?6").unwrap(), Line::Value(Value::Int(expected)));
        }
        assert!(matches!(eval(&mut session, "?0"), Err(CalcError::Range { .. })));
    }

    #[test]
    fn test_error_skips_rest_of_line() {
        let (mut session, _out, _err) = Session::buffered(Config::with_seed(1));
        let tokens = Lexer::new("<test>", "(1 / 0) + 2\n5\n").tokenize().unwrap();
        let mut parser = Parser::new(&mut session, "<test>", tokens);
        assert!(parser.line().is_err());
        assert_eq!(parser.line().unwrap(), int(5));
        assert_eq!(parser.line().unwrap(), Line::Eof);
    }

    #[test]
    fn test_bad_definition() {
        let (mut session, _out, _err) = Session::buffered(Config::with_seed(1));
        assert!(matches!(eval(&mut session, "op f = 1"), Err(CalcError::Syntax { .. })));
        assert!(matches!(eval(&mut session, "op f x ="), Err(CalcError::Syntax { .. })));
    }
}
