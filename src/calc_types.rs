use std::fmt;

use rug::ops::Pow;
use rug::{Float, Integer};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Directive marker
    RightParen,
    LeftParen,

    // Values
    Number(String),
    String(String),
    Identifier(String),
    Operator(String),

    // Special
    Newline,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TokenKind::RightParen => write!(f, ")"),
            TokenKind::LeftParen => write!(f, "("),
            TokenKind::Number(n) => write!(f, "{}", n),
            TokenKind::String(s) => write!(f, "{:?}", s),
            TokenKind::Identifier(i) => write!(f, "{}", i),
            TokenKind::Operator(o) => write!(f, "{}", o),
            TokenKind::Newline => write!(f, "newline"),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl Token {
    pub fn new(kind: TokenKind, line: usize) -> Self {
        Token { kind, line }
    }

    /// Name of the token class, used in "expected X, got Y" messages.
    pub fn class_name(&self) -> &'static str {
        match self.kind {
            TokenKind::RightParen => "')'",
            TokenKind::LeftParen => "'('",
            TokenKind::Number(_) => "number",
            TokenKind::String(_) => "string",
            TokenKind::Identifier(_) => "identifier",
            TokenKind::Operator(_) => "operator",
            TokenKind::Newline => "newline",
        }
    }
}

/// Source position reported in front of every error message.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub file: String,
    pub line: usize,
}

impl Location {
    pub fn new(file: &str, line: usize) -> Self {
        Location { file: file.to_string(), line }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Errors raised while reading or running statements.
///
/// `Syntax`, `Range` and `Resource` are user mistakes: they abort the current
/// statement (or the current `)get` file) and the session carries on.
/// `Internal` marks a defect in the calculator itself and is never caught.
#[derive(Debug, Error)]
pub enum CalcError {
    #[error("{location}: {message}")]
    Syntax {
        message: String,
        location: Location,
    },
    #[error("{location}: {message}")]
    Range {
        message: String,
        location: Location,
    },
    #[error("{location}: {message}")]
    Resource {
        message: String,
        location: Location,
    },
    #[error("internal error: {message}")]
    Internal {
        message: String,
    },
}

impl CalcError {
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, CalcError::Internal { .. })
    }

    pub fn message(&self) -> &str {
        match self {
            CalcError::Syntax { message, .. }
            | CalcError::Range { message, .. }
            | CalcError::Resource { message, .. }
            | CalcError::Internal { message } => message,
        }
    }
}

impl From<std::io::Error> for CalcError {
    fn from(error: std::io::Error) -> Self {
        CalcError::Internal {
            message: format!("I/O error: {}", error),
        }
    }
}

pub fn assert_internal(value: bool, message: &str) -> Result<(), CalcError> {
    if !value {
        Err(CalcError::Internal {
            message: message.to_string(),
        })
    } else {
        Ok(())
    }
}

/// Largest integer power, in bits of result, that `**` will build exactly.
pub const MAX_POW_BITS: u64 = 1 << 24;

/// Numeric value produced by evaluating a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(Integer),
    Float(Float),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
        }
    }

    /// Parses number text in the given input base; 0 means decimal.
    /// Anything containing a point or an exponent becomes a float at `prec` bits.
    pub fn parse(text: &str, ibase: u32, prec: u32) -> Result<Value, String> {
        let radix = if ibase == 0 { 10 } else { ibase as i32 };
        let is_float = text.contains('.')
            || (radix <= 10 && text.contains(['e', 'E']))
            || text.contains('@');
        if is_float {
            match Float::parse_radix(text, radix) {
                Ok(f) => Ok(Value::Float(Float::with_val(prec, f))),
                Err(_) => Err(format!("bad number syntax: {}", text)),
            }
        } else {
            match Integer::parse_radix(text, radix) {
                Ok(i) => Ok(Value::Int(Integer::from(i))),
                Err(_) => Err(format!("bad number syntax: {}", text)),
            }
        }
    }

    pub fn to_float(&self, prec: u32) -> Float {
        match self {
            Value::Int(i) => Float::with_val(prec, i),
            Value::Float(f) => Float::with_val(prec, f),
        }
    }

    pub fn neg(self) -> Value {
        match self {
            Value::Int(i) => Value::Int(-i),
            Value::Float(f) => Value::Float(-f),
        }
    }

    /// Applies a built-in binary operator. Integers stay exact where they can.
    pub fn binary(&self, op: &str, other: &Value, prec: u32) -> Result<Value, &'static str> {
        if let (Value::Int(a), Value::Int(b)) = (self, other) {
            match op {
                "+" => return Ok(Value::Int(Integer::from(a + b))),
                "-" => return Ok(Value::Int(Integer::from(a - b))),
                "*" => return Ok(Value::Int(Integer::from(a * b))),
                "/" => {
                    if *b == 0 {
                        return Err("division by zero");
                    }
                    if a.is_divisible(b) {
                        return Ok(Value::Int(Integer::from(a / b)));
                    }
                }
                "**" => {
                    if let Some(exp) = b.to_u32() {
                        let magnitude = u64::from(a.significant_bits().saturating_sub(1));
                        let bits = magnitude * u64::from(exp);
                        if bits > MAX_POW_BITS {
                            return Err("exponent too large");
                        }
                        return Ok(Value::Int(a.clone().pow(exp)));
                    }
                }
                _ => return Err("unknown operator"),
            }
        }
        let a = self.to_float(prec);
        let b = other.to_float(prec);
        let result = match op {
            "+" => a + b,
            "-" => a - b,
            "*" => a * b,
            "/" => {
                if b.is_zero() {
                    return Err("division by zero");
                }
                a / b
            }
            "**" => a.pow(b),
            _ => return Err("unknown operator"),
        };
        if result.is_nan() {
            return Err("result is not a number");
        }
        Ok(Value::Float(result))
    }

    /// Renders the value in the given output base; 0 means decimal.
    pub fn format(&self, obase: u32) -> String {
        let radix = if obase == 0 { 10 } else { obase as i32 };
        match self {
            Value::Int(i) => i.to_string_radix(radix),
            Value::Float(f) => {
                if f.is_integer() && f.get_exp().map_or(true, |e| e < 64) {
                    if let Some(i) = f.to_integer() {
                        return i.to_string_radix(radix);
                    }
                }
                f.to_string_radix(radix, None)
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.format(10))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_error_display_has_location() {
        let err = CalcError::Range {
            message: "illegal prec 0".to_string(),
            location: Location::new("<stdin>", 3),
        };
        assert_eq!(err.to_string(), "<stdin>:3: illegal prec 0");
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_internal_is_not_recoverable() {
        let err = assert_internal(false, "setting pi").unwrap_err();
        assert!(!err.is_recoverable());
        assert_eq!(err.to_string(), "internal error: setting pi");
    }

    #[test]
    fn test_parse_respects_base() {
        assert_eq!(Value::parse("ff", 16, 64).unwrap(), Value::Int(Integer::from(255)));
        assert_eq!(Value::parse("17", 0, 64).unwrap(), Value::Int(Integer::from(17)));
        assert!(Value::parse("19", 8, 64).is_err());
    }

    #[test]
    fn test_integer_division_promotes() {
        let a = Value::Int(Integer::from(7));
        let b = Value::Int(Integer::from(2));
        let q = a.binary("/", &b, 64).unwrap();
        assert_eq!(q.type_name(), "float");
        assert!(q.format(10).starts_with("3.5"));

        let c = Value::Int(Integer::from(8));
        assert_eq!(c.binary("/", &b, 64).unwrap(), Value::Int(Integer::from(4)));
        assert_eq!(c.binary("/", &Value::Int(Integer::new()), 64), Err("division by zero"));
    }

    #[test]
    fn test_integer_power_is_capped() {
        let ten = Value::Int(Integer::from(10));
        let huge = Value::Int(Integer::from(4_000_000_000u32));
        assert_eq!(ten.binary("**", &huge, 64), Err("exponent too large"));

        let one = Value::Int(Integer::from(1));
        assert_eq!(one.binary("**", &huge, 64).unwrap(), Value::Int(Integer::from(1)));
        let two = Value::Int(Integer::from(2));
        let p = two.binary("**", &Value::Int(Integer::from(100)), 64).unwrap();
        assert_eq!(p, Value::Int(Integer::from(1) << 100u32));
    }

    #[test]
    fn test_format_in_output_base() {
        let v = Value::Int(Integer::from(255));
        assert_eq!(v.format(16), "ff");
        assert_eq!(v.format(0), "255");
        assert_eq!(v.format(2), "11111111");
    }
}
