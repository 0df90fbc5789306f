use std::str::Chars;

use lazy_static::lazy_static;
use regex::Regex;

use crate::calc_types::{CalcError, Location, Token, TokenKind};

lazy_static! {
    // Digits are checked against ibase later, when the number is evaluated.
    static ref NUMBER_SHAPE: Regex =
        Regex::new(r"^[0-9][0-9A-Za-z]*(\.[0-9A-Za-z]*)?([eE@][+-][0-9]+)?$").unwrap();
}

pub struct Lexer<'a> {
    file: &'a str,
    chars: Chars<'a>,
    current: Option<char>,
    line_number: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(file: &'a str, input: &'a str) -> Self {
        let mut chars = input.chars();
        let current = chars.next();
        Lexer {
            file,
            chars,
            current,
            line_number: 1,
        }
    }

    /// Numbers lines from `line` instead of 1, for input fed in piecemeal.
    pub fn starting_at(mut self, line: usize) -> Self {
        self.line_number = line;
        self
    }

    fn syntax_error(&self, message: String) -> CalcError {
        CalcError::Syntax {
            message,
            location: Location::new(self.file, self.line_number),
        }
    }

    fn push(&self, tokens: &mut Vec<Token>, kind: TokenKind) {
        tokens.push(Token::new(kind, self.line_number));
    }

    pub fn tokenize(&mut self) -> Result<Vec<Token>, CalcError> {
        let mut tokens = Vec::new();

        while let Some(c) = self.current {
            match c {
                ' ' | '\t' | '\r' => {
                    self.advance();
                }
                '\n' => {
                    self.push(&mut tokens, TokenKind::Newline);
                    self.advance();
                    self.line_number += 1;
                }
                '#' => {
                    // Comment runs to end of line; the newline itself is kept
                    while let Some(c) = self.current {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                '0'..='9' => {
                    let mut number = String::new();
                    while let Some(c) = self.current {
                        let exponent_sign = (c == '-' || c == '+')
                            && matches!(number.chars().last(), Some('e' | 'E' | '@'));
                        if c.is_ascii_alphanumeric() || c == '.' || exponent_sign {
                            number.push(c);
                            self.advance();
                        } else {
                            break;
                        }
                    }
                    if !NUMBER_SHAPE.is_match(&number) {
                        return Err(self.syntax_error(format!("bad number syntax: {}", number)));
                    }
                    self.push(&mut tokens, TokenKind::Number(number));
                }
                '"' => {
                    let string = self.scan_string()?;
                    self.push(&mut tokens, TokenKind::String(string));
                }
                'A'..='Z' | 'a'..='z' | '_' => {
                    let mut identifier = String::new();
                    while let Some(c) = self.current {
                        if c.is_ascii_alphanumeric() || c == '_' {
                            identifier.push(c);
                            self.advance();
                        } else {
                            break;
                        }
                    }
                    self.push(&mut tokens, TokenKind::Identifier(identifier));
                }
                '*' => {
                    self.advance();
                    if let Some('*') = self.current {
                        self.advance();
                        self.push(&mut tokens, TokenKind::Operator("**".to_string()));
                    } else {
                        self.push(&mut tokens, TokenKind::Operator("*".to_string()));
                    }
                }
                '+' | '-' | '/' | '?' | '=' => {
                    self.push(&mut tokens, TokenKind::Operator(c.to_string()));
                    self.advance();
                }
                '(' => {
                    self.push(&mut tokens, TokenKind::LeftParen);
                    self.advance();
                }
                ')' => {
                    self.push(&mut tokens, TokenKind::RightParen);
                    self.advance();
                }
                _ => {
                    return Err(self.syntax_error(format!("unexpected character: {:?}", c)));
                }
            }
        }

        // A last line without its newline still ends a statement
        if !matches!(tokens.last(), None | Some(Token { kind: TokenKind::Newline, .. })) {
            self.push(&mut tokens, TokenKind::Newline);
        }

        Ok(tokens)
    }

    fn scan_string(&mut self) -> Result<String, CalcError> {
        let mut string = String::new();
        self.advance(); // Skip opening quote

        while let Some(c) = self.current {
            match c {
                '"' => {
                    self.advance();
                    return Ok(string);
                }
                '\n' => break,
                '\\' => {
                    self.advance();
                    let escaped = match self.current {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('"') => '"',
                        Some('\\') => '\\',
                        Some(other) => {
                            return Err(self.syntax_error(format!("unknown escape \\{}", other)));
                        }
                        None => break,
                    };
                    string.push(escaped);
                    self.advance();
                }
                _ => {
                    string.push(c);
                    self.advance();
                }
            }
        }

        Err(self.syntax_error("unterminated string literal".to_string()))
    }

    fn advance(&mut self) {
        self.current = self.chars.next();
    }
}
