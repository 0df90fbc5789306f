//! The `)` commands that inspect and change session settings.

use std::fmt;
use std::io::Write;

use tracing::debug;

use crate::calc_config::{check_base, check_origin, check_prec, DebugFlag, DEBUG_FLAGS};
use crate::calc_loader::run_from_file;
use crate::calc_parser::Parser;
use crate::calc_types::{CalcError, TokenKind, Value};

pub const HELP_TEXT: &str = "\
Special commands start with a right paren and run to the end of the line.
Without an argument most of them print the current setting.

)help
\tPrint this text.
)base 0
)base 10
\tSet both input and output base; 0 means decimal.
)ibase 16
)obase 16
\tSet the input or the output base alone.
)debug
)debug name
)debug name 0
\tList the debug flags, toggle one, or set it. Flags: panic, parse, tokens, types.
)format \"%.12g\"
\tSet the output format string.
)get \"file.ivy\"
\tRead commands and statements from the named file.
)op name
\tShow the definitions of the operator called name.
)origin 1
\tSet the index origin, 0 or 1.
)prec 256
\tSet the floating-point precision in bits, 1 to 1000000.
)prompt \"> \"
\tSet the interactive prompt.
)seed 1
\tSet the seed of the random number generator.";

/// Every command that may follow the `)` marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    Help,
    Base,
    Ibase,
    Obase,
    Debug,
    Format,
    Get,
    Op,
    Origin,
    Prec,
    Prompt,
    Seed,
}

impl Directive {
    pub fn from_name(name: &str) -> Option<Directive> {
        let directive = match name {
            "help" => Directive::Help,
            "base" => Directive::Base,
            "ibase" => Directive::Ibase,
            "obase" => Directive::Obase,
            "debug" => Directive::Debug,
            "format" => Directive::Format,
            "get" => Directive::Get,
            "op" => Directive::Op,
            "origin" => Directive::Origin,
            "prec" => Directive::Prec,
            "prompt" => Directive::Prompt,
            "seed" => Directive::Seed,
            _ => return None,
        };
        Some(directive)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Directive::Help => "help",
            Directive::Base => "base",
            Directive::Ibase => "ibase",
            Directive::Obase => "obase",
            Directive::Debug => "debug",
            Directive::Format => "format",
            Directive::Get => "get",
            Directive::Op => "op",
            Directive::Origin => "origin",
            Directive::Prec => "prec",
            Directive::Prompt => "prompt",
            Directive::Seed => "seed",
        }
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "){}", self.name())
    }
}

impl<'s> Parser<'s> {
    /// Runs one `)` command line, newline included.
    pub(crate) fn special(&mut self) -> Result<(), CalcError> {
        self.need_right_paren()?;
        let location = self.loc();
        let text = self.need_identifier()?;
        let directive = match Directive::from_name(&text) {
            Some(directive) => directive,
            None => {
                return Err(CalcError::Syntax {
                    message: format!("){}: not recognized", text),
                    location,
                });
            }
        };
        debug!(directive = directive.name(), file = %self.file, "directive");

        match directive {
            Directive::Help => {
                writeln!(self.session.out(), "{}", HELP_TEXT)?;
            }
            Directive::Base | Directive::Ibase | Directive::Obase => {
                let (mut ibase, mut obase) = self.session.config.base();
                if self.peek_is_newline() {
                    writeln!(self.session.out(), "ibase\t{}", ibase)?;
                    writeln!(self.session.out(), "obase\t{}", obase)?;
                } else {
                    let base = self.next_decimal_number()?;
                    let base = check_base(base).map_err(|m| self.range(&m))?;
                    match directive {
                        Directive::Base => {
                            ibase = base;
                            obase = base;
                        }
                        Directive::Ibase => ibase = base,
                        _ => obase = base,
                    }
                    self.session.config.set_base(ibase, obase);
                }
            }
            Directive::Debug => self.debug_flags()?,
            Directive::Format => {
                if self.peek_is_newline() {
                    let format = self.session.config.format().to_string();
                    writeln!(self.session.out(), "{:?}", format)?;
                } else {
                    let format = self.need_string()?;
                    self.session.config.set_format(&format);
                }
            }
            Directive::Get => {
                let path = self.need_string()?;
                if !self.peek_is_newline() {
                    return Err(self.unexpected("newline"));
                }
                run_from_file(self.session, &path, &location)?;
            }
            Directive::Op => {
                let name = self.need_identifier()?;
                if !self.session.context.is_defined(&name) {
                    return Err(CalcError::Syntax {
                        message: format!("{:?} not defined", name),
                        location,
                    });
                }
                let unary = self.session.context.unary(&name).map(|f| f.to_string());
                let binary = self.session.context.binary(&name).map(|f| f.to_string());
                for def in unary.iter().chain(binary.iter()) {
                    writeln!(self.session.out(), "{}", def)?;
                }
            }
            Directive::Origin => {
                if self.peek_is_newline() {
                    let origin = self.session.config.origin();
                    writeln!(self.session.out(), "{}", origin)?;
                } else {
                    let origin = self.next_decimal_number()?;
                    let origin = check_origin(origin).map_err(|m| self.range(&m))?;
                    self.session.config.set_origin(origin);
                }
            }
            Directive::Prec => {
                if self.peek_is_newline() {
                    let prec = self.session.config.float_prec();
                    writeln!(self.session.out(), "{}", prec)?;
                } else {
                    let prec = self.next_decimal_number()?;
                    let prec = check_prec(prec).map_err(|m| self.range(&m))?;
                    self.session.config.set_float_prec(prec);
                }
            }
            Directive::Prompt => {
                if self.peek_is_newline() {
                    let prompt = self.session.config.prompt().to_string();
                    writeln!(self.session.out(), "{:?}", prompt)?;
                } else {
                    let prompt = self.need_string()?;
                    self.session.config.set_prompt(&prompt);
                }
            }
            Directive::Seed => {
                if self.peek_is_newline() {
                    let seed = self.session.config.seed();
                    writeln!(self.session.out(), "{}", seed)?;
                } else {
                    let seed = self.next_decimal_number()?;
                    self.session.config.set_seed(seed);
                }
            }
        }

        self.need_newline()
    }

    fn debug_flags(&mut self) -> Result<(), CalcError> {
        if self.peek_is_newline() {
            for flag in DEBUG_FLAGS {
                let value = self.session.config.debug(flag) as u8;
                writeln!(self.session.out(), "{}\t{}", flag, value)?;
            }
            return Ok(());
        }
        let name = self.need_identifier()?;
        let flag = match DebugFlag::from_name(&name) {
            Some(flag) => flag,
            None => {
                writeln!(self.session.out(), "no such debug flag: {}", name)?;
                return Ok(());
            }
        };
        if self.peek_is_newline() {
            let value = !self.session.config.debug(flag);
            self.session.config.set_debug(flag, value);
            writeln!(self.session.out(), "{}", value as u8)?;
        } else {
            let number = self.next_decimal_number()?;
            self.session.config.set_debug(flag, number != 0);
        }
        Ok(())
    }

    /// Reads an integer argument in base 10 whatever the session's input base.
    /// The input base is put back afterwards; the output base is left alone.
    fn next_decimal_number(&mut self) -> Result<i64, CalcError> {
        let (ibase, obase) = self.session.config.base();
        self.session.config.set_base(10, obase);
        let result = self.read_integer();
        let (_, obase) = self.session.config.base();
        self.session.config.set_base(ibase, obase);
        result
    }

    fn read_integer(&mut self) -> Result<i64, CalcError> {
        let negative = matches!(self.peek_kind(), Some(TokenKind::Operator(op)) if op == "-");
        if negative {
            self.advance();
        }
        let text = self.need_number()?;
        let (ibase, _) = self.session.config.base();
        let prec = self.session.config.float_prec();
        let value = Value::parse(&text, ibase, prec).map_err(|m| self.syntax(&m))?;
        match value {
            Value::Int(i) => {
                let i = if negative { -i } else { i };
                i.to_i64().ok_or_else(|| self.range(&format!("value out of range: {}", i)))
            }
            other => Err(self.syntax(&format!("value must be an integer: {}", other))),
        }
    }
}
