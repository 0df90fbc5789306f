use std::cell::{Cell, RefCell};
use std::io::{self, Write};
use std::rc::Rc;

use tracing::debug;

use crate::calc_config::{Config, DebugFlag};
use crate::calc_context::Context;
use crate::calc_lexer::Lexer;
use crate::calc_loader::load;
use crate::calc_parser::{Line, Parser};
use crate::calc_types::{CalcError, Location, Value};

/// In-memory sink that can be handed to a session and read back afterwards.
#[derive(Clone, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    pub fn new() -> Self {
        SharedBuffer::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }

    /// Returns everything written so far and empties the buffer.
    pub fn take(&self) -> String {
        let bytes = std::mem::take(&mut *self.0.borrow_mut());
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// One interpreter session.
///
/// Files pulled in with `)get` run against this same session: they see and
/// change the same configuration, definitions and variables as the caller,
/// and whatever they change stays changed after they return.
pub struct Session {
    pub config: Config,
    pub context: Context,
    get_depth: Rc<Cell<usize>>,
    out: Box<dyn Write>,
    err: Box<dyn Write>,
}

impl Session {
    pub fn new(config: Config, out: Box<dyn Write>, err: Box<dyn Write>) -> Self {
        Session {
            config,
            context: Context::new(),
            get_depth: Rc::new(Cell::new(0)),
            out,
            err,
        }
    }

    pub fn stdio(config: Config) -> Self {
        Session::new(config, Box::new(io::stdout()), Box::new(io::stderr()))
    }

    /// Session writing to two in-memory buffers, returned alongside it.
    pub fn buffered(config: Config) -> (Session, SharedBuffer, SharedBuffer) {
        let out = SharedBuffer::new();
        let err = SharedBuffer::new();
        let session = Session::new(config, Box::new(out.clone()), Box::new(err.clone()));
        (session, out, err)
    }

    pub fn out(&mut self) -> &mut dyn Write {
        &mut *self.out
    }

    pub fn err(&mut self) -> &mut dyn Write {
        &mut *self.err
    }

    /// Number of `)get` files currently being run.
    pub fn get_depth(&self) -> usize {
        self.get_depth.get()
    }

    pub(crate) fn get_depth_counter(&self) -> Rc<Cell<usize>> {
        Rc::clone(&self.get_depth)
    }

    pub fn print_value(&mut self, value: &Value) -> Result<(), CalcError> {
        let (_, obase) = self.config.base();
        if self.config.debug(DebugFlag::Types) {
            write!(self.out, "({}) ", value.type_name())?;
        }
        writeln!(self.out, "{}", value.format(obase))?;
        Ok(())
    }

    /// Prints a user error and swallows it. Defects, and every error while the
    /// `panic` debug flag is on, are handed back to the caller instead.
    pub fn report(&mut self, error: CalcError) -> Result<(), CalcError> {
        if !error.is_recoverable() || self.config.debug(DebugFlag::Panic) {
            return Err(error);
        }
        self.print_error(&error)
    }

    pub(crate) fn print_error(&mut self, error: &CalcError) -> Result<(), CalcError> {
        writeln!(self.err, "{}", error)?;
        Ok(())
    }

    /// Runs `text` the way the interactive loop does: a failing statement is
    /// reported and the next one runs.
    pub fn run_source(&mut self, name: &str, text: &str) -> Result<(), CalcError> {
        self.run_source_from(name, 1, text)
    }

    /// Like [`Session::run_source`], with `text` starting on line `first_line`.
    pub fn run_source_from(
        &mut self,
        name: &str,
        first_line: usize,
        text: &str,
    ) -> Result<(), CalcError> {
        debug!(name, first_line, "running source");
        for (offset, line) in text.split_inclusive('\n').enumerate() {
            if let Err(e) = self.run_line(name, first_line + offset, line) {
                self.report(e)?;
            }
        }
        Ok(())
    }

    /// Scans and runs a single line of input, printing the value of its
    /// statement if it has one.
    ///
    /// Lines are scanned one at a time, so a bad character on one line
    /// cannot keep the lines before it from running.
    pub(crate) fn run_line(
        &mut self,
        name: &str,
        line_number: usize,
        line: &str,
    ) -> Result<(), CalcError> {
        let tokens = Lexer::new(name, line).starting_at(line_number).tokenize()?;
        let mut parser = Parser::new(self, name, tokens);
        loop {
            match parser.line()? {
                Line::Value(value) => parser.session.print_value(&value)?,
                Line::Empty => {}
                Line::Eof => return Ok(()),
            }
        }
    }

    /// Runs a file named on the command line.
    ///
    /// Like `)get "path"`, except that an error stopping the file is treated
    /// as a top-level statement error, so the `panic` debug flag applies.
    pub fn run_file(&mut self, path: &str) -> Result<(), CalcError> {
        let caller = Location::new("<command line>", 0);
        match load(self, path, &caller) {
            Err(e) => self.report(e),
            Ok(()) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_statements_print_values() {
        let (mut session, out, err) = Session::buffered(Config::with_seed(1));
        session.run_source("<test>", "2 + 3\nx = 4\nx * x\n").unwrap();
        assert_eq!(out.contents(), "5\n16\n");
        assert_eq!(err.contents(), "");
    }

    #[test]
    fn test_error_aborts_only_current_statement() {
        let (mut session, out, err) = Session::buffered(Config::with_seed(1));
        session.run_source("<test>", "1 / 0\n7\n").unwrap();
        assert_eq!(out.contents(), "7\n");
        assert_eq!(err.contents(), "<test>:1: division by zero\n");
    }

    #[test]
    fn test_lexer_error_is_reported() {
        let (mut session, out, err) = Session::buffered(Config::with_seed(1));
        session.run_source("<test>", "3 $ 4\n").unwrap();
        assert_eq!(out.contents(), "");
        assert!(err.contents().starts_with("<test>:1: unexpected character"));
    }

    #[test]
    fn test_lines_before_a_bad_character_still_run() {
        let (mut session, out, err) = Session::buffered(Config::with_seed(1));
        session.run_source("<test>", "1\n)prec 50\n3 $\n)prec\n").unwrap();
        assert_eq!(out.contents(), "1\n50\n");
        assert_eq!(session.config.float_prec(), 50);
        assert_eq!(err.contents(), "<test>:3: unexpected character: '$'\n");
    }

    #[test]
    fn test_line_numbers_continue_from_first_line() {
        let (mut session, _out, err) = Session::buffered(Config::with_seed(1));
        session.run_source_from("<stdin>", 7, "2\n1 / 0\n").unwrap();
        assert_eq!(err.contents(), "<stdin>:8: division by zero\n");
    }

    #[test]
    fn test_types_flag_prefixes_output() {
        let (mut session, out, _err) = Session::buffered(Config::with_seed(1));
        session.config.set_debug(DebugFlag::Types, true);
        session.run_source("<test>", "3\n1.5\n").unwrap();
        let text = out.take();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "(int) 3");
        assert!(lines[1].starts_with("(float) 1.5"));
        assert_eq!(out.contents(), "");
    }

    #[test]
    fn test_panic_flag_makes_errors_fatal() {
        let (mut session, _out, _err) = Session::buffered(Config::with_seed(1));
        session.config.set_debug(DebugFlag::Panic, true);
        let result = session.run_source("<test>", ")prec 0\n");
        assert!(matches!(result, Err(CalcError::Range { .. })));
    }

    #[test]
    fn test_output_base() {
        let (mut session, out, _err) = Session::buffered(Config::with_seed(1));
        session.run_source("<test>", ")obase 16\n255\n").unwrap();
        assert_eq!(out.contents(), "ff\n");
    }
}
