use std::fs;
use std::io::{self, Write};
use std::path::Path;

use bigcalc::calc_config::{Config, DebugFlag};
use bigcalc::calc_loader::MAX_GET_DEPTH;
use bigcalc::calc_session::{Session, SharedBuffer};
use bigcalc::calc_types::CalcError;
use pretty_assertions::assert_eq;
use tempfile::tempdir;

fn write_script(dir: &Path, name: &str, body: &str) -> String {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    path.to_string_lossy().into_owned()
}

fn session() -> (Session, SharedBuffer, SharedBuffer) {
    Session::buffered(Config::with_seed(3))
}

#[test]
fn self_sourcing_file_stops_at_depth_limit() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("self.ivy").to_string_lossy().into_owned();
    write_script(dir.path(), "self.ivy", &format!(")get {:?}\n1\n", path));

    let (mut s, out, err) = session();
    s.run_source("<test>", &format!(")get {:?}\n", path)).unwrap();

    assert_eq!(out.take(), "1\n".repeat(MAX_GET_DEPTH));
    let errors = err.take();
    assert_eq!(errors.lines().count(), 1);
    assert!(errors.contains("nested too deep"));
    assert!(errors.starts_with(&format!("{}:1: get", path)));
    assert_eq!(s.get_depth(), 0);

    // The session is still usable afterwards
    s.run_source("<test>", "2 + 2\n)prec\n").unwrap();
    assert_eq!(out.take(), "4\n256\n");
    assert_eq!(err.contents(), "");
}

#[test]
fn missing_file_is_reported_not_fatal() {
    let (mut s, out, err) = session();
    s.run_source("<test>", ")get \"/definitely/not/here.ivy\"\n6\n").unwrap();
    let errors = err.contents();
    assert!(errors.starts_with("<test>:1: open /definitely/not/here.ivy: "));
    assert_eq!(out.contents(), "6\n");
    assert_eq!(s.get_depth(), 0);
}

#[test]
fn settings_changed_by_a_file_persist() {
    let dir = tempdir().unwrap();
    let body = ")prec 80\n)base 16\nop double x = x + x\nsecret = 10\n";
    let path = write_script(dir.path(), "setup.ivy", body);

    let (mut s, out, _err) = session();
    s.run_source("<test>", &format!(")get {:?}\n)prec\ndouble secret\n", path)).unwrap();
    assert_eq!(s.config.float_prec(), 80);
    assert_eq!(s.config.base(), (16, 16));
    // secret was read as hex 10, doubled and printed in hex
    assert_eq!(out.contents(), "80\n20\n");
}

#[test]
fn error_in_file_stops_only_that_file() {
    let dir = tempdir().unwrap();
    let inner = write_script(dir.path(), "inner.ivy", "1\n)origin 5\n2\n");
    let outer = write_script(dir.path(), "outer.ivy", &format!(")get {:?}\n3\n", inner));

    let (mut s, out, err) = session();
    s.run_file(&outer).unwrap();
    assert_eq!(out.contents(), "1\n3\n");
    assert_eq!(err.contents(), format!("{}:2: illegal origin 5\n", inner));
    assert_eq!(s.config.origin(), 1);
    assert_eq!(s.get_depth(), 0);
}

#[test]
fn lines_before_a_bad_character_run_in_a_sourced_file() {
    let dir = tempdir().unwrap();
    let path = write_script(dir.path(), "lexbad.ivy", "1\n)prec 50\n$\n2\n");

    let (mut s, out, err) = session();
    s.run_source("<test>", &format!(")get {:?}\n3\n", path)).unwrap();
    assert_eq!(out.contents(), "1\n3\n");
    assert_eq!(s.config.float_prec(), 50);
    assert_eq!(err.contents(), format!("{}:3: unexpected character: '$'\n", path));
    assert_eq!(s.get_depth(), 0);
}

#[test]
fn get_boundary_catches_user_errors_even_with_panic_flag() {
    let dir = tempdir().unwrap();
    let inner = write_script(dir.path(), "inner.ivy", ")prec 0\n");
    let outer = write_script(dir.path(), "outer.ivy", &format!(")get {:?}\n3\n", inner));

    let (mut s, out, err) = session();
    s.config.set_debug(DebugFlag::Panic, true);
    s.run_source("<test>", &format!(")get {:?}\n", outer)).unwrap();
    assert_eq!(out.contents(), "3\n");
    assert_eq!(err.contents(), format!("{}:1: illegal prec 0\n", inner));
    assert_eq!(s.get_depth(), 0);

    // A file named on the command line is top level, so the flag applies
    let result = s.run_file(&inner);
    assert!(matches!(result, Err(CalcError::Range { .. })));
    assert_eq!(s.get_depth(), 0);
}

struct ClosedSink;

impl Write for ClosedSink {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink closed"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn internal_error_passes_every_get_boundary() {
    let dir = tempdir().unwrap();
    let inner = write_script(dir.path(), "inner.ivy", "7\n");
    let body = format!(")get {:?}\nafter_inner = 1\n", inner);
    let outer = write_script(dir.path(), "outer.ivy", &body);

    let err = SharedBuffer::new();
    let mut s = Session::new(Config::with_seed(3), Box::new(ClosedSink), Box::new(err.clone()));
    let result = s.run_source("<test>", &format!(")get {:?}\nafter_outer = 1\n", outer));

    assert!(matches!(result, Err(CalcError::Internal { .. })));
    assert!(s.context.lookup("after_inner").is_none());
    assert!(s.context.lookup("after_outer").is_none());
    assert_eq!(err.contents(), "");
    assert_eq!(s.get_depth(), 0);
}

#[test]
fn constants_warn_above_literal_precision() {
    let (mut s, out, err) = session();
    s.run_source("<test>", ")prec 20000\npi - pi\n").unwrap();
    assert!(err.contents().starts_with("warning: precision too high"));
    assert_eq!(out.contents(), "0\n");
}
