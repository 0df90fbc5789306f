//! `)get`: running a file of statements inside the current session.

use std::cell::Cell;
use std::fs;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::calc_session::Session;
use crate::calc_types::{CalcError, Location};

/// How many `)get` files may be running inside each other at once.
pub const MAX_GET_DEPTH: usize = 10;

/// Holds one level of `)get` nesting for as long as it lives.
pub struct DepthGuard {
    counter: Rc<Cell<usize>>,
    depth: usize,
}

impl DepthGuard {
    pub fn enter(counter: Rc<Cell<usize>>) -> Self {
        let depth = counter.get() + 1;
        counter.set(depth);
        DepthGuard { counter, depth }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        self.counter.set(self.counter.get() - 1);
    }
}

/// Runs every statement in `path`, in order, against `session`.
///
/// User errors raised by the file (including a missing file or nesting too
/// deep) stop this file from the failing statement on: they are printed and
/// `Ok` comes back, so the caller goes on with its own next statement.
/// Internal errors are returned untouched and keep propagating.
pub fn run_from_file(
    session: &mut Session,
    path: &str,
    caller: &Location,
) -> Result<(), CalcError> {
    match load(session, path, caller) {
        Err(e) if e.is_recoverable() => session.print_error(&e),
        other => other,
    }
}

/// Runs `path` under one more level of nesting and hands back whatever error
/// stopped it.
pub(crate) fn load(session: &mut Session, path: &str, caller: &Location) -> Result<(), CalcError> {
    let guard = DepthGuard::enter(session.get_depth_counter());
    debug!(path, depth = guard.depth(), "get: enter");

    let result = run_nested(session, path, caller, guard.depth());
    if let Err(e) = &result {
        warn!(path, depth = guard.depth(), error = e.message(), "get: aborted");
    }

    debug!(path, depth = guard.depth(), "get: exit");
    result
}

fn run_nested(
    session: &mut Session,
    path: &str,
    caller: &Location,
    depth: usize,
) -> Result<(), CalcError> {
    if depth > MAX_GET_DEPTH {
        return Err(CalcError::Resource {
            message: format!("get {:?} nested too deep", path),
            location: caller.clone(),
        });
    }
    let text = fs::read_to_string(path).map_err(|e| CalcError::Resource {
        message: format!("open {}: {}", path, e),
        location: caller.clone(),
    })?;

    for (index, line) in text.split_inclusive('\n').enumerate() {
        session.run_line(path, index + 1, line)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_releases_on_drop() {
        let counter = Rc::new(Cell::new(0));
        {
            let outer = DepthGuard::enter(Rc::clone(&counter));
            assert_eq!(outer.depth(), 1);
            let inner = DepthGuard::enter(Rc::clone(&counter));
            assert_eq!(inner.depth(), 2);
            assert_eq!(counter.get(), 2);
        }
        assert_eq!(counter.get(), 0);
    }

    #[test]
    fn test_guard_releases_on_unwind() {
        let counter = Rc::new(Cell::new(0));
        let inner = Rc::clone(&counter);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _guard = DepthGuard::enter(inner);
            panic!("boom");
        }));
        assert!(result.is_err());
        assert_eq!(counter.get(), 0);
    }
}
