//! Boxed opaque handles (spec.md §3: `Dict`, `Ref`, `File`, `Fd`, `Vm`).
//!
//! These are "opaque handle[s] with reference counting and a
//! type-dispatched printer" per spec.md — what they actually *hold* is
//! the host interpreter's business (a real dict/symbol table, an actual
//! open file, a nested VM instance, ...). This crate only owns their
//! lifecycle and printing.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

/// Which kind of opaque handle this is, for the type-dispatched printer
/// (spec.md §3, §6.1 `fprintf_value`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleKind {
    Dict,
    Ref,
    File,
    Fd,
    Vm,
}

impl HandleKind {
    pub fn name(self) -> &'static str {
        match self {
            HandleKind::Dict => "dict",
            HandleKind::Ref => "ref",
            HandleKind::File => "file",
            HandleKind::Fd => "fd",
            HandleKind::Vm => "vm",
        }
    }
}

fn next_handle_id() -> u64 {
    static COUNTER: AtomicU64 = AtomicU64::new(1);
    COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Shared state of an opaque handle value.
///
/// `no_close` models spec.md §9's "Global FD singletons": the three
/// standard streams are long-lived refcounted values whose refcount must
/// never be allowed to reach zero through normal release.
#[derive(Debug)]
pub struct HandleData {
    pub kind: HandleKind,
    id: u64,
    no_close: bool,
}

impl HandleData {
    pub fn new(kind: HandleKind) -> Self {
        HandleData { kind, id: next_handle_id(), no_close: false }
    }

    fn new_no_close(kind: HandleKind) -> Self {
        HandleData { kind, id: next_handle_id(), no_close: true }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether this handle may be released through normal refcount
    /// decrements (false only for the standard-stream singletons).
    pub fn closeable(&self) -> bool {
        !self.no_close
    }
}

impl std::fmt::Display for HandleData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<{} #{}>", self.kind.name(), self.id)
    }
}

/// A refcounted, opaque handle value. Clone is `O(1)` (shares the `Arc`).
pub type Handle = Arc<HandleData>;

pub fn new_handle(kind: HandleKind) -> Handle {
    Arc::new(HandleData::new(kind))
}

/// The three long-lived standard-stream `Fd` singletons (spec.md §9).
/// Never dropped to zero refcount through ordinary release: holding an
/// `Arc` to one of these is always safe to clone and discard freely.
pub fn stdin_fd() -> Handle {
    static STDIN: OnceLock<Handle> = OnceLock::new();
    STDIN.get_or_init(|| Arc::new(HandleData::new_no_close(HandleKind::Fd))).clone()
}

pub fn stdout_fd() -> Handle {
    static STDOUT: OnceLock<Handle> = OnceLock::new();
    STDOUT.get_or_init(|| Arc::new(HandleData::new_no_close(HandleKind::Fd))).clone()
}

pub fn stderr_fd() -> Handle {
    static STDERR: OnceLock<Handle> = OnceLock::new();
    STDERR.get_or_init(|| Arc::new(HandleData::new_no_close(HandleKind::Fd))).clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clone_is_cheap_and_shares_identity() {
        let h = new_handle(HandleKind::Dict);
        let h2 = h.clone();
        assert_eq!(Arc::strong_count(&h), 2);
        assert_eq!(h.id(), h2.id());
    }

    #[test]
    fn distinct_handles_get_distinct_ids() {
        let a = new_handle(HandleKind::Ref);
        let b = new_handle(HandleKind::Ref);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn standard_streams_are_singletons_and_not_closeable() {
        let a = stdout_fd();
        let b = stdout_fd();
        assert_eq!(a.id(), b.id());
        assert!(!a.closeable());
    }

    #[test]
    fn display_is_type_dispatched() {
        let d = new_handle(HandleKind::Dict);
        let v = new_handle(HandleKind::Vm);
        assert!(format!("{d}").starts_with("<dict"));
        assert!(format!("{v}").starts_with("<vm"));
    }
}
