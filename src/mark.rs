//! C1: mark allocator.
//!
//! Hands out strictly increasing 1-origin integers for two independent
//! purposes — dense "serial" numbers assigned to every exportable object in
//! allocation order, and "mark" numbers assigned at emission time and
//! referenced in the output stream as `:N`. `MarkAllocator` also keeps the
//! `serial -> mark` map (`markmap` in the original C implementation) so a
//! mark can be looked up once it has been assigned.

use crate::error::ExportError;
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Serial(u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Mark(u64);

impl Serial {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl Mark {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Mark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Default)]
pub struct MarkAllocator {
    next_serial: u64,
    next_mark: u64,
    markmap: HashMap<Serial, Mark>,
}

impl MarkAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next positive serial, starting at 1. Slot 0 is reserved
    /// and never handed out.
    pub fn next_serial(&mut self) -> Result<Serial, ExportError> {
        self.next_serial = self
            .next_serial
            .checked_add(1)
            .ok_or(ExportError::SerialOverflow)?;
        Ok(Serial(self.next_serial))
    }

    pub fn next_mark(&mut self) -> Result<Mark, ExportError> {
        self.next_mark = self
            .next_mark
            .checked_add(1)
            .ok_or(ExportError::MarkOverflow)?;
        Ok(Mark(self.next_mark))
    }

    /// Records `markmap[s] = next_mark()` and returns the freshly allocated
    /// mark.
    pub fn assign_mark(&mut self, serial: Serial) -> Result<Mark, ExportError> {
        let mark = self.next_mark()?;
        self.markmap.insert(serial, mark);
        Ok(mark)
    }

    /// Returns the stored mark for `serial`, or `None` if it has not been
    /// assigned yet.
    pub fn lookup(&self, serial: Serial) -> Option<Mark> {
        self.markmap.get(&serial).copied()
    }

    /// Returns the stored mark, failing if one has not been assigned yet.
    /// Every call site that writes a `:N` reference to the stream must use
    /// this rather than `lookup` so a bug that would violate P1 (mark
    /// defined before use) is caught immediately instead of silently
    /// emitting `:0`.
    pub fn require(&self, serial: Serial) -> Result<Mark, ExportError> {
        self.lookup(serial)
            .ok_or(ExportError::MarkNotAssigned(serial.get()))
    }

    /// Total number of marks handed out so far.
    pub fn mark_count(&self) -> u64 {
        self.next_mark
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marks_are_dense_and_one_origin() {
        let mut alloc = MarkAllocator::new();
        assert_eq!(alloc.next_mark().unwrap().get(), 1);
        assert_eq!(alloc.next_mark().unwrap().get(), 2);
        assert_eq!(alloc.next_mark().unwrap().get(), 3);
    }

    #[test]
    fn assign_and_lookup_roundtrip() {
        let mut alloc = MarkAllocator::new();
        let s = alloc.next_serial().unwrap();
        assert_eq!(alloc.lookup(s), None);
        let m = alloc.assign_mark(s).unwrap();
        assert_eq!(alloc.lookup(s), Some(m));
    }

    #[test]
    fn require_fails_before_assignment() {
        let mut alloc = MarkAllocator::new();
        let s = alloc.next_serial().unwrap();
        assert!(alloc.require(s).is_err());
    }
}
