//! Header bookkeeping
//!
//! Every list header carries a reference count, a mark word and an optional descriptor
//! list. The mark word holds a 15 bit user tag plus the visited bit used to guard
//! recursive traversals against cyclic sublist graphs.

use bitflags::bitflags;

use crate::handle::CellId;

bitflags! {
    /// Mark word of a header.
    ///
    /// Only `VISITED` is named; the low 15 bits are a free-form user tag and are kept
    /// with `from_bits_retain`.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Mark: u16 {
        /// Set while a recursive traversal is inside this list
        const VISITED = 1 << 15;
    }
}

impl Mark {
    /// Bits available to users
    pub const USER_MASK: u16 = 0x7fff;

    /// The user tag
    #[inline]
    pub fn user(self) -> u16 {
        self.bits() & Self::USER_MASK
    }

    /// Replace the user tag, keeping the visited bit
    #[inline]
    pub fn with_user(self, tag: u16) -> Mark {
        Mark::from_bits_retain((self.bits() & !Self::USER_MASK) | (tag & Self::USER_MASK))
    }

    #[inline]
    pub fn is_visited(self) -> bool {
        self.contains(Mark::VISITED)
    }
}

/// Checked reference count.
///
/// Counts holders beyond the first: zero means the next `delete_list` reclaims.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct RefCount(u32);

impl RefCount {
    pub const ZERO: RefCount = RefCount(0);

    #[inline]
    pub fn get(self) -> u32 {
        self.0
    }

    /// Add a holder. Returns `None` on overflow, leaving the count untouched.
    #[inline]
    pub fn increment(&mut self) -> Option<u32> {
        self.0 = self.0.checked_add(1)?;
        Some(self.0)
    }

    /// Drop a holder. Returns `None` on underflow, leaving the count untouched.
    #[inline]
    pub fn decrement(&mut self) -> Option<u32> {
        self.0 = self.0.checked_sub(1)?;
        Some(self.0)
    }

    #[inline]
    pub fn is_shared(self) -> bool {
        self.0 > 0
    }
}

/// Fields stored in the payload of a header cell.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HeaderFields {
    pub(crate) ref_count: RefCount,
    pub(crate) mark: Mark,
    pub(crate) descriptor: Option<CellId>,
    /// Set on a descriptor list: the list that owns it
    pub(crate) owner: Option<CellId>,
}

impl HeaderFields {
    /// Fields of a fresh list: unshared, unmarked, no descriptor list and no owner
    pub const fn new() -> HeaderFields {
        HeaderFields {
            ref_count: RefCount::ZERO,
            mark: Mark::empty(),
            descriptor: None,
            owner: None,
        }
    }

    #[inline]
    pub fn ref_count(&self) -> RefCount {
        self.ref_count
    }

    #[inline]
    pub fn mark(&self) -> Mark {
        self.mark
    }

    #[inline]
    pub fn descriptor(&self) -> Option<CellId> {
        self.descriptor
    }

    #[inline]
    pub fn owner(&self) -> Option<CellId> {
        self.owner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_user_bits() {
        let mark = Mark::empty().with_user(0x1234);
        assert_eq!(mark.user(), 0x1234);
        assert!(!mark.is_visited());

        let visited = mark | Mark::VISITED;
        assert!(visited.is_visited());
        assert_eq!(visited.user(), 0x1234);

        // The visited bit is out of reach of the user tag
        let clobbered = visited.with_user(0xffff);
        assert!(clobbered.is_visited());
        assert_eq!(clobbered.user(), 0x7fff);
    }

    #[test]
    fn test_ref_count_checked() {
        let mut count = RefCount::ZERO;
        assert_eq!(count.decrement(), None);
        assert_eq!(count.get(), 0);

        assert_eq!(count.increment(), Some(1));
        assert!(count.is_shared());
        assert_eq!(count.decrement(), Some(0));

        let mut full = RefCount(u32::MAX);
        assert_eq!(full.increment(), None);
        assert_eq!(full.get(), u32::MAX);
    }
}
