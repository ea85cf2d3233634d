//! Cells
//!
//! A cell is the unit of allocation and the atom of list structure: two link slots plus a
//! payload. The payload variant fixes the cell's role (header, sublist, datum or
//! reader-private), so there is no separate tag to keep in sync.
//!
//! Layout of a list with two members:
//!
//! ```text
//!   +--------------------------------------------------+
//!   v                                                  |
//! [header] <-> [datum 1] <-> [sublist] <-> (back to header)
//!                               |
//!                               v
//!                            [header of another list]
//! ```

use core::fmt;

use crate::handle::{CellId, ListHandle};
use crate::header::HeaderFields;

/// One link slot of a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Link {
    /// Index of the adjacent cell in the arena
    Linked(u32),
    /// Not part of any list
    Unlinked,
    /// Cell lives outside the arena
    Temporary,
    /// Cell is in the AVSL. In the right slot this carries the next free cell.
    Free(Option<u32>),
}

impl Link {
    #[inline]
    pub fn linked(self) -> Option<u32> {
        match self {
            Link::Linked(index) => Some(index),
            _ => None,
        }
    }

    #[inline]
    pub fn is_free(self) -> bool {
        matches!(self, Link::Free(_))
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Link::Linked(index) => write!(f, "{index:#010x}"),
            Link::Unlinked => f.write_str("unlinked"),
            Link::Temporary => f.write_str("temp"),
            Link::Free(_) => f.write_str("free"),
        }
    }
}

/// Scalar payload of a datum cell.
#[derive(Clone, Debug, PartialEq)]
pub enum Datum {
    Bool(bool),
    Char(char),
    Int(i64),
    UInt(u64),
    Real(f64),
    Str(String),
}

/// Class of a datum, used where only the shape of a list matters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DatumKind {
    Bool,
    Char,
    Int,
    UInt,
    Real,
    Str,
}

impl Datum {
    pub fn kind(&self) -> DatumKind {
        match self {
            Datum::Bool(_) => DatumKind::Bool,
            Datum::Char(_) => DatumKind::Char,
            Datum::Int(_) => DatumKind::Int,
            Datum::UInt(_) => DatumKind::UInt,
            Datum::Real(_) => DatumKind::Real,
            Datum::Str(_) => DatumKind::Str,
        }
    }
}

impl From<bool> for Datum {
    fn from(value: bool) -> Datum {
        Datum::Bool(value)
    }
}

impl From<char> for Datum {
    fn from(value: char) -> Datum {
        Datum::Char(value)
    }
}

impl From<i32> for Datum {
    fn from(value: i32) -> Datum {
        Datum::Int(value.into())
    }
}

impl From<i64> for Datum {
    fn from(value: i64) -> Datum {
        Datum::Int(value)
    }
}

impl From<u64> for Datum {
    fn from(value: u64) -> Datum {
        Datum::UInt(value)
    }
}

impl From<f64> for Datum {
    fn from(value: f64) -> Datum {
        Datum::Real(value)
    }
}

impl From<&str> for Datum {
    fn from(value: &str) -> Datum {
        Datum::Str(value.to_owned())
    }
}

impl From<String> for Datum {
    fn from(value: String) -> Datum {
        Datum::Str(value)
    }
}

/// Role of a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    Header,
    Sublist,
    Datum(DatumKind),
    Reader,
    /// Freshly allocated or free; no constructor has stamped it
    Vacant,
}

/// Payload of a cell. The variant is the cell's role.
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    Header(HeaderFields),
    /// Shared reference to a list header
    Sublist(CellId),
    Datum(Datum),
    /// Reader bookkeeping: the sublist cell a reader descended through
    Reader(CellId),
    Vacant,
}

impl Payload {
    pub fn role(&self) -> Role {
        match self {
            Payload::Header(_) => Role::Header,
            Payload::Sublist(_) => Role::Sublist,
            Payload::Datum(datum) => Role::Datum(datum.kind()),
            Payload::Reader(_) => Role::Reader,
            Payload::Vacant => Role::Vacant,
        }
    }
}

/// A cell: two links, a generation and a payload.
#[derive(Clone, Debug, PartialEq)]
pub struct Cell {
    pub(crate) left: Link,
    pub(crate) right: Link,
    pub(crate) generation: u32,
    pub(crate) payload: Payload,
}

impl Cell {
    /// A free arena cell whose right slot threads the AVSL
    #[inline]
    pub(crate) fn free(next: Option<u32>, generation: u32) -> Cell {
        Cell {
            left: Link::Free(None),
            right: Link::Free(next),
            generation,
            payload: Payload::Vacant,
        }
    }

    /// A cell living outside the arena. Its payload is copied into a fresh arena cell by
    /// `Avsl::adopt`.
    pub fn temporary(payload: Payload) -> Cell {
        Cell {
            left: Link::Temporary,
            right: Link::Temporary,
            generation: 0,
            payload,
        }
    }

    pub fn temp_datum(datum: impl Into<Datum>) -> Cell {
        Cell::temporary(Payload::Datum(datum.into()))
    }

    pub fn temp_sublist(list: ListHandle) -> Cell {
        Cell::temporary(Payload::Sublist(list.id()))
    }

    #[inline]
    pub fn left(&self) -> Link {
        self.left
    }

    #[inline]
    pub fn right(&self) -> Link {
        self.right
    }

    #[inline]
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    #[inline]
    pub fn role(&self) -> Role {
        self.payload.role()
    }

    // ========================================================================
    // Role predicates
    // ========================================================================

    #[inline]
    pub fn is_header(&self) -> bool {
        matches!(self.payload, Payload::Header(_))
    }

    #[inline]
    pub fn is_sublist(&self) -> bool {
        matches!(self.payload, Payload::Sublist(_))
    }

    #[inline]
    pub fn is_data(&self) -> bool {
        matches!(self.payload, Payload::Datum(_))
    }

    #[inline]
    pub fn is_reader(&self) -> bool {
        matches!(self.payload, Payload::Reader(_))
    }

    /// Both links carry the free marker: the cell is in the AVSL
    #[inline]
    pub fn is_deleted(&self) -> bool {
        self.left.is_free() && self.right.is_free()
    }

    #[inline]
    pub fn is_unlinked(&self) -> bool {
        self.left == Link::Unlinked && self.right == Link::Unlinked
    }

    #[inline]
    pub fn is_temp(&self) -> bool {
        self.left == Link::Temporary && self.right == Link::Temporary
    }

    #[inline]
    pub fn is_linked(&self) -> bool {
        self.left.linked().is_some() && self.right.linked().is_some()
    }

    #[inline]
    pub(crate) fn header(&self) -> Option<&HeaderFields> {
        match &self.payload {
            Payload::Header(fields) => Some(fields),
            _ => None,
        }
    }

    #[inline]
    pub(crate) fn header_mut(&mut self) -> Option<&mut HeaderFields> {
        match &mut self.payload {
            Payload::Header(fields) => Some(fields),
            _ => None,
        }
    }

    #[inline]
    pub(crate) fn sublist(&self) -> Option<CellId> {
        match self.payload {
            Payload::Sublist(list) => Some(list),
            _ => None,
        }
    }
}

/// The value a list member holds, as seen from outside the arena.
#[derive(Clone, Debug, PartialEq)]
pub enum Item {
    Datum(Datum),
    /// A sublist. When returned by `pop`/`dequeue` the caller now owns the hold the
    /// removed sublist cell had.
    List(ListHandle),
    /// The header itself, returned in place of a value when an empty list is popped
    /// under `ErrorPolicy::Sentinel`.
    Header(ListHandle),
}

impl Item {
    #[inline]
    pub fn is_header(&self) -> bool {
        matches!(self, Item::Header(_))
    }

    pub fn as_datum(&self) -> Option<&Datum> {
        match self {
            Item::Datum(datum) => Some(datum),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<ListHandle> {
        match self {
            Item::List(list) => Some(*list),
            _ => None,
        }
    }
}

macro_rules! item_from_datum {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Item {
                fn from(value: $ty) -> Item {
                    Item::Datum(value.into())
                }
            }
        )*
    };
}

item_from_datum!(Datum, bool, char, i32, i64, u64, f64, &str, String);

impl From<ListHandle> for Item {
    fn from(list: ListHandle) -> Item {
        Item::List(list)
    }
}
