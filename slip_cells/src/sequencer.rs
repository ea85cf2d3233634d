//! Sequencers
//!
//! A sequencer is a cursor over cells that moves along one of twelve axes:
//!
//! | scope      | target  | stops at                      |
//! |------------|---------|-------------------------------|
//! | linear     | element | datum cells and the header    |
//! | linear     | name    | sublist cells and the header  |
//! | linear     | word    | every cell                    |
//! | structural | ...     | as linear, but a step from a sublist cell first enters the list it names |
//!
//! times left or right. Structural moves never climb back out of a nested list: reaching
//! a nested header stops there, and returning to the enclosing list is up to the caller
//! (or to a `Reader`, which does the bookkeeping).

use hashbrown::HashSet;

use crate::{
    avsl::Avsl,
    cell::Payload,
    error::SlipResult,
    handle::{CellId, ListHandle},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Stay within the current list
    Linear,
    /// Descend into the list a sublist cell names before stepping
    Structural,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Target {
    /// Skip sublist cells
    Element,
    /// Skip datum cells
    Name,
    /// Skip nothing
    Word,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Left,
    Right,
}

/// A cursor over cells
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Sequencer {
    current: CellId,
}

impl Sequencer {
    pub fn new(at: CellId) -> Sequencer {
        Sequencer { current: at }
    }

    /// A sequencer positioned on a list's header
    pub fn on_list(list: ListHandle) -> Sequencer {
        Sequencer { current: list.id() }
    }

    #[inline]
    pub fn current(&self) -> CellId {
        self.current
    }

    pub fn reposition(&mut self, at: CellId) {
        self.current = at;
    }

    #[inline]
    pub fn is_at_header(&self, avsl: &Avsl) -> bool {
        avsl.is_header(self.current)
    }

    /// Move to the next cell along the given axis and return it
    #[track_caller]
    pub fn advance(
        &mut self,
        avsl: &Avsl,
        scope: Scope,
        target: Target,
        direction: Direction,
    ) -> SlipResult<CellId> {
        let index = avsl.live("advance", self.current)?;
        let next = avsl.advance_index(index, scope, target, direction);
        self.current = avsl.id_at(next);
        Ok(self.current)
    }
}

macro_rules! advance_axes {
    ($($name:ident => $scope:ident, $target:ident, $direction:ident;)*) => {
        impl Sequencer {
            $(
                #[doc = concat!(
                    "`advance(", stringify!($scope), ", ", stringify!($target), ", ",
                    stringify!($direction), ")`"
                )]
                #[track_caller]
                #[inline]
                pub fn $name(&mut self, avsl: &Avsl) -> SlipResult<CellId> {
                    self.advance(avsl, Scope::$scope, Target::$target, Direction::$direction)
                }
            )*
        }
    };
}

advance_axes! {
    advance_ler => Linear, Element, Right;
    advance_lel => Linear, Element, Left;
    advance_lnr => Linear, Name, Right;
    advance_lnl => Linear, Name, Left;
    advance_lwr => Linear, Word, Right;
    advance_lwl => Linear, Word, Left;
    advance_ser => Structural, Element, Right;
    advance_sel => Structural, Element, Left;
    advance_snr => Structural, Name, Right;
    advance_snl => Structural, Name, Left;
    advance_swr => Structural, Word, Right;
    advance_swl => Structural, Word, Left;
}

impl Avsl {
    /// Core stepping loop shared by sequencers, readers and structural comparison.
    ///
    /// `start` must be live. Always stops at a header. A structural element walk over
    /// lists that contain only sublists leading back into each other stops at the first
    /// header it would enter twice.
    pub(crate) fn advance_index(
        &self,
        start: u32,
        scope: Scope,
        target: Target,
        direction: Direction,
    ) -> u32 {
        let mut index = start;
        let mut entered = HashSet::new();
        loop {
            if scope == Scope::Structural {
                if let Some(list) = self.slot(index).sublist() {
                    if !entered.insert(list.index()) {
                        return list.index();
                    }
                    index = list.index();
                }
            }

            index = self.neighbor(index, direction);
            match self.slot(index).payload {
                Payload::Sublist(_) if target == Target::Element => {}
                Payload::Datum(_) if target == Target::Name => {}
                Payload::Reader(_) if target != Target::Word => {}
                _ => return index,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_axes_skip_by_role() {
        let mut avsl = Avsl::default();
        let list = avsl.new_list().unwrap();
        let inner = avsl.new_list().unwrap();
        let a = avsl.enqueue(list, 1).unwrap();
        let s = avsl.enqueue(list, inner).unwrap();
        let b = avsl.enqueue(list, 2).unwrap();

        let mut seq = Sequencer::on_list(list);
        assert_eq!(seq.advance_ler(&avsl).unwrap(), a);
        assert_eq!(seq.advance_ler(&avsl).unwrap(), b);
        assert_eq!(seq.advance_ler(&avsl).unwrap(), list.id());

        let mut seq = Sequencer::on_list(list);
        assert_eq!(seq.advance_lnr(&avsl).unwrap(), s);
        assert_eq!(seq.advance_lnr(&avsl).unwrap(), list.id());

        let mut seq = Sequencer::new(b);
        assert_eq!(seq.advance_lwl(&avsl).unwrap(), s);
        assert_eq!(seq.advance_lel(&avsl).unwrap(), a);
    }

    #[test]
    fn test_structural_step_enters_sublist() {
        let mut avsl = Avsl::default();
        let list = avsl.new_list().unwrap();
        let inner = avsl.new_list().unwrap();
        let x = avsl.enqueue(inner, 'x').unwrap();
        let s = avsl.enqueue(list, inner).unwrap();

        let mut seq = Sequencer::new(s);
        assert_eq!(seq.advance_ser(&avsl).unwrap(), x);
        // Nested header stops the walk; climbing out is up to the caller
        assert_eq!(seq.advance_ser(&avsl).unwrap(), inner.id());
        assert!(seq.is_at_header(&avsl));
    }
}
