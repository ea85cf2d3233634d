//! Property-based tests for the cell arena.
//!
//! Random operation sequences are replayed against a plain `Vec` model; the arena must
//! agree with the model and pass a full audit after every step.

use proptest::prelude::*;
use slip_cells::{Avsl, Datum, Item, OptionsBuilder, SlipError};

#[derive(Clone, Debug)]
enum Op {
    Push(i64),
    Enqueue(i64),
    Pop,
    Dequeue,
    DeleteTop,
    DeleteBot,
    ReplaceTop(i64),
    ReplaceBot(i64),
    Flush,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => any::<i64>().prop_map(Op::Push),
        4 => any::<i64>().prop_map(Op::Enqueue),
        2 => Just(Op::Pop),
        2 => Just(Op::Dequeue),
        1 => Just(Op::DeleteTop),
        1 => Just(Op::DeleteBot),
        1 => any::<i64>().prop_map(Op::ReplaceTop),
        1 => any::<i64>().prop_map(Op::ReplaceBot),
        1 => Just(Op::Flush),
    ]
}

/// Small arenas so that growth happens often
fn small_avsl(initial_cells: usize, growth_delta: usize) -> Avsl {
    Avsl::new(
        OptionsBuilder::new()
            .initial_cells(initial_cells)
            .growth_delta(growth_delta)
            .build(),
    )
}

fn ints(avsl: &Avsl, list: slip_cells::ListHandle) -> Vec<i64> {
    avsl.items(list)
        .unwrap()
        .into_iter()
        .map(|item| match item {
            Item::Datum(Datum::Int(value)) => value,
            other => panic!("unexpected member {other:?}"),
        })
        .collect()
}

fn assert_empty_list<T: core::fmt::Debug>(result: Result<T, SlipError>) -> Result<(), TestCaseError> {
    prop_assert!(matches!(result, Err(SlipError::EmptyList { .. })), "got {:?}", result);
    Ok(())
}

proptest! {
    /// The arena behaves like a deque and stays consistent after every operation
    #[test]
    fn random_ops_match_model(
        ops in prop::collection::vec(op(), 1..120),
        initial_cells in 1usize..16,
        growth_delta in 1usize..8,
    ) {
        let mut avsl = small_avsl(initial_cells, growth_delta);
        let list = avsl.new_list().unwrap();
        let mut model: Vec<i64> = Vec::new();

        for op in ops {
            match op {
                Op::Push(value) => {
                    avsl.push(list, value).unwrap();
                    model.insert(0, value);
                }
                Op::Enqueue(value) => {
                    avsl.enqueue(list, value).unwrap();
                    model.push(value);
                }
                Op::Pop => {
                    let result = avsl.pop(list);
                    if model.is_empty() {
                        assert_empty_list(result)?;
                    } else {
                        prop_assert_eq!(result.unwrap(), Item::from(model.remove(0)));
                    }
                }
                Op::Dequeue => {
                    let result = avsl.dequeue(list);
                    match model.pop() {
                        Some(value) => prop_assert_eq!(result.unwrap(), Item::from(value)),
                        None => assert_empty_list(result)?,
                    }
                }
                Op::DeleteTop => {
                    let result = avsl.delete_top(list);
                    if model.is_empty() {
                        assert_empty_list(result)?;
                    } else {
                        result.unwrap();
                        model.remove(0);
                    }
                }
                Op::DeleteBot => {
                    let result = avsl.delete_bot(list);
                    match model.pop() {
                        Some(_) => result.unwrap(),
                        None => assert_empty_list(result)?,
                    }
                }
                Op::ReplaceTop(value) => {
                    let result = avsl.replace_top(list, value);
                    match model.first_mut() {
                        Some(top) => {
                            result.unwrap();
                            *top = value;
                        }
                        None => assert_empty_list(result)?,
                    }
                }
                Op::ReplaceBot(value) => {
                    let result = avsl.replace_bot(list, value);
                    match model.last_mut() {
                        Some(bot) => {
                            result.unwrap();
                            *bot = value;
                        }
                        None => assert_empty_list(result)?,
                    }
                }
                Op::Flush => {
                    avsl.flush(list).unwrap();
                    model.clear();
                }
            }

            let audit = avsl.verify().unwrap();
            let stats = avsl.stats();
            prop_assert_eq!(audit.live + audit.available, stats.total);
            prop_assert_eq!(audit.live, model.len() + 1);
            prop_assert_eq!(avsl.size(list).unwrap(), model.len());
            prop_assert_eq!(ints(&avsl, list), model.clone());
        }

        let before = avsl.stats();
        avsl.delete_list(list).unwrap();
        prop_assert_eq!(avsl.stats().available, before.total);
    }

    /// Splitting moves cells between lists without creating or losing any
    #[test]
    fn split_conserves_members(
        values in prop::collection::vec(any::<i64>(), 1..40),
        at in any::<prop::sample::Index>(),
        left in any::<bool>(),
    ) {
        let mut avsl = small_avsl(8, 4);
        let list = avsl.new_list().unwrap();
        let cells: Vec<_> = values
            .iter()
            .map(|value| avsl.enqueue(list, *value).unwrap())
            .collect();
        let live_before = avsl.verify().unwrap().live;

        let k = at.index(values.len());
        let split = if left {
            avsl.split_left(list, cells[k]).unwrap()
        } else {
            avsl.split_right(list, cells[k]).unwrap()
        };

        // Only the new header is extra
        prop_assert_eq!(avsl.verify().unwrap().live, live_before + 1);

        let (front, back) = if left {
            (ints(&avsl, split), ints(&avsl, list))
        } else {
            (ints(&avsl, list), ints(&avsl, split))
        };
        let boundary = if left { k + 1 } else { k };
        prop_assert_eq!(front.as_slice(), &values[..boundary]);
        prop_assert_eq!(back.as_slice(), &values[boundary..]);
    }

    /// A list with n holders survives n - 1 deletes and is reclaimed by the n-th
    #[test]
    fn nth_delete_reclaims(holders in 1u32..20, members in 0usize..10) {
        let mut avsl = small_avsl(4, 4);
        let list = avsl.new_list().unwrap();
        for n in 0..members {
            avsl.enqueue(list, n as i64).unwrap();
        }
        for _ in 1..holders {
            avsl.increment_ref(list).unwrap();
        }
        prop_assert_eq!(avsl.ref_count(list).unwrap(), holders - 1);

        for _ in 1..holders {
            avsl.delete_list(list).unwrap();
            prop_assert!(avsl.is_header(list.id()));
            prop_assert_eq!(avsl.size(list).unwrap(), members);
        }

        avsl.delete_list(list).unwrap();
        prop_assert!(avsl.is_deleted(list.id()));
        let stats = avsl.stats();
        prop_assert_eq!(stats.available, stats.total);
    }

    /// The arena grows by whole fragments, exactly as often as needed
    #[test]
    fn growth_is_counted_in_whole_increments(
        initial_cells in 1usize..32,
        growth_delta in 1usize..16,
        count in 0usize..100,
    ) {
        let mut avsl = small_avsl(initial_cells, growth_delta);
        let list = avsl.new_list().unwrap();
        for n in 0..count {
            avsl.enqueue(list, n as i64).unwrap();
        }

        let needed = (count + 1).saturating_sub(initial_cells);
        let increments = needed.div_ceil(growth_delta);
        let stats = avsl.stats();
        prop_assert_eq!(stats.allocation_increments, increments);
        prop_assert_eq!(stats.total, initial_cells + increments * growth_delta);
        prop_assert_eq!(stats.available, stats.total - (count + 1));
        prop_assert_eq!(avsl.fragments().len(), increments + 1);

        avsl.delete_list(list).unwrap();
        prop_assert_eq!(avsl.stats().available, stats.total);
    }
}
