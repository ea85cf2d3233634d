//! End to end scenarios through the public API.

use slip_cells::{
    Avsl, Datum, ErrorPolicy, Item, ListHandle, Misuse, OptionsBuilder, Reader, Role,
    Sequencer, SlipError,
};

fn avsl() -> Avsl {
    Avsl::new(OptionsBuilder::new().initial_cells(64).growth_delta(32).build())
}

fn list_of(avsl: &mut Avsl, items: Vec<Item>) -> ListHandle {
    let list = avsl.new_list().unwrap();
    for item in items {
        avsl.enqueue(list, item).unwrap();
    }
    list
}

fn read_all(avsl: &mut Avsl, list: ListHandle) -> Vec<Datum> {
    let mut reader = Reader::new(avsl, list).unwrap();
    let mut leaves = Vec::new();
    while let Some(leaf) = reader.next_leaf(avsl).unwrap() {
        leaves.push(avsl.datum(leaf).unwrap().unwrap().clone());
    }
    reader.close(avsl).unwrap();
    leaves
}

#[test]
fn structural_step_descends_but_never_ascends() {
    let mut avsl = avsl();
    let inner = list_of(&mut avsl, vec![Item::from(2)]);
    let outer = list_of(&mut avsl, vec![Item::from(1), Item::from(inner), Item::from(3)]);

    let mut seq = Sequencer::on_list(outer);
    let one = seq.advance_swr(&avsl).unwrap();
    assert_eq!(avsl.datum(one).unwrap(), Some(&Datum::Int(1)));

    let sublist = seq.advance_swr(&avsl).unwrap();
    assert_eq!(avsl.role(sublist).unwrap(), Role::Sublist);

    // Stepping from the sublist cell enters the nested list
    let two = seq.advance_swr(&avsl).unwrap();
    assert_eq!(avsl.datum(two).unwrap(), Some(&Datum::Int(2)));

    // End of the nested list: the cursor stops on its header and stays inside
    let header = seq.advance_swr(&avsl).unwrap();
    assert_eq!(header, inner.id());
    assert_eq!(seq.advance_swr(&avsl).unwrap(), two);

    // Climbing out is done by hand
    seq.reposition(sublist);
    let three = seq.advance_lwr(&avsl).unwrap();
    assert_eq!(avsl.datum(three).unwrap(), Some(&Datum::Int(3)));
}

#[test]
fn every_axis_stops_at_the_header() {
    let mut avsl = avsl();
    let inner = avsl.new_list().unwrap();
    let list = list_of(&mut avsl, vec![Item::from(inner)]);
    let only_data = list_of(&mut avsl, vec![Item::from(1), Item::from(2)]);

    let mut seq = Sequencer::on_list(list);
    assert_eq!(seq.advance_ler(&avsl).unwrap(), list.id());
    assert_eq!(seq.advance_lel(&avsl).unwrap(), list.id());

    let mut seq = Sequencer::on_list(only_data);
    assert_eq!(seq.advance_lnr(&avsl).unwrap(), only_data.id());
    assert_eq!(seq.advance_lnl(&avsl).unwrap(), only_data.id());
    assert_eq!(seq.advance_snr(&avsl).unwrap(), only_data.id());
    assert_eq!(seq.advance_snl(&avsl).unwrap(), only_data.id());
}

#[test]
fn structural_element_walk_over_sublist_cycle_terminates() {
    let mut avsl = avsl();
    let a = avsl.new_list().unwrap();
    let b = avsl.new_list().unwrap();
    avsl.enqueue(a, b).unwrap();
    avsl.enqueue(b, a).unwrap();

    let mut seq = Sequencer::on_list(a);
    let stop = seq.advance_ser(&avsl).unwrap();
    assert!(avsl.is_header(stop));

    let mut seq = Sequencer::on_list(a);
    let stop = seq.advance_sel(&avsl).unwrap();
    assert!(avsl.is_header(stop));
}

#[test]
fn reader_visits_shared_list_at_each_occurrence() {
    let mut avsl = avsl();
    let shared = list_of(&mut avsl, vec![Item::from('s')]);
    let root = list_of(
        &mut avsl,
        vec![Item::from(shared), Item::from('m'), Item::from(shared)],
    );

    assert_eq!(
        read_all(&mut avsl, root),
        vec![Datum::Char('s'), Datum::Char('m'), Datum::Char('s')]
    );
}

#[test]
fn readers_run_side_by_side() {
    let mut avsl = avsl();
    let inner = list_of(&mut avsl, vec![Item::from(2), Item::from(3)]);
    let root = list_of(&mut avsl, vec![Item::from(1), Item::from(inner)]);

    let mut first = Reader::new(&mut avsl, root).unwrap();
    let mut second = Reader::new(&mut avsl, root).unwrap();

    first.next_leaf(&mut avsl).unwrap();
    first.next_leaf(&mut avsl).unwrap();
    assert_eq!(first.depth(&avsl).unwrap(), 1);

    let leaf = second.next_leaf(&mut avsl).unwrap().unwrap();
    assert_eq!(avsl.datum(leaf).unwrap(), Some(&Datum::Int(1)));
    assert_eq!(second.depth(&avsl).unwrap(), 0);

    let leaf = first.next_leaf(&mut avsl).unwrap().unwrap();
    assert_eq!(avsl.datum(leaf).unwrap(), Some(&Datum::Int(3)));
    assert_eq!(first.next_leaf(&mut avsl).unwrap(), None);

    first.close(&mut avsl).unwrap();
    second.close(&mut avsl).unwrap();
    avsl.verify().unwrap();
}

#[test]
fn reader_manual_ascend_and_reset() {
    let mut avsl = avsl();
    let inner = list_of(&mut avsl, vec![Item::from(2), Item::from(3)]);
    let root = list_of(&mut avsl, vec![Item::from(inner), Item::from(4)]);

    let mut reader = Reader::new(&mut avsl, root).unwrap();
    reader.next_leaf(&mut avsl).unwrap();
    assert_eq!(reader.depth(&avsl).unwrap(), 1);

    // Leave the nested list early; the next leaf is after it
    let sublist = reader.ascend(&mut avsl).unwrap().unwrap();
    assert_eq!(avsl.role(sublist).unwrap(), Role::Sublist);
    let leaf = reader.next_leaf(&mut avsl).unwrap().unwrap();
    assert_eq!(avsl.datum(leaf).unwrap(), Some(&Datum::Int(4)));
    assert_eq!(reader.ascend(&mut avsl).unwrap(), None);

    reader.reset(&mut avsl).unwrap();
    assert_eq!(reader.current(), root.id());
    let leaf = reader.next_leaf(&mut avsl).unwrap().unwrap();
    assert_eq!(avsl.datum(leaf).unwrap(), Some(&Datum::Int(2)));
    reader.close(&mut avsl).unwrap();
}

#[test]
fn attributes_hold_lists() {
    let mut avsl = avsl();
    let list = avsl.new_list().unwrap();
    let value = list_of(&mut avsl, vec![Item::from("v")]);

    avsl.put(list, "child", value).unwrap();
    avsl.delete_list(value).unwrap();
    assert!(avsl.contains(list, &Datum::from("child")).unwrap());
    assert_eq!(
        avsl.get(list, &Datum::from("child")).unwrap(),
        Some(Item::List(value))
    );

    // Deleting the attribute drops the last hold on the value list
    assert!(avsl.delete_attribute(list, &Datum::from("child")).unwrap());
    assert!(avsl.is_deleted(value.id()));
    assert!(avsl.keys(list).unwrap().is_empty());

    avsl.delete_descriptor_list(list).unwrap();
    assert!(!avsl.has_descriptor_list(list).unwrap());
    assert!(matches!(
        avsl.keys(list),
        Err(SlipError::MissingDescriptorList { op: "keys", .. })
    ));
}

#[test]
fn arena_refuses_to_free_cells_still_in_use() {
    let mut avsl = avsl();
    let list = list_of(&mut avsl, vec![Item::from(1), Item::from(2)]);
    let descriptor = avsl.create_descriptor_list(list).unwrap();
    let holder = list_of(&mut avsl, vec![Item::from(list)]);
    let member = avsl.top(list).unwrap().unwrap();
    let bottom = avsl.bot(list).unwrap().unwrap();

    let refused = [
        avsl.release(member, member),
        avsl.release(list.id(), bottom),
        avsl.release(descriptor.id(), descriptor.id()),
    ];
    for result in refused {
        assert!(matches!(result, Err(SlipError::StructuralMisuse { op: "release", .. })));
    }
    assert!(matches!(
        avsl.delete_list(descriptor),
        Err(SlipError::StructuralMisuse {
            misuse: Misuse::OwnedDescriptor,
            ..
        })
    ));

    // Nothing was freed, and every list still reads back
    avsl.verify().unwrap();
    assert_eq!(avsl.size(list).unwrap(), 2);
    assert_eq!(avsl.items(holder).unwrap(), vec![Item::List(list)]);
    assert!(avsl.is_empty(descriptor).unwrap());
}

#[test]
fn sentinel_policy_keeps_going() {
    let mut avsl = avsl();
    avsl.set_error_policy(ErrorPolicy::Sentinel);
    let list = list_of(&mut avsl, vec![Item::from(1)]);

    assert_eq!(avsl.pop(list).unwrap(), Item::from(1));
    let sentinel = avsl.pop(list).unwrap();
    assert!(sentinel.is_header());
    avsl.delete_top(list).unwrap();

    // Stale references abort regardless of policy
    avsl.delete_list(list).unwrap();
    assert!(matches!(
        avsl.pop(list),
        Err(SlipError::StaleReference { .. })
    ));
}

#[test]
fn stats_serialize() {
    let avsl = avsl();
    let json = serde_json::to_value(avsl.stats()).unwrap();
    assert_eq!(json["total"], 64);
    assert_eq!(json["available"], 64);
    assert_eq!(json["allocation_increments"], 0);
    assert_eq!(json["growth_delta"], 32);
}
