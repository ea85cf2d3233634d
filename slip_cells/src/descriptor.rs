//! Descriptor lists
//!
//! Any list may own one descriptor list: an ordinary list of alternating key and value
//! cells used as attribute storage. The descriptor list is exclusive to its owner and is
//! deleted, copied and assigned along with it. `delete_list` refuses a descriptor list
//! that still has an owner; `delete_descriptor_list` detaches it first.

use crate::{
    avsl::Avsl,
    cell::{Datum, Item, Payload},
    error::{SlipError, SlipResult},
    handle::{CellId, ListHandle},
    sequencer::Direction,
};

impl Avsl {
    #[track_caller]
    pub fn has_descriptor_list(&self, list: ListHandle) -> SlipResult<bool> {
        Ok(self.descriptor_list(list)?.is_some())
    }

    #[track_caller]
    pub fn descriptor_list(&self, list: ListHandle) -> SlipResult<Option<ListHandle>> {
        let header = self.header_index("descriptor_list", list)?;
        let descriptor = self.stored_descriptor("descriptor_list", header)?;
        Ok(descriptor.map(|index| self.list_at(index)))
    }

    /// Give a list a descriptor list, returning the existing one if it has one
    #[track_caller]
    pub fn create_descriptor_list(&mut self, list: ListHandle) -> SlipResult<ListHandle> {
        let header = self.header_index("create_descriptor_list", list)?;
        if let Some(descriptor) = self.stored_descriptor("create_descriptor_list", header)? {
            return Ok(self.list_at(descriptor));
        }

        let descriptor = self.new_list()?;
        self.attach_descriptor(header, descriptor.index());
        Ok(descriptor)
    }

    /// Delete a list's descriptor list, if it has one
    #[track_caller]
    pub fn delete_descriptor_list(&mut self, list: ListHandle) -> SlipResult<()> {
        let header = self.header_index("delete_descriptor_list", list)?;
        if self.stored_descriptor("delete_descriptor_list", header)?.is_none() {
            return Ok(());
        }

        match self.detach_descriptor(header) {
            Some(descriptor) => self.delete_list(ListHandle::from_id(descriptor)),
            None => Ok(()),
        }
    }

    /// Index of the descriptor list named by the header at `header`. A descriptor that
    /// was released behind its owner's back is a stale reference.
    #[track_caller]
    pub(crate) fn stored_descriptor(&self, op: &'static str, header: u32) -> SlipResult<Option<u32>> {
        match self.header_fields(header).and_then(|fields| fields.descriptor) {
            Some(descriptor) => self.live(op, descriptor).map(Some),
            None => Ok(None),
        }
    }

    /// Make the list at `descriptor` the descriptor list of the list at `owner`
    pub(crate) fn attach_descriptor(&mut self, owner: u32, descriptor: u32) {
        let owner_id = self.id_at(owner);
        let descriptor_id = self.id_at(descriptor);
        if let Some(fields) = self.header_fields_mut(owner) {
            fields.descriptor = Some(descriptor_id);
        }
        if let Some(fields) = self.header_fields_mut(descriptor) {
            fields.owner = Some(owner_id);
        }
    }

    /// Take the descriptor list away from the list at `owner`, leaving it unowned
    pub(crate) fn detach_descriptor(&mut self, owner: u32) -> Option<CellId> {
        let descriptor = self
            .header_fields_mut(owner)
            .and_then(|fields| fields.descriptor.take())?;
        if self.is_live(descriptor) {
            if let Some(fields) = self.header_fields_mut(descriptor.index()) {
                fields.owner = None;
            }
        }
        Some(descriptor)
    }

    #[track_caller]
    fn require_descriptor(&self, op: &'static str, list: ListHandle) -> SlipResult<u32> {
        let header = self.header_index(op, list)?;
        match self.stored_descriptor(op, header)? {
            Some(descriptor) => Ok(descriptor),
            None => self.fail(SlipError::MissingDescriptorList { op, list: list.id() }),
        }
    }

    /// Key and value cells for `key`
    fn find_attribute(&self, descriptor: u32, key: &Datum) -> Option<(u32, u32)> {
        let mut index = self.neighbor(descriptor, Direction::Right);
        while index != descriptor {
            let value = self.neighbor(index, Direction::Right);
            if value == descriptor {
                break;
            }
            if matches!(&self.slot(index).payload, Payload::Datum(datum) if datum == key) {
                return Some((index, value));
            }
            index = self.neighbor(value, Direction::Right);
        }
        None
    }

    /// Set an attribute, creating the descriptor list on first use
    #[track_caller]
    pub fn put(&mut self, list: ListHandle, key: impl Into<Datum>, value: impl Into<Item>) -> SlipResult<()> {
        let key = key.into();
        let value = value.into();
        let descriptor = self.create_descriptor_list(list)?.index();

        if let Some((_, cell)) = self.find_attribute(descriptor, &key) {
            return self.replace_payload("put", cell, value);
        }

        let key_cell = self.materialize("put", Item::Datum(key))?;
        let value_cell = match self.materialize("put", value) {
            Ok(cell) => cell,
            Err(error) => {
                self.release_run("put", key_cell, key_cell)?;
                return Err(error);
            }
        };

        let bottom = self.neighbor(descriptor, Direction::Left);
        self.link_between(bottom, key_cell, descriptor);
        self.link_between(key_cell, value_cell, descriptor);
        Ok(())
    }

    /// Look up an attribute. Fails if the list has no descriptor list at all.
    #[track_caller]
    pub fn get(&self, list: ListHandle, key: &Datum) -> SlipResult<Option<Item>> {
        let descriptor = self.require_descriptor("get", list)?;
        match self.find_attribute(descriptor, key) {
            Some((_, value)) => Ok(Some(self.item_at("get", value)?)),
            None => Ok(None),
        }
    }

    #[track_caller]
    pub fn contains(&self, list: ListHandle, key: &Datum) -> SlipResult<bool> {
        let descriptor = self.require_descriptor("contains", list)?;
        Ok(self.find_attribute(descriptor, key).is_some())
    }

    /// Remove an attribute. Returns whether the key was present.
    #[track_caller]
    pub fn delete_attribute(&mut self, list: ListHandle, key: &Datum) -> SlipResult<bool> {
        let descriptor = self.require_descriptor("delete_attribute", list)?;
        let Some((key_cell, value_cell)) = self.find_attribute(descriptor, key) else {
            return Ok(false);
        };

        let held = self.slot(value_cell).sublist();
        self.unlink_index(value_cell);
        self.unlink_index(key_cell);
        self.release_run("delete_attribute", key_cell, key_cell)?;
        self.release_run("delete_attribute", value_cell, value_cell)?;

        if let Some(held) = held {
            self.delete_list(ListHandle::from_id(held))?;
        }
        Ok(true)
    }

    /// Attribute keys in insertion order
    #[track_caller]
    pub fn keys(&self, list: ListHandle) -> SlipResult<Vec<Datum>> {
        let descriptor = self.require_descriptor("keys", list)?;
        let mut keys = Vec::new();
        let mut index = self.neighbor(descriptor, Direction::Right);
        while index != descriptor {
            match &self.slot(index).payload {
                Payload::Datum(datum) => keys.push(datum.clone()),
                _ => {
                    return self.fail(SlipError::Corrupted {
                        op: "keys",
                        cell: self.id_at(index),
                        reason: "descriptor key is not a datum",
                    })
                }
            }
            index = self.neighbor(index, Direction::Right);
            if index == descriptor {
                break;
            }
            index = self.neighbor(index, Direction::Right);
        }
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_replaces_existing_value() {
        let mut avsl = Avsl::default();
        let list = avsl.new_list().unwrap();

        avsl.put(list, "color", "red").unwrap();
        avsl.put(list, "size", 3).unwrap();
        avsl.put(list, "color", "blue").unwrap();

        let descriptor = avsl.descriptor_list(list).unwrap().unwrap();
        assert_eq!(avsl.size(descriptor).unwrap(), 4);
        assert_eq!(
            avsl.get(list, &Datum::from("color")).unwrap(),
            Some(Item::from("blue"))
        );
        assert_eq!(avsl.keys(list).unwrap(), vec![Datum::from("color"), Datum::from("size")]);
    }

    // Only reachable by corrupting the arena from inside the crate; the audit would
    // panic first under `avsl_verify`
    #[cfg(not(feature = "avsl_verify"))]
    #[test]
    fn test_released_descriptor_is_a_stale_reference() {
        let mut avsl = Avsl::default();
        let list = avsl.new_list().unwrap();
        let descriptor = avsl.create_descriptor_list(list).unwrap();

        // Free the descriptor behind its owner's back and recycle the slot
        avsl.release_run("release", descriptor.index(), descriptor.index()).unwrap();
        let other = avsl.new_list().unwrap();
        assert_eq!(other.index(), descriptor.index());

        let err = avsl.put(list, "k", 1).unwrap_err();
        assert!(matches!(
            err,
            SlipError::StaleReference {
                op: "create_descriptor_list",
                ..
            }
        ));
        assert!(matches!(
            avsl.get(list, &Datum::from("k")),
            Err(SlipError::StaleReference { op: "get", .. })
        ));
        assert!(avsl.is_empty(other).unwrap());
        assert!(matches!(
            avsl.verify(),
            Err(SlipError::Corrupted { op: "verify", .. })
        ));
    }

    #[test]
    fn test_missing_descriptor_list_is_distinct_from_missing_key() {
        let mut avsl = Avsl::default();
        let list = avsl.new_list().unwrap();

        let err = avsl.get(list, &Datum::from("k")).unwrap_err();
        assert!(matches!(err, SlipError::MissingDescriptorList { .. }));

        avsl.create_descriptor_list(list).unwrap();
        assert_eq!(avsl.get(list, &Datum::from("k")).unwrap(), None);
        assert!(!avsl.delete_attribute(list, &Datum::from("k")).unwrap());
    }
}
