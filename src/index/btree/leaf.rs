use byteorder::{ByteOrder, LittleEndian};

use crate::error::{DbError, DbResult};
use crate::storage::SlottedPage;
use crate::types::{Handle, KeyProfile, KeyValue};

use super::codec::{compare_keys, decode_handle, decode_key, encode_handle, encode_key};

/// A leaf node: sorted `(key, handle)` entries plus a pointer to the next
/// leaf in key order (0 if this is the last leaf).
pub struct BTreeLeafIndex {
    pub entries: Vec<(KeyValue, Handle)>,
    pub next_leaf: i32,
}

impl BTreeLeafIndex {
    pub fn new() -> Self {
        BTreeLeafIndex { entries: Vec::new(), next_leaf: 0 }
    }

    pub fn from_page(page: &SlottedPage, profile: &KeyProfile, filename: &str) -> DbResult<Self> {
        let ids = page.ids();
        let next_leaf = LittleEndian::read_i32(page.get(ids[0])?);
        let mut entries = Vec::new();
        for &id in &ids[1..] {
            let bytes = page.get(id)?;
            let mut pos = 0;
            let key = decode_key(bytes, &mut pos, profile);
            let handle = decode_handle(filename, &bytes[pos..pos + 6]);
            entries.push((key, handle));
        }
        Ok(BTreeLeafIndex { entries, next_leaf })
    }

    pub fn to_page(&self, block_size: usize, profile: &KeyProfile) -> DbResult<SlottedPage> {
        let mut page = SlottedPage::new_empty(block_size);
        let mut next_buf = [0u8; 4];
        LittleEndian::write_i32(&mut next_buf, self.next_leaf);
        page.add(&next_buf)?;
        for (key, handle) in &self.entries {
            let mut buf = encode_key(key, profile)?;
            buf.extend_from_slice(&encode_handle(handle));
            page.add(&buf)?;
        }
        Ok(page)
    }

    pub fn find_eq(&self, key: &KeyValue) -> DbResult<Option<Handle>> {
        for (k, h) in &self.entries {
            if compare_keys(k, key)? == std::cmp::Ordering::Equal {
                return Ok(Some(h.clone()));
            }
        }
        Ok(None)
    }

    /// Inserts a new `(key, handle)` entry, rejecting a duplicate key.
    pub fn insert(&mut self, key: KeyValue, handle: Handle) -> DbResult<()> {
        let mut pos = self.entries.len();
        for (i, (k, _)) in self.entries.iter().enumerate() {
            match compare_keys(k, &key)? {
                std::cmp::Ordering::Equal => {
                    return Err(DbError::SchemaViolation("duplicate key".to_string()));
                }
                std::cmp::Ordering::Greater => {
                    pos = i;
                    break;
                }
                std::cmp::Ordering::Less => {}
            }
        }
        self.entries.insert(pos, (key, handle));
        Ok(())
    }

    /// Splits in half: `self` keeps the lower half, the returned leaf
    /// gets the upper half, and the returned leaf's first key is the
    /// boundary (kept, not removed, so point lookups on it still work
    /// from the parent's perspective).
    pub fn split(&mut self) -> (BTreeLeafIndex, KeyValue) {
        let mid = self.entries.len() / 2;
        let right_entries = self.entries.split_off(mid);
        let boundary = right_entries[0].0.clone();
        let right = BTreeLeafIndex { entries: right_entries, next_leaf: self.next_leaf };
        (right, boundary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::BlockId;
    use crate::types::{DataType, Value};

    fn profile() -> KeyProfile {
        vec![DataType::Int]
    }

    fn handle(n: i32) -> Handle {
        Handle::new(BlockId::new("t.db", n), 1)
    }

    #[test]
    fn insert_keeps_entries_sorted_and_rejects_duplicates() {
        let mut leaf = BTreeLeafIndex::new();
        leaf.insert(vec![Value::Int(10)], handle(1)).unwrap();
        leaf.insert(vec![Value::Int(5)], handle(2)).unwrap();
        let keys: Vec<i32> = leaf.entries.iter().map(|(k, _)| k[0].as_int().unwrap()).collect();
        assert_eq!(keys, vec![5, 10]);
        assert!(leaf.insert(vec![Value::Int(5)], handle(3)).is_err());
    }

    #[test]
    fn find_eq_returns_the_matching_handle() {
        let mut leaf = BTreeLeafIndex::new();
        leaf.insert(vec![Value::Int(1)], handle(10)).unwrap();
        assert_eq!(leaf.find_eq(&vec![Value::Int(1)]).unwrap(), Some(handle(10)));
        assert_eq!(leaf.find_eq(&vec![Value::Int(2)]).unwrap(), None);
    }

    #[test]
    fn split_moves_the_upper_half_and_keeps_the_boundary_key() {
        let mut leaf = BTreeLeafIndex::new();
        for i in 0..4 {
            leaf.insert(vec![Value::Int(i)], handle(i)).unwrap();
        }
        let (right, boundary) = leaf.split();
        assert_eq!(leaf.entries.len(), 2);
        assert_eq!(right.entries.len(), 2);
        assert_eq!(boundary, right.entries[0].0);
    }

    #[test]
    fn to_page_round_trips_through_from_page() {
        let mut leaf = BTreeLeafIndex::new();
        leaf.insert(vec![Value::Int(1)], handle(5)).unwrap();
        leaf.next_leaf = 9;
        let page = leaf.to_page(256, &profile()).unwrap();
        let back = BTreeLeafIndex::from_page(&page, &profile(), "t.db").unwrap();
        assert_eq!(back.next_leaf, 9);
        assert_eq!(back.entries.len(), 1);
    }
}
