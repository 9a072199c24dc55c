use byteorder::{ByteOrder, LittleEndian};

use crate::error::DbResult;
use crate::storage::SlottedPage;
use crate::types::{KeyProfile, KeyValue};

use super::codec::{compare_keys, decode_key, encode_key};

/// A directory node: a `first` child pointer plus sorted `(boundary, ptr)`
/// entries. Every key under `first` is less than the first boundary;
/// every key under `entries[i].1` is in `[entries[i].0, entries[i+1].0)`.
pub struct BTreeInterior {
    pub first: i32,
    pub entries: Vec<(KeyValue, i32)>,
}

impl BTreeInterior {
    pub fn new(first: i32) -> Self {
        BTreeInterior { first, entries: Vec::new() }
    }

    pub fn from_page(page: &SlottedPage, profile: &KeyProfile) -> DbResult<Self> {
        let ids = page.ids();
        let first = LittleEndian::read_i32(page.get(ids[0])?);
        let mut entries = Vec::new();
        for &id in &ids[1..] {
            let bytes = page.get(id)?;
            let mut pos = 0;
            let key = decode_key(bytes, &mut pos, profile);
            let ptr = LittleEndian::read_i32(&bytes[pos..pos + 4]);
            entries.push((key, ptr));
        }
        Ok(BTreeInterior { first, entries })
    }

    /// Serialises as a fresh page; fails with `NoRoom` if the entries
    /// don't fit in one block, which the caller treats as "must split".
    pub fn to_page(&self, block_size: usize, profile: &KeyProfile) -> DbResult<SlottedPage> {
        let mut page = SlottedPage::new_empty(block_size);
        let mut first_buf = [0u8; 4];
        LittleEndian::write_i32(&mut first_buf, self.first);
        page.add(&first_buf)?;
        for (key, ptr) in &self.entries {
            let mut buf = encode_key(key, profile)?;
            let mut ptr_buf = [0u8; 4];
            LittleEndian::write_i32(&mut ptr_buf, *ptr);
            buf.extend_from_slice(&ptr_buf);
            page.add(&buf)?;
        }
        Ok(page)
    }

    /// The child that `key` would be found under: the pointer of the
    /// last entry whose boundary is `<= key`, or `first` if none.
    pub fn find(&self, key: &KeyValue) -> DbResult<i32> {
        let mut result = self.first;
        for (boundary, ptr) in &self.entries {
            if compare_keys(boundary, key)? != std::cmp::Ordering::Greater {
                result = *ptr;
            } else {
                break;
            }
        }
        Ok(result)
    }

    /// Inserts a new `(boundary, ptr)` entry, keeping entries sorted.
    pub fn insert(&mut self, boundary: KeyValue, ptr: i32) -> DbResult<()> {
        let pos = self
            .entries
            .iter()
            .position(|(k, _)| compare_keys(k, &boundary).map(|o| o == std::cmp::Ordering::Greater).unwrap_or(false))
            .unwrap_or(self.entries.len());
        self.entries.insert(pos, (boundary, ptr));
        Ok(())
    }

    /// Splits in half: the left node (`self`) keeps the lower half and its
    /// own `first`; the returned node's `first` is the middle entry's
    /// pointer, and its entries are everything after the middle. The
    /// middle boundary is returned for the caller to push into the
    /// parent (it is not duplicated into either child).
    pub fn split(&mut self) -> (BTreeInterior, KeyValue) {
        let mid = self.entries.len() / 2;
        let (mid_key, mid_ptr) = self.entries[mid].clone();
        let right_entries = self.entries.split_off(mid + 1);
        self.entries.truncate(mid);
        let right = BTreeInterior { first: mid_ptr, entries: right_entries };
        (right, mid_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DataType, Value};

    fn profile() -> KeyProfile {
        vec![DataType::Int]
    }

    #[test]
    fn find_follows_first_when_no_boundary_matches() {
        let interior = BTreeInterior::new(10);
        assert_eq!(interior.find(&vec![Value::Int(5)]).unwrap(), 10);
    }

    #[test]
    fn find_and_insert_keep_entries_sorted() {
        let mut interior = BTreeInterior::new(1);
        interior.insert(vec![Value::Int(10)], 2).unwrap();
        interior.insert(vec![Value::Int(30)], 4).unwrap();
        interior.insert(vec![Value::Int(20)], 3).unwrap();
        let keys: Vec<i32> = interior.entries.iter().map(|(k, _)| k[0].as_int().unwrap()).collect();
        assert_eq!(keys, vec![10, 20, 30]);
        assert_eq!(interior.find(&vec![Value::Int(5)]).unwrap(), 1);
        assert_eq!(interior.find(&vec![Value::Int(15)]).unwrap(), 2);
        assert_eq!(interior.find(&vec![Value::Int(25)]).unwrap(), 3);
        assert_eq!(interior.find(&vec![Value::Int(100)]).unwrap(), 4);
    }

    #[test]
    fn to_page_round_trips_through_from_page() {
        let mut interior = BTreeInterior::new(1);
        interior.insert(vec![Value::Int(10)], 2).unwrap();
        interior.insert(vec![Value::Int(20)], 3).unwrap();
        let page = interior.to_page(256, &profile()).unwrap();
        let back = BTreeInterior::from_page(&page, &profile()).unwrap();
        assert_eq!(back.first, 1);
        assert_eq!(back.entries.len(), 2);
    }
}
