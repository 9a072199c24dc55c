use byteorder::{ByteOrder, LittleEndian};

use crate::storage::SlottedPage;

/// Block 1 of a B+Tree file: the root's block number and the tree's
/// height (1 means the root is itself a leaf). Stored as two fixed
/// fields rather than slotted records, since it never grows.
pub struct BTreeStat {
    pub root_id: i32,
    pub height: i32,
}

impl BTreeStat {
    pub fn new(root_id: i32, height: i32) -> Self {
        BTreeStat { root_id, height }
    }

    pub fn from_page(page: &SlottedPage) -> Self {
        let bytes = page.bytes();
        BTreeStat {
            root_id: LittleEndian::read_i32(&bytes[4..8]),
            height: LittleEndian::read_i32(&bytes[8..12]),
        }
    }

    pub fn to_page(&self, block_size: usize) -> SlottedPage {
        let mut page = SlottedPage::new_empty(block_size);
        let bytes = page.bytes_mut();
        LittleEndian::write_i32(&mut bytes[4..8], self.root_id);
        LittleEndian::write_i32(&mut bytes[8..12], self.height);
        page
    }
}
