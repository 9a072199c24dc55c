use byteorder::{ByteOrder, LittleEndian};

use crate::error::{DbError, DbResult};
use crate::types::{DataType, Handle, KeyProfile, KeyValue, Value};
use crate::storage::BlockId;

/// Encodes a key tuple whose types exactly match `profile`, using the same
/// per-field encoding as a row's marshal (little-endian ints, u16-length
/// TEXT), so the reader never needs a separate header.
pub fn encode_key(key: &KeyValue, profile: &KeyProfile) -> DbResult<Vec<u8>> {
    if key.len() != profile.len() {
        return Err(DbError::InvalidArgument(format!(
            "key has {} components, expected {}",
            key.len(),
            profile.len()
        )));
    }
    let mut buf = Vec::new();
    for (value, expected) in key.iter().zip(profile.iter()) {
        if value.data_type() != *expected {
            return Err(DbError::InvalidArgument(format!(
                "key component {:?} does not match profile type {:?}",
                value, expected
            )));
        }
        match value {
            Value::Int(v) => {
                let mut b = [0u8; 4];
                LittleEndian::write_i32(&mut b, *v);
                buf.extend_from_slice(&b);
            }
            Value::Boolean(v) => {
                let mut b = [0u8; 4];
                LittleEndian::write_i32(&mut b, if *v { 1 } else { 0 });
                buf.extend_from_slice(&b);
            }
            Value::Text(s) => {
                let bytes = s.as_bytes();
                let mut len_buf = [0u8; 2];
                LittleEndian::write_u16(&mut len_buf, bytes.len() as u16);
                buf.extend_from_slice(&len_buf);
                buf.extend_from_slice(bytes);
            }
        }
    }
    Ok(buf)
}

pub fn decode_key(bytes: &[u8], pos: &mut usize, profile: &KeyProfile) -> KeyValue {
    let mut key = Vec::with_capacity(profile.len());
    for data_type in profile {
        match data_type {
            DataType::Int => {
                let v = LittleEndian::read_i32(&bytes[*pos..*pos + 4]);
                *pos += 4;
                key.push(Value::Int(v));
            }
            DataType::Boolean => {
                let v = LittleEndian::read_i32(&bytes[*pos..*pos + 4]);
                *pos += 4;
                key.push(Value::Boolean(v != 0));
            }
            DataType::Text => {
                let len = LittleEndian::read_u16(&bytes[*pos..*pos + 2]) as usize;
                *pos += 2;
                let s = String::from_utf8_lossy(&bytes[*pos..*pos + len]).into_owned();
                *pos += len;
                key.push(Value::Text(s));
            }
        }
    }
    key
}

/// Lexicographic, type-by-type comparison of two keys with the same
/// profile.
pub fn compare_keys(a: &KeyValue, b: &KeyValue) -> DbResult<std::cmp::Ordering> {
    for (x, y) in a.iter().zip(b.iter()) {
        let ord = x.compare(y)?;
        if ord != std::cmp::Ordering::Equal {
            return Ok(ord);
        }
    }
    Ok(a.len().cmp(&b.len()))
}

pub fn encode_handle(handle: &Handle) -> [u8; 6] {
    let mut b = [0u8; 6];
    LittleEndian::write_u32(&mut b[0..4], handle.block_id.number() as u32);
    LittleEndian::write_u16(&mut b[4..6], handle.record_id);
    b
}

pub fn decode_handle(filename: &str, bytes: &[u8]) -> Handle {
    let block_num = LittleEndian::read_u32(&bytes[0..4]) as i32;
    let record_id = LittleEndian::read_u16(&bytes[4..6]);
    Handle::new(BlockId::new(filename, block_num), record_id)
}
