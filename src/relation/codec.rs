use byteorder::{ByteOrder, LittleEndian};

use crate::error::{DbError, DbResult};
use crate::types::{ColumnAttribute, DataType, Value, ValueDict};

use super::schema::Schema;

/// Serialises one row in declared column order, with no outer framing:
/// INT as little-endian i32, TEXT as a u16 length prefix followed by
/// exactly that many UTF-8 bytes, BOOLEAN as a little-endian i32 0/1.
pub fn marshal(schema: &Schema, row: &ValueDict) -> DbResult<Vec<u8>> {
    let mut buf = Vec::new();
    for name in schema.columns() {
        let value = row.get(name).ok_or_else(|| {
            DbError::InvalidArgument(format!("missing value for column {}", name))
        })?;
        encode_value(&mut buf, value)?;
    }
    Ok(buf)
}

fn encode_value(buf: &mut Vec<u8>, value: &Value) -> DbResult<()> {
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
            if bytes.len() > u16::MAX as usize {
                return Err(DbError::InvalidArgument(format!(
                    "text value of {} bytes exceeds the 65535 byte limit",
                    bytes.len()
                )));
            }
            let mut len_buf = [0u8; 2];
            LittleEndian::write_u16(&mut len_buf, bytes.len() as u16);
            buf.extend_from_slice(&len_buf);
            buf.extend_from_slice(bytes);
        }
    }
    Ok(())
}

/// Reverses `marshal` using the same column order.
pub fn unmarshal(schema: &Schema, bytes: &[u8]) -> DbResult<ValueDict> {
    let mut row = ValueDict::new();
    let mut pos = 0usize;
    for name in schema.columns() {
        let attr = schema.attribute(name)?;
        let value = decode_value(bytes, &mut pos, attr)?;
        row.insert(name.clone(), value);
    }
    Ok(row)
}

fn decode_value(bytes: &[u8], pos: &mut usize, attr: ColumnAttribute) -> DbResult<Value> {
    match attr.data_type {
        DataType::Int => {
            let v = LittleEndian::read_i32(&bytes[*pos..*pos + 4]);
            *pos += 4;
            Ok(Value::Int(v))
        }
        DataType::Boolean => {
            let v = LittleEndian::read_i32(&bytes[*pos..*pos + 4]);
            *pos += 4;
            Ok(Value::Boolean(v != 0))
        }
        DataType::Text => {
            let len = LittleEndian::read_u16(&bytes[*pos..*pos + 2]) as usize;
            *pos += 2;
            let s = String::from_utf8_lossy(&bytes[*pos..*pos + len]).into_owned();
            *pos += len;
            Ok(Value::Text(s))
        }
    }
}
