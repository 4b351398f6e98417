// Deterministic binary codec for ledger records
//
// Layout rules: fixed-width integers are little-endian, lengths and counts
// are VarInts, byte strings and text are length-prefixed. The same record
// always encodes to the same bytes.

use std::io::{Cursor, Read};

use crate::core::Hash256;
use crate::error::CodecError;

/// Trait for serializable types
pub trait Serializable: Sized {
    fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.write_to(&mut buf);
        buf
    }

    /// Decode a complete record; trailing bytes are an error
    fn deserialize(data: &[u8]) -> Result<Self, CodecError> {
        let mut cursor = Cursor::new(data);
        let value = Self::read_from(&mut cursor)?;
        let rest = remaining(&cursor);
        if rest != 0 {
            return Err(CodecError::TrailingBytes(rest));
        }
        Ok(value)
    }

    fn write_to(&self, buf: &mut Vec<u8>);

    fn read_from(cursor: &mut Cursor<&[u8]>) -> Result<Self, CodecError>;
}

fn remaining(cursor: &Cursor<&[u8]>) -> usize {
    let len = cursor.get_ref().len() as u64;
    len.saturating_sub(cursor.position()) as usize
}

/// Write a variable-length integer (VarInt)
pub fn write_varint(buf: &mut Vec<u8>, value: u64) {
    match value {
        0..=0xfc => buf.push(value as u8),
        0xfd..=0xffff => {
            buf.push(0xfd);
            buf.extend_from_slice(&(value as u16).to_le_bytes());
        }
        0x10000..=0xffffffff => {
            buf.push(0xfe);
            buf.extend_from_slice(&(value as u32).to_le_bytes());
        }
        _ => {
            buf.push(0xff);
            buf.extend_from_slice(&value.to_le_bytes());
        }
    }
}

/// Read exactly `N` bytes
pub fn read_array<const N: usize>(cursor: &mut Cursor<&[u8]>) -> Result<[u8; N], CodecError> {
    let mut bytes = [0u8; N];
    cursor
        .read_exact(&mut bytes)
        .map_err(|_| CodecError::Truncated)?;
    Ok(bytes)
}

/// Read a variable-length integer (VarInt)
pub fn read_varint(cursor: &mut Cursor<&[u8]>) -> Result<u64, CodecError> {
    let [first] = read_array::<1>(cursor)?;
    match first {
        0..=0xfc => Ok(first as u64),
        0xfd => Ok(u16::from_le_bytes(read_array(cursor)?) as u64),
        0xfe => Ok(u32::from_le_bytes(read_array(cursor)?) as u64),
        0xff => Ok(u64::from_le_bytes(read_array(cursor)?)),
    }
}

/// Read a count of items that each occupy at least one byte
pub fn read_count(cursor: &mut Cursor<&[u8]>) -> Result<usize, CodecError> {
    let count = read_varint(cursor)?;
    if count > remaining(cursor) as u64 {
        return Err(CodecError::LengthOverflow(count));
    }
    Ok(count as usize)
}

/// Write bytes with length prefix (VarInt length + data)
pub fn write_var_bytes(buf: &mut Vec<u8>, data: &[u8]) {
    write_varint(buf, data.len() as u64);
    buf.extend_from_slice(data);
}

/// Read bytes with length prefix
pub fn read_var_bytes(cursor: &mut Cursor<&[u8]>) -> Result<Vec<u8>, CodecError> {
    let len = read_count(cursor)?;
    let mut data = vec![0u8; len];
    cursor
        .read_exact(&mut data)
        .map_err(|_| CodecError::Truncated)?;
    Ok(data)
}

pub fn write_var_str(buf: &mut Vec<u8>, s: &str) {
    write_var_bytes(buf, s.as_bytes());
}

pub fn read_var_str(cursor: &mut Cursor<&[u8]>) -> Result<String, CodecError> {
    String::from_utf8(read_var_bytes(cursor)?).map_err(|_| CodecError::InvalidUtf8)
}

/// Optional hash as var bytes: empty for `None`, 32 bytes otherwise
pub fn write_opt_hash(buf: &mut Vec<u8>, hash: &Option<Hash256>) {
    write_var_bytes(buf, crate::core::opt_hash_bytes(hash));
}

pub fn read_opt_hash(cursor: &mut Cursor<&[u8]>) -> Result<Option<Hash256>, CodecError> {
    let bytes = read_var_bytes(cursor)?;
    if bytes.is_empty() {
        return Ok(None);
    }
    Hash256::from_slice(&bytes).map(Some)
}

pub fn read_hash(cursor: &mut Cursor<&[u8]>) -> Result<Hash256, CodecError> {
    Ok(Hash256::new(read_array(cursor)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cursor(buf: &[u8]) -> Cursor<&[u8]> {
        Cursor::new(buf)
    }

    #[test]
    fn test_varint_small() {
        let mut buf = Vec::new();
        write_varint(&mut buf, 100);
        assert_eq!(buf, vec![100]);
        assert_eq!(read_varint(&mut cursor(&buf)).unwrap(), 100);
    }

    #[test]
    fn test_varint_widths() {
        for (value, len) in [(1000u64, 3), (100_000, 5), (u64::MAX, 9)] {
            let mut buf = Vec::new();
            write_varint(&mut buf, value);
            assert_eq!(buf.len(), len);
            assert_eq!(read_varint(&mut cursor(&buf)).unwrap(), value);
        }
    }

    #[test]
    fn test_var_bytes() {
        let mut buf = Vec::new();
        write_var_bytes(&mut buf, b"hello world");
        assert_eq!(read_var_bytes(&mut cursor(&buf)).unwrap(), b"hello world");
    }

    #[test]
    fn test_truncated_var_bytes() {
        let mut buf = Vec::new();
        write_var_bytes(&mut buf, b"hello world");
        buf.truncate(5);
        assert_eq!(
            read_var_bytes(&mut cursor(&buf)),
            Err(CodecError::LengthOverflow(11))
        );
        assert_eq!(read_varint(&mut cursor(&[0xfd, 0x01])), Err(CodecError::Truncated));
    }

    #[test]
    fn test_huge_declared_length_is_rejected() {
        let mut buf = Vec::new();
        write_varint(&mut buf, u64::MAX);
        assert_eq!(
            read_var_bytes(&mut cursor(&buf)),
            Err(CodecError::LengthOverflow(u64::MAX))
        );
    }

    #[test]
    fn test_opt_hash() {
        let mut buf = Vec::new();
        write_opt_hash(&mut buf, &None);
        write_opt_hash(&mut buf, &Some(Hash256::new([3; 32])));
        let mut c = cursor(&buf);
        assert_eq!(read_opt_hash(&mut c).unwrap(), None);
        assert_eq!(read_opt_hash(&mut c).unwrap(), Some(Hash256::new([3; 32])));

        let mut bad = Vec::new();
        write_var_bytes(&mut bad, &[1, 2, 3]);
        assert_eq!(
            read_opt_hash(&mut cursor(&bad)),
            Err(CodecError::InvalidHashLength(3))
        );
    }

    #[test]
    fn test_invalid_utf8() {
        let mut buf = Vec::new();
        write_var_bytes(&mut buf, &[0xff, 0xfe]);
        assert_eq!(read_var_str(&mut cursor(&buf)), Err(CodecError::InvalidUtf8));
    }
}
