//! Data section values and their encoding.
//!
//! Every value starts with a control byte: the type number in the top three
//! bits and the payload size in the low five. Types above 7 are "extended":
//! the control byte carries type 0 and the following byte holds
//! `type - 7`. Sizes of 29 and above spill into 1-3 extra bytes.

use std::collections::BTreeMap;

use ahash::AHashMap;

use crate::{Error, Result};

const TYPE_POINTER: u8 = 1;
const TYPE_STRING: u8 = 2;
const TYPE_DOUBLE: u8 = 3;
const TYPE_BYTES: u8 = 4;
const TYPE_UINT16: u8 = 5;
const TYPE_UINT32: u8 = 6;
const TYPE_MAP: u8 = 7;
const TYPE_INT32: u8 = 8;
const TYPE_UINT64: u8 = 9;
const TYPE_UINT128: u8 = 10;
const TYPE_ARRAY: u8 = 11;
const TYPE_BOOL: u8 = 14;
const TYPE_FLOAT: u8 = 15;

/// Largest payload size the control byte can describe.
const MAX_SIZE: usize = 65_821 + 0xFF_FFFF;

/// Strings shorter than this are always written inline; a pointer would
/// not be smaller.
const MIN_DEDUP_LEN: usize = 4;

/// A value stored in the data section.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Double(f64),
    Bytes(Vec<u8>),
    Uint16(u16),
    Uint32(u32),
    Map(BTreeMap<String, Value>),
    Int32(i32),
    Uint64(u64),
    Uint128(u128),
    Array(Vec<Value>),
    Bool(bool),
    Float(f32),
}

impl Value {
    /// Build a map value from key/value pairs.
    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Look up a key if this is a map.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(m) => m.get(key),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Encode without pointers. Equal values produce equal bytes, so the
    /// result doubles as a deduplication key.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        encode_plain(self, &mut buf)?;
        Ok(buf)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<u16> for Value {
    fn from(v: u16) -> Self {
        Value::Uint16(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Uint32(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Uint64(v)
    }
}

/// Write a control byte (plus extended type and size bytes).
fn write_control(buf: &mut Vec<u8>, type_num: u8, size: usize) -> Result<()> {
    let (size_bits, extra): (u8, Vec<u8>) = if size < 29 {
        (size as u8, Vec::new())
    } else if size < 285 {
        (29, vec![(size - 29) as u8])
    } else if size < 65_821 {
        (30, ((size - 285) as u16).to_be_bytes().to_vec())
    } else if size <= MAX_SIZE {
        (31, ((size - 65_821) as u32).to_be_bytes()[1..].to_vec())
    } else {
        return Err(Error::DataTooLarge(size));
    };

    if type_num <= 7 {
        buf.push((type_num << 5) | size_bits);
    } else {
        buf.push(size_bits);
        buf.push(type_num - 7);
    }
    buf.extend_from_slice(&extra);
    Ok(())
}

/// Big-endian bytes with leading zeros removed.
fn trimmed(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    &bytes[start..]
}

fn write_uint(buf: &mut Vec<u8>, type_num: u8, be_bytes: &[u8]) -> Result<()> {
    let bytes = trimmed(be_bytes);
    write_control(buf, type_num, bytes.len())?;
    buf.extend_from_slice(bytes);
    Ok(())
}

/// Encode the scalar part of a value. Returns `false` for containers and
/// strings, which the caller encodes itself.
fn encode_scalar(value: &Value, buf: &mut Vec<u8>) -> Result<bool> {
    match value {
        Value::Double(v) => {
            write_control(buf, TYPE_DOUBLE, 8)?;
            buf.extend_from_slice(&v.to_be_bytes());
        }
        Value::Bytes(b) => {
            write_control(buf, TYPE_BYTES, b.len())?;
            buf.extend_from_slice(b);
        }
        Value::Uint16(v) => write_uint(buf, TYPE_UINT16, &v.to_be_bytes())?,
        Value::Uint32(v) => write_uint(buf, TYPE_UINT32, &v.to_be_bytes())?,
        Value::Int32(v) => write_uint(buf, TYPE_INT32, &(*v as u32).to_be_bytes())?,
        Value::Uint64(v) => write_uint(buf, TYPE_UINT64, &v.to_be_bytes())?,
        Value::Uint128(v) => write_uint(buf, TYPE_UINT128, &v.to_be_bytes())?,
        Value::Bool(v) => write_control(buf, TYPE_BOOL, *v as usize)?,
        Value::Float(v) => {
            write_control(buf, TYPE_FLOAT, 4)?;
            buf.extend_from_slice(&v.to_be_bytes());
        }
        Value::String(_) | Value::Map(_) | Value::Array(_) => return Ok(false),
    }
    Ok(true)
}

fn encode_str(s: &str, buf: &mut Vec<u8>) -> Result<()> {
    write_control(buf, TYPE_STRING, s.len())?;
    buf.extend_from_slice(s.as_bytes());
    Ok(())
}

fn encode_plain(value: &Value, buf: &mut Vec<u8>) -> Result<()> {
    if encode_scalar(value, buf)? {
        return Ok(());
    }
    match value {
        Value::String(s) => encode_str(s, buf),
        Value::Map(m) => {
            write_control(buf, TYPE_MAP, m.len())?;
            for (k, v) in m {
                encode_str(k, buf)?;
                encode_plain(v, buf)?;
            }
            Ok(())
        }
        Value::Array(items) => {
            write_control(buf, TYPE_ARRAY, items.len())?;
            for item in items {
                encode_plain(item, buf)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Encode a pointer to `offset` within the data section.
pub(crate) fn encode_pointer(offset: u32, buf: &mut Vec<u8>) {
    let ptr = TYPE_POINTER << 5;
    if offset < 2048 {
        buf.push(ptr | ((offset >> 8) as u8 & 0x07));
        buf.push(offset as u8);
    } else if offset < 526_336 {
        let v = offset - 2048;
        buf.push(ptr | (1 << 3) | ((v >> 16) as u8 & 0x07));
        buf.extend_from_slice(&(v as u16).to_be_bytes());
    } else if offset < 134_744_064 {
        let v = offset - 526_336;
        buf.push(ptr | (2 << 3) | ((v >> 24) as u8 & 0x07));
        buf.extend_from_slice(&v.to_be_bytes()[1..]);
    } else {
        buf.push(ptr | (3 << 3));
        buf.extend_from_slice(&offset.to_be_bytes());
    }
}

/// Data section under construction.
///
/// Strings, maps and arrays are written once; later occurrences of an equal
/// value become pointers to the first copy.
#[derive(Debug, Default)]
pub struct DataSection {
    buf: Vec<u8>,
    offsets: AHashMap<Vec<u8>, u32>,
}

impl DataSection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a top-level value and return its offset.
    pub fn store(&mut self, value: &Value) -> Result<u32> {
        let key = value.to_bytes()?;
        if let Some(offset) = self.offsets.get(&key) {
            return Ok(*offset);
        }
        let offset = self.buf.len() as u32;
        self.write(value)?;
        self.offsets.insert(key, offset);
        Ok(offset)
    }

    /// Write a nested value, emitting a pointer when an equal value exists.
    fn write(&mut self, value: &Value) -> Result<()> {
        if encode_scalar(value, &mut self.buf)? {
            return Ok(());
        }

        if let Value::String(s) = value {
            if s.len() < MIN_DEDUP_LEN {
                return encode_str(s, &mut self.buf);
            }
        }

        let key = value.to_bytes()?;
        if let Some(offset) = self.offsets.get(&key) {
            encode_pointer(*offset, &mut self.buf);
            return Ok(());
        }

        let offset = self.buf.len() as u32;
        match value {
            Value::String(s) => encode_str(s, &mut self.buf)?,
            Value::Map(m) => {
                write_control(&mut self.buf, TYPE_MAP, m.len())?;
                for (k, v) in m {
                    self.write_key(k)?;
                    self.write(v)?;
                }
            }
            Value::Array(items) => {
                write_control(&mut self.buf, TYPE_ARRAY, items.len())?;
                for item in items {
                    self.write(item)?;
                }
            }
            _ => {}
        }
        self.offsets.insert(key, offset);
        Ok(())
    }

    fn write_key(&mut self, key: &str) -> Result<()> {
        self.write(&Value::String(key.to_string()))
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}
