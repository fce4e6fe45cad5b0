//! Wire codec for the admin daemon's tree-notation protocol.
//!
//! The daemon speaks a length-prefixed, self-delimiting binary notation:
//! - `i<digits>e` is a signed integer
//! - `<digits>:<bytes>` is a byte-string of exactly that length
//! - `l<value>*e` is an ordered list
//! - `d<value>*e` is a key-sorted map; children alternate key/value, keys
//!   must be byte-strings
//!
//! Decoding is strict: any malformed input is surfaced as a [`WireError`]
//! rather than truncated or defaulted. [`decode_prefix`] additionally reports
//! how many bytes one complete value consumed, which is what the transport
//! uses to frame replies on a stream socket (the notation's own structural
//! end is the framing signal, no suffix or buffer-size heuristics).

use std::collections::BTreeMap;

use thiserror::Error;

pub mod dump;

pub use dump::{DumpPage, RawTableRow, SchemaError};

/// A decoded tree-notation value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Int(i64),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Dict(BTreeMap<Vec<u8>, Value>),
}

impl Value {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Byte-string as UTF-8, if it is one.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(self.as_bytes()?).ok()
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&BTreeMap<Vec<u8>, Value>> {
        match self {
            Value::Dict(map) => Some(map),
            _ => None,
        }
    }

    /// Dictionary lookup; `None` for non-dicts and missing keys.
    pub fn get(&self, key: &[u8]) -> Option<&Value> {
        self.as_dict()?.get(key)
    }
}

/// Decoding failure. Always fatal for the input it names; the decoder never
/// recovers or substitutes defaults.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WireError {
    #[error("unexpected end of input at offset {offset}")]
    UnexpectedEof { offset: usize },
    #[error("unexpected byte {byte:#04x} at offset {offset}")]
    UnexpectedByte { offset: usize, byte: u8 },
    #[error("malformed integer at offset {offset}")]
    BadInteger { offset: usize },
    #[error("malformed byte-string length at offset {offset}")]
    BadLength { offset: usize },
    #[error("dictionary key at offset {offset} is not a byte-string")]
    NonStringKey { offset: usize },
    #[error("dictionary at offset {offset} ends with a key and no value")]
    DanglingKey { offset: usize },
    #[error("trailing bytes after complete value at offset {offset}")]
    TrailingBytes { offset: usize },
}

/// Decode exactly one value spanning the whole input.
pub fn decode(input: &[u8]) -> Result<Value, WireError> {
    let (value, used) = decode_prefix(input)?;
    if used != input.len() {
        return Err(WireError::TrailingBytes { offset: used });
    }
    Ok(value)
}

/// Decode one complete value from the front of `input`, returning it together
/// with the number of bytes consumed.
///
/// A [`WireError::UnexpectedEof`] here means the buffer holds a prefix of a
/// valid value; callers reading from a socket treat it as "need more bytes".
pub fn decode_prefix(input: &[u8]) -> Result<(Value, usize), WireError> {
    let mut cursor = Cursor { input, pos: 0 };
    let value = cursor.value()?;
    Ok((value, cursor.pos))
}

/// Serialize a value back into the wire notation.
///
/// Dictionary keys are emitted in sorted order (the [`BTreeMap`] gives this
/// for free), which the daemon's request authentication relies on.
pub fn encode(value: &Value) -> Vec<u8> {
    let mut out = Vec::new();
    encode_into(value, &mut out);
    out
}

fn encode_into(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Int(n) => {
            out.push(b'i');
            out.extend_from_slice(n.to_string().as_bytes());
            out.push(b'e');
        }
        Value::Bytes(bytes) => {
            out.extend_from_slice(bytes.len().to_string().as_bytes());
            out.push(b':');
            out.extend_from_slice(bytes);
        }
        Value::List(items) => {
            out.push(b'l');
            for item in items {
                encode_into(item, out);
            }
            out.push(b'e');
        }
        Value::Dict(map) => {
            out.push(b'd');
            for (key, item) in map {
                out.extend_from_slice(key.len().to_string().as_bytes());
                out.push(b':');
                out.extend_from_slice(key);
                encode_into(item, out);
            }
            out.push(b'e');
        }
    }
}

struct Cursor<'a> {
    input: &'a [u8],
    pos: usize,
}

impl Cursor<'_> {
    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn value(&mut self) -> Result<Value, WireError> {
        match self.peek() {
            None => Err(WireError::UnexpectedEof { offset: self.pos }),
            Some(b'i') => self.integer(),
            Some(b'l') => self.list().map(Value::List),
            Some(b'd') => self.dict(),
            Some(b'0'..=b'9') => self.byte_string().map(Value::Bytes),
            Some(byte) => Err(WireError::UnexpectedByte {
                offset: self.pos,
                byte,
            }),
        }
    }

    fn integer(&mut self) -> Result<Value, WireError> {
        let start = self.pos;
        self.pos += 1; // 'i'
        let digits_start = self.pos;
        if self.peek() == Some(b'-') {
            self.pos += 1;
        }
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.pos += 1;
        }
        match self.peek() {
            Some(b'e') => {}
            Some(_) | None => return Err(WireError::BadInteger { offset: start }),
        }
        let digits = &self.input[digits_start..self.pos];
        self.pos += 1; // 'e'
        let text = std::str::from_utf8(digits).map_err(|_| WireError::BadInteger { offset: start })?;
        let parsed: i64 = text
            .parse()
            .map_err(|_| WireError::BadInteger { offset: start })?;
        Ok(Value::Int(parsed))
    }

    fn byte_string(&mut self) -> Result<Vec<u8>, WireError> {
        let start = self.pos;
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.pos += 1;
        }
        match self.peek() {
            Some(b':') => {}
            Some(_) | None => return Err(WireError::BadLength { offset: start }),
        }
        let digits = &self.input[start..self.pos];
        self.pos += 1; // ':'
        let text = std::str::from_utf8(digits).map_err(|_| WireError::BadLength { offset: start })?;
        let len: usize = text
            .parse()
            .map_err(|_| WireError::BadLength { offset: start })?;
        let end = self
            .pos
            .checked_add(len)
            .ok_or(WireError::BadLength { offset: start })?;
        if end > self.input.len() {
            return Err(WireError::UnexpectedEof {
                offset: self.input.len(),
            });
        }
        let bytes = self.input[self.pos..end].to_vec();
        self.pos = end;
        Ok(bytes)
    }

    fn list(&mut self) -> Result<Vec<Value>, WireError> {
        self.pos += 1; // 'l' or 'd'
        let mut items = Vec::new();
        loop {
            match self.peek() {
                None => return Err(WireError::UnexpectedEof { offset: self.pos }),
                Some(b'e') => {
                    self.pos += 1;
                    return Ok(items);
                }
                Some(_) => items.push(self.value()?),
            }
        }
    }

    fn dict(&mut self) -> Result<Value, WireError> {
        let start = self.pos;
        // Children are decoded as a flat sequence, then split into alternating
        // key/value pairs.
        let children = self.list()?;
        if children.len() % 2 != 0 {
            return Err(WireError::DanglingKey { offset: start });
        }
        let mut map = BTreeMap::new();
        let mut children = children.into_iter();
        while let (Some(key), Some(value)) = (children.next(), children.next()) {
            let Value::Bytes(key) = key else {
                return Err(WireError::NonStringKey { offset: start });
            };
            map.insert(key, value);
        }
        Ok(Value::Dict(map))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_is_inverse_of_decode_for_a_reply_shaped_dict() {
        let mut args = BTreeMap::new();
        args.insert(b"page".to_vec(), Value::Int(0));
        let mut request = BTreeMap::new();
        request.insert(b"q".to_vec(), Value::Bytes(b"auth".to_vec()));
        request.insert(b"args".to_vec(), Value::Dict(args));
        let request = Value::Dict(request);

        let bytes = encode(&request);
        assert_eq!(decode(&bytes), Ok(request));
    }

    #[test]
    fn encode_emits_dict_keys_in_sorted_order() {
        let mut map = BTreeMap::new();
        map.insert(b"zz".to_vec(), Value::Int(1));
        map.insert(b"aa".to_vec(), Value::Int(2));
        let bytes = encode(&Value::Dict(map));
        assert_eq!(bytes, b"d2:aai2e2:zzi1ee".to_vec());
    }
}
