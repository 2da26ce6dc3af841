//! The `key=value` line format spoken on the log's HTTP API.
//!
//! Every message has a fixed set of keys. Single-valued keys must appear exactly once,
//! list-valued keys may repeat and are paired up by position.

use std::fmt::Write as _;

/// Wire format errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AsciiError {
    #[error("line {0} is not a key=value pair")]
    MalformedLine(usize),
    #[error("unexpected key {0:?}")]
    UnknownKey(String),
    #[error("missing key {0:?}")]
    MissingKey(&'static str),
    #[error("key {0:?} must appear exactly once")]
    RepeatedKey(&'static str),
    #[error("invalid number for {0:?}")]
    InvalidNumber(&'static str),
    #[error("invalid hex for {key:?}: expected {len} bytes")]
    InvalidHex { key: &'static str, len: usize },
    #[error("mismatched list lengths for {0:?}")]
    UnpairedList(&'static str),
    #[error("{0}")]
    Invalid(&'static str),
}

/// Serializes a message into its wire form.
pub trait ToAscii {
    fn to_ascii(&self) -> String;
}

/// Parses a message from its wire form.
pub trait FromAscii: Sized {
    fn from_ascii(input: &str) -> Result<Self, AsciiError>;
}

/// A parsed message: the `key=value` pairs in input order.
#[derive(Debug)]
pub struct AsciiDecoder<'a> {
    fields: Vec<(&'a str, &'a str)>,
}

impl<'a> AsciiDecoder<'a> {
    /// Splits `input` into fields and checks that only `keys` are used.
    pub fn parse(input: &'a str, keys: &[&'static str]) -> Result<Self, AsciiError> {
        let mut fields = Vec::new();
        for (n, line) in input.lines().enumerate() {
            let (key, value) = line.split_once('=').ok_or(AsciiError::MalformedLine(n + 1))?;
            if !keys.contains(&key) {
                return Err(AsciiError::UnknownKey(key.to_string()));
            }
            fields.push((key, value));
        }
        Ok(Self { fields })
    }

    /// Value of a key that must appear exactly once.
    pub fn single(&self, key: &'static str) -> Result<&'a str, AsciiError> {
        let mut values = self.repeated(key).into_iter();
        match (values.next(), values.next()) {
            (Some(value), None) => Ok(value),
            (None, _) => Err(AsciiError::MissingKey(key)),
            (Some(_), Some(_)) => Err(AsciiError::RepeatedKey(key)),
        }
    }

    /// Every value of `key`, in input order.
    pub fn repeated(&self, key: &'static str) -> Vec<&'a str> {
        self.fields
            .iter()
            .filter(|(k, _)| *k == key)
            .map(|(_, v)| *v)
            .collect()
    }

    pub fn number(&self, key: &'static str) -> Result<u64, AsciiError> {
        parse_number(key, self.single(key)?)
    }

    pub fn bytes<const N: usize>(&self, key: &'static str) -> Result<[u8; N], AsciiError> {
        parse_hex(key, self.single(key)?)
    }

    pub fn bytes_list<const N: usize>(
        &self,
        key: &'static str,
    ) -> Result<Vec<[u8; N]>, AsciiError> {
        self.repeated(key)
            .into_iter()
            .map(|value| parse_hex(key, value))
            .collect()
    }
}

fn parse_number(key: &'static str, value: &str) -> Result<u64, AsciiError> {
    // u64::from_str accepts a leading '+', the wire format does not
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AsciiError::InvalidNumber(key));
    }
    value.parse().map_err(|_| AsciiError::InvalidNumber(key))
}

fn parse_hex<const N: usize>(key: &'static str, value: &str) -> Result<[u8; N], AsciiError> {
    let mut out = [0u8; N];
    hex::decode_to_slice(value, &mut out).map_err(|_| AsciiError::InvalidHex { key, len: N })?;
    Ok(out)
}

/// Builds a message line by line.
#[derive(Debug, Default)]
pub struct AsciiEncoder {
    out: String,
}

impl AsciiEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn number(&mut self, key: &str, value: u64) -> &mut Self {
        // writing into a String cannot fail
        let _ = writeln!(self.out, "{key}={value}");
        self
    }

    pub fn bytes(&mut self, key: &str, value: &[u8]) -> &mut Self {
        let _ = writeln!(self.out, "{key}={}", hex::encode(value));
        self
    }

    pub fn finish(&mut self) -> String {
        std::mem::take(&mut self.out)
    }
}
