//! Record decoding
//!
//! Turns one unit of input (an NDJSON line, or one element of a large
//! top-level JSON array) into a [`RawEvent`]. A malformed unit yields a
//! decode error carrying the offending raw text; it never aborts the
//! stream.

use evload_common::{EvloadError, Result};
use serde_json::{Map, Value};
use std::io::BufRead;

/// Shape of the input stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputFormat {
    /// Newline-delimited JSON objects
    #[default]
    Ndjson,
    /// One top-level JSON array, consumed incrementally element-by-element
    Array,
}

/// One untyped input record: a mapping from field name to a
/// dynamically-typed JSON value.
///
/// Arbitrary extra keys are carried along and ignored; expected keys may
/// be absent. All access goes through typed accessors that treat absence
/// and JSON null identically, so callers never assume key presence.
#[derive(Debug, Clone, Default)]
pub struct RawEvent {
    fields: Map<String, Value>,
}

impl RawEvent {
    /// Build from an already-parsed JSON value; anything but an object
    /// is a decode failure.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(EvloadError::decode("expected a JSON object", other.to_string())),
        }
    }

    /// Parse one raw JSON unit. The offending text is attached to the
    /// error on failure.
    pub fn from_str(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| EvloadError::decode(e.to_string(), raw.trim().to_string()))?;
        Self::from_value(value)
    }

    /// Raw value for a field; absent keys and JSON null both read as `None`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self.fields.get(key) {
            Some(Value::Null) | None => None,
            Some(value) => Some(value),
        }
    }

    /// String-typed field. Bare scalars are stringified; structured
    /// values read as `None`.
    pub fn str_field(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Field that upstream always coerced to text: strings pass through,
    /// any other non-null value is rendered as JSON text.
    pub fn stringified(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Opaque passthrough for fields whose wire type varies (numeric or
    /// string price fields, mixed-type identifiers).
    pub fn passthrough(&self, key: &str) -> Option<Value> {
        self.get(key).cloned()
    }
}

/// Decoder over newline-delimited JSON objects.
pub struct NdjsonDecoder<R> {
    reader: R,
    done: bool,
}

impl<R: BufRead> NdjsonDecoder<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            done: false,
        }
    }
}

impl<R: BufRead> Iterator for NdjsonDecoder<R> {
    type Item = Result<RawEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let mut line = String::new();
            match self.reader.read_line(&mut line) {
                Ok(0) => return None,
                Ok(_) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    return Some(RawEvent::from_str(trimmed));
                },
                Err(err) => {
                    self.done = true;
                    return Some(Err(err.into()));
                },
            }
        }
    }
}

/// Incremental decoder over one top-level JSON array too large to hold
/// in memory. Elements are scanned byte-by-byte (tracking nesting depth
/// and string state) and parsed one at a time, bounding memory to the
/// largest single element.
pub struct JsonArrayDecoder<R> {
    reader: R,
    started: bool,
    finished: bool,
}

impl<R: BufRead> JsonArrayDecoder<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            started: false,
            finished: false,
        }
    }

    fn next_byte(&mut self) -> std::io::Result<Option<u8>> {
        let buf = self.reader.fill_buf()?;
        if buf.is_empty() {
            return Ok(None);
        }
        let byte = buf[0];
        self.reader.consume(1);
        Ok(Some(byte))
    }

    fn next_significant(&mut self) -> std::io::Result<Option<u8>> {
        loop {
            match self.next_byte()? {
                Some(b) if b.is_ascii_whitespace() => continue,
                other => return Ok(other),
            }
        }
    }

    /// Read one element starting at `first`, returning its raw bytes and
    /// whether the array's closing bracket immediately followed it.
    fn read_element(&mut self, first: u8) -> Result<(Vec<u8>, bool)> {
        let mut out = vec![first];
        let mut depth = 0i32;
        let mut in_string = false;
        let mut escaped = false;
        match first {
            b'{' | b'[' => depth = 1,
            b'"' => in_string = true,
            _ => {},
        }
        loop {
            let byte = match self.next_byte()? {
                Some(b) => b,
                None => {
                    return Err(EvloadError::decode(
                        "unterminated array element",
                        String::from_utf8_lossy(&out).into_owned(),
                    ))
                },
            };
            if in_string {
                out.push(byte);
                if escaped {
                    escaped = false;
                } else if byte == b'\\' {
                    escaped = true;
                } else if byte == b'"' {
                    in_string = false;
                }
                continue;
            }
            match byte {
                b'"' => {
                    in_string = true;
                    out.push(byte);
                },
                b'{' | b'[' => {
                    depth += 1;
                    out.push(byte);
                },
                b'}' => {
                    depth -= 1;
                    out.push(byte);
                },
                b']' => {
                    if depth == 0 {
                        return Ok((out, true));
                    }
                    depth -= 1;
                    out.push(byte);
                },
                b',' if depth == 0 => return Ok((out, false)),
                _ => out.push(byte),
            }
        }
    }
}

impl<R: BufRead> Iterator for JsonArrayDecoder<R> {
    type Item = Result<RawEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        if !self.started {
            match self.next_significant() {
                Ok(Some(b'[')) => self.started = true,
                Ok(Some(other)) => {
                    self.finished = true;
                    return Some(Err(EvloadError::decode(
                        "expected a top-level JSON array",
                        (other as char).to_string(),
                    )));
                },
                Ok(None) => {
                    self.finished = true;
                    return Some(Err(EvloadError::decode(
                        "empty input, expected a JSON array",
                        String::new(),
                    )));
                },
                Err(err) => {
                    self.finished = true;
                    return Some(Err(err.into()));
                },
            }
        }
        let first = loop {
            match self.next_significant() {
                Ok(Some(b']')) => {
                    self.finished = true;
                    return None;
                },
                Ok(Some(b',')) => continue,
                Ok(Some(byte)) => break byte,
                Ok(None) => {
                    self.finished = true;
                    return Some(Err(EvloadError::decode(
                        "unterminated JSON array",
                        String::new(),
                    )));
                },
                Err(err) => {
                    self.finished = true;
                    return Some(Err(err.into()));
                },
            }
        };
        match self.read_element(first) {
            Ok((bytes, closed)) => {
                if closed {
                    self.finished = true;
                }
                let raw = String::from_utf8_lossy(&bytes);
                Some(RawEvent::from_str(raw.trim()))
            },
            Err(err) => {
                self.finished = true;
                Some(Err(err))
            },
        }
    }
}

/// Decoder for the given input shape as a unified record iterator.
pub fn decoder_for<R: BufRead + 'static>(
    reader: R,
    format: InputFormat,
) -> Box<dyn Iterator<Item = Result<RawEvent>>> {
    match format {
        InputFormat::Ndjson => Box::new(NdjsonDecoder::new(reader)),
        InputFormat::Array => Box::new(JsonArrayDecoder::new(reader)),
    }
}
