use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::ParseError;

pub(crate) const CRLF: &[u8] = b"\r\n";

// ---------------------------------------------------------------------------
// Headers
// ---------------------------------------------------------------------------

/// Case-insensitive header store that keeps insertion order.
///
/// Names are lower-cased on the way in. Setting a name twice merges the
/// values with `", "` instead of overwriting, which is how repeated field
/// lines are folded together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    fields: Vec<(String, String)>,
}

/// Result of one [`Headers::parse`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderProgress {
    /// Bytes of field lines consumed, CRLFs included. The terminating empty
    /// line is *not* counted.
    pub consumed: usize,
    /// `true` once the empty line ending the header section was seen.
    pub complete: bool,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field, merging with an existing value of the same name.
    pub fn set(&mut self, name: &str, value: &str) {
        let key = name.to_ascii_lowercase();
        match self.position(&key) {
            Some(idx) => {
                let existing = &mut self.fields[idx].1;
                existing.push_str(", ");
                existing.push_str(value);
            }
            None => self.fields.push((key, value.to_string())),
        }
    }

    /// Insert a field, overwriting any existing value of the same name.
    pub fn replace(&mut self, name: &str, value: &str) {
        let key = name.to_ascii_lowercase();
        match self.position(&key) {
            Some(idx) => self.fields[idx].1 = value.to_string(),
            None => self.fields.push((key, value.to_string())),
        }
    }

    /// Look up a field value by name (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&str> {
        let key = name.to_ascii_lowercase();
        self.position(&key).map(|idx| self.fields[idx].1.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterate over `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.fields.iter().position(|(k, _)| k == key)
    }

    /// Check the framing rules that make a header section unambiguous.
    ///
    /// Fails if both `Content-Length` and `Transfer-Encoding` are present, or
    /// if there is not exactly one `Host` field. A merged `Host` value means
    /// the field appeared more than once.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::MalformedHeaders`] on the first violated rule.
    pub fn validate(&self) -> Result<(), ParseError> {
        self.validate_framing()?;
        if !self.contains("host") {
            return Err(ParseError::MalformedHeaders("missing Host header"));
        }
        Ok(())
    }

    /// The subset of [`validate`](Self::validate) that holds even for
    /// requests without a `Host` field.
    pub(crate) fn validate_framing(&self) -> Result<(), ParseError> {
        if self.contains("content-length") && self.contains("transfer-encoding") {
            return Err(ParseError::MalformedHeaders(
                "both Content-Length and Transfer-Encoding present",
            ));
        }
        if self.get("host").is_some_and(|h| h.contains(',')) {
            return Err(ParseError::MalformedHeaders("multiple Host headers"));
        }
        Ok(())
    }

    /// Consume complete field lines from the front of `data`.
    ///
    /// Stops at the first incomplete line ("need more data") or at the
    /// empty line that ends the section. Callers must pass only the bytes
    /// not consumed by previous calls.
    ///
    /// # Errors
    ///
    /// [`ParseError::MalformedHeaderLine`] for a line without a colon or with
    /// whitespace before the colon, [`ParseError::InvalidFieldName`] for a
    /// name containing non-token bytes.
    pub fn parse(&mut self, data: &[u8]) -> Result<HeaderProgress, ParseError> {
        let mut consumed = 0;

        while let Some(line_len) = find_crlf(&data[consumed..]) {
            if line_len == 0 {
                return Ok(HeaderProgress {
                    consumed,
                    complete: true,
                });
            }

            let line = &data[consumed..consumed + line_len];
            let (name, value) = parse_field_line(line)?;
            self.set(&name, &value);
            consumed += line_len + CRLF.len();
        }

        Ok(HeaderProgress {
            consumed,
            complete: false,
        })
    }
}

impl Serialize for Headers {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Split one field line (without its CRLF) into name and trimmed value.
fn parse_field_line(line: &[u8]) -> Result<(String, String), ParseError> {
    let lossy = || String::from_utf8_lossy(line).into_owned();

    let colon = line
        .iter()
        .position(|&b| b == b':')
        .ok_or_else(|| ParseError::MalformedHeaderLine(lossy()))?;

    // "Name : value" is rejected outright rather than trimmed.
    if colon > 0 && matches!(line[colon - 1], b' ' | b'\t') {
        return Err(ParseError::MalformedHeaderLine(lossy()));
    }

    let name = &line[..colon];
    if name.is_empty() || !name.iter().all(|&b| is_tchar(b)) {
        return Err(ParseError::InvalidFieldName(
            String::from_utf8_lossy(name).into_owned(),
        ));
    }

    let value = String::from_utf8_lossy(&line[colon + 1..]);
    let value = value.trim_matches(|c: char| c == ' ' || c == '\t');

    Ok((
        String::from_utf8_lossy(name).into_owned(),
        value.to_string(),
    ))
}

// ---------------------------------------------------------------------------
// Byte helpers
// ---------------------------------------------------------------------------

/// Offset of the first CRLF in `buf`, if any.
pub(crate) fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(CRLF.len()).position(|w| w == CRLF)
}

/// `tchar` – characters allowed in header field names.
///
/// ```text
/// tchar = "!" / "#" / "$" / "%" / "&" / "'" / "*" / "+" / "-" / "." /
///         "^" / "_" / "`" / "|" / "~" / DIGIT / ALPHA
/// ```
#[inline]
fn is_tchar(b: u8) -> bool {
    matches!(
        b,
        b'!' | b'#'
            | b'$'
            | b'%'
            | b'&'
            | b'\''
            | b'*'
            | b'+'
            | b'-'
            | b'.'
            | b'^'
            | b'_'
            | b'`'
            | b'|'
            | b'~'
            | b'0'..=b'9'
            | b'a'..=b'z'
            | b'A'..=b'Z'
    )
}
