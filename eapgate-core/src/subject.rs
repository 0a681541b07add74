//! Distinguished-name parsing for certificate subjects and issuers.
//!
//! Accepts the comma-separated `KEY=value` form produced by X.509 libraries
//! (e.g. `CN=radius.corp.example, O=Example Corp, C=US`). Backslash escapes
//! inside values are honoured.

use serde::{Deserialize, Serialize};

/// Email attribute OID, emitted verbatim by some DN renderers.
const EMAIL_ADDRESS_OID: &str = "1.2.840.113549.1.9.1";

/// Errors that can occur while parsing a distinguished name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum SubjectError {
    /// The distinguished name is empty or whitespace.
    #[error("empty distinguished name")]
    Empty,

    /// No non-empty common name (`CN`) attribute was found.
    #[error("distinguished name has no common name")]
    MissingCommonName,
}

/// Structured view of a certificate subject or issuer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectInfo {
    /// `CN` attribute. Always non-empty.
    pub common_name: String,
    /// `O` attribute.
    pub organization: Option<String>,
    /// `OU` attribute.
    pub organizational_unit: Option<String>,
    /// `E` / `emailAddress` attribute.
    pub email: Option<String>,
    /// `C` attribute.
    pub country: Option<String>,
    /// `ST` attribute.
    pub state: Option<String>,
    /// `L` attribute.
    pub locality: Option<String>,
    /// The distinguished name this was parsed from, trimmed.
    pub raw: String,
}

impl SubjectInfo {
    /// Parse a distinguished-name string.
    ///
    /// Unknown attributes are ignored. When an attribute repeats, the last
    /// occurrence wins.
    ///
    /// # Errors
    ///
    /// Returns `SubjectError::Empty` for an empty string and
    /// `SubjectError::MissingCommonName` when no non-empty `CN` is present.
    pub fn parse(dn: &str) -> Result<Self, SubjectError> {
        let trimmed = dn.trim();
        if trimmed.is_empty() {
            return Err(SubjectError::Empty);
        }

        let mut info = SubjectInfo {
            raw: trimmed.to_string(),
            ..Default::default()
        };
        let mut common_name = None;

        for part in split_unescaped(trimmed, ',') {
            let Some((key, value)) = split_unescaped_once(&part, '=') else {
                continue;
            };
            let value = unescape(value.trim());
            if value.is_empty() {
                continue;
            }

            match key.trim().to_ascii_uppercase().as_str() {
                "CN" => common_name = Some(value),
                "O" => info.organization = Some(value),
                "OU" => info.organizational_unit = Some(value),
                "C" => info.country = Some(value),
                "ST" => info.state = Some(value),
                "L" => info.locality = Some(value),
                "E" | "EMAIL" | "EMAILADDRESS" | EMAIL_ADDRESS_OID => info.email = Some(value),
                _ => {}
            }
        }

        info.common_name = common_name.ok_or(SubjectError::MissingCommonName)?;
        Ok(info)
    }
}

/// Split on `separator` wherever it is not preceded by an escaping backslash.
///
/// Escape sequences are kept intact in the output segments.
fn split_unescaped(input: &str, separator: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut escaped = false;

    for c in input.chars() {
        if escaped {
            current.push(c);
            escaped = false;
        } else if c == '\\' {
            current.push(c);
            escaped = true;
        } else if c == separator {
            parts.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    parts.push(current);
    parts
}

/// Split at the first unescaped `separator`.
fn split_unescaped_once(input: &str, separator: char) -> Option<(&str, &str)> {
    let mut escaped = false;
    for (idx, c) in input.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == separator {
            return Some((&input[..idx], &input[idx + c.len_utf8()..]));
        }
    }
    None
}

fn unescape(value: &str) -> String {
    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value);

    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}
