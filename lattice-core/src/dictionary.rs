//! Signed key/value dictionaries.
//!
//! The network-config payload a controller hands to a member is a flat
//! string dictionary with a deterministic serialization: entries sorted by
//! key, one `key=value` pair per line, with `\0`, tab, CR, LF, `=` and the
//! backslash escaped. Keys beginning with `~!` are reserved for the
//! signature fields added by [`Dictionary::sign`]; the signature covers the
//! serialization of every non-reserved entry.

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use thiserror::Error;

use crate::identity::{Identity, SecretIdentity, SIGNATURE_BYTES};
use crate::util::{bytes_to_hex, hex_to_bytes};

/// Signature over all non-reserved entries, lowercase hex.
pub const SIGNATURE_KEY: &str = "~!ed25519";
/// Serialized public identity of the signer.
pub const SIGNATURE_IDENTITY_KEY: &str = "~!sigid";
/// Signing timestamp in milliseconds, lowercase hex.
pub const SIGNATURE_TIMESTAMP_KEY: &str = "~!sigts";

#[derive(Debug, Error)]
pub enum DictionaryError {
    #[error("Dictionary entry is not a key=value pair: {0}")]
    MissingSeparator(String),

    #[error("Invalid escape sequence")]
    InvalidEscape,
}

/// A sorted string-to-string dictionary with a signable serialization.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Dictionary(BTreeMap<String, String>);

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) {
        self.0.remove(key);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Serialization of the non-reserved entries, i.e. the bytes a signature
    /// covers.
    fn signable(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.0 {
            if key.starts_with("~!") {
                continue;
            }
            append_escaped(&mut out, key);
            out.push('=');
            append_escaped(&mut out, value);
            out.push('\n');
        }
        out
    }

    /// Sign with `signer`, replacing any previous signature fields.
    pub fn sign(&mut self, signer: &SecretIdentity, now: u64) {
        self.0.remove(SIGNATURE_KEY);
        self.0.remove(SIGNATURE_IDENTITY_KEY);
        self.0.remove(SIGNATURE_TIMESTAMP_KEY);

        let signature = signer.sign(self.signable().as_bytes());
        self.set(SIGNATURE_IDENTITY_KEY, signer.public().to_string());
        self.set(SIGNATURE_TIMESTAMP_KEY, format!("{now:x}"));
        self.set(SIGNATURE_KEY, bytes_to_hex(&signature));
    }

    pub fn has_signature(&self) -> bool {
        self.0.contains_key(SIGNATURE_KEY)
    }

    /// The identity embedded in the signature fields, if present and parsable.
    pub fn signer_identity(&self) -> Option<Identity> {
        self.get(SIGNATURE_IDENTITY_KEY)?.parse().ok()
    }

    /// Verify the embedded signature against `id`.
    pub fn verify(&self, id: &Identity) -> bool {
        let Some(signer) = self.signer_identity() else {
            return false;
        };
        if signer != *id {
            return false;
        }
        let Some(signature) = self
            .get(SIGNATURE_KEY)
            .and_then(|hex| hex_to_bytes::<SIGNATURE_BYTES>(hex).ok())
        else {
            return false;
        };
        id.verify(self.signable().as_bytes(), &signature)
    }
}

impl Display for Dictionary {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.0 {
            let mut line = String::new();
            append_escaped(&mut line, key);
            line.push('=');
            append_escaped(&mut line, value);
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Dictionary {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.0.iter()).finish()
    }
}

impl FromStr for Dictionary {
    type Err = DictionaryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut dict = Self::new();
        for line in s.split('\n') {
            if line.is_empty() {
                continue;
            }
            let (key, value) = split_unescaped(line)?;
            dict.0.insert(unescape(key)?, unescape(value)?);
        }
        Ok(dict)
    }
}

fn append_escaped(out: &mut String, s: &str) {
    for c in s.chars() {
        match c {
            '\0' => out.push_str("\\0"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            '=' => out.push_str("\\="),
            '\\' => out.push_str("\\\\"),
            c => out.push(c),
        }
    }
}

/// Split a serialized entry at its first unescaped `=`.
fn split_unescaped(line: &str) -> Result<(&str, &str), DictionaryError> {
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        match c {
            '\\' if !escaped => escaped = true,
            '=' if !escaped => return Ok((&line[..i], &line[i + 1..])),
            _ => escaped = false,
        }
    }
    Err(DictionaryError::MissingSeparator(line.to_string()))
}

fn unescape(s: &str) -> Result<String, DictionaryError> {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('0') => out.push('\0'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some('=') => out.push('='),
            Some('\\') => out.push('\\'),
            _ => return Err(DictionaryError::InvalidEscape),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialization_is_sorted_and_escaped() {
        let mut dict = Dictionary::new();
        dict.set("b", "two=2");
        dict.set("a", "line\nbreak");
        assert_eq!(dict.to_string(), "a=line\\nbreak\nb=two\\=2\n");
    }

    #[test]
    fn test_parse_round_trip() {
        let mut dict = Dictionary::new();
        dict.set("name", "back\\slash");
        dict.set("nwid", "deadbeefcafe0001");
        dict.set("note", "a=b\nc");

        let parsed: Dictionary = dict.to_string().parse().unwrap();
        assert_eq!(parsed, dict);
    }

    #[test]
    fn test_sign_and_verify() {
        let signer = SecretIdentity::generate();
        let mut dict = Dictionary::new();
        dict.set("nwid", "deadbeefcafe0001");
        dict.set("r", "0000000000000007");

        dict.sign(&signer, 1_700_000_000_000);
        assert!(dict.has_signature());
        assert_eq!(
            dict.get(SIGNATURE_TIMESTAMP_KEY),
            Some(format!("{:x}", 1_700_000_000_000u64).as_str())
        );
        assert!(dict.verify(signer.public()));

        let other = SecretIdentity::generate();
        assert!(!dict.verify(other.public()));
    }

    #[test]
    fn test_verify_detects_tampering() {
        let signer = SecretIdentity::generate();
        let mut dict = Dictionary::new();
        dict.set("p", "1");
        dict.sign(&signer, 1);

        dict.set("p", "0");
        assert!(!dict.verify(signer.public()));
    }

    #[test]
    fn test_resign_replaces_signature() {
        let signer = SecretIdentity::generate();
        let mut dict = Dictionary::new();
        dict.set("n", "demo");
        dict.sign(&signer, 1);
        let first = dict.get(SIGNATURE_KEY).unwrap().to_string();

        dict.set("n", "renamed");
        dict.sign(&signer, 2);
        assert_ne!(dict.get(SIGNATURE_KEY).unwrap(), first);
        assert!(dict.verify(signer.public()));
    }
}
