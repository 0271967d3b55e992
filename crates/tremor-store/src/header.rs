//! Sidecar text headers: ordered `name=value` pairs.
//!
//! A raw `f32` volume carries no self-description; its shape, spacing, and
//! units travel in a small text header next to it. Lines are `name=value`,
//! one per line; blank lines and `#` comments are ignored. Field order is
//! preserved so written headers are stable.

use std::fmt;

use indexmap::IndexMap;

use crate::error::StoreError;

/// An ordered set of `name=value` header fields.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VolumeHeader {
    fields: IndexMap<String, String>,
}

impl VolumeHeader {
    /// An empty header.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, replacing any previous value but keeping its position.
    pub fn set(&mut self, name: &str, value: impl fmt::Display) {
        self.fields.insert(name.to_string(), value.to_string());
    }

    /// Raw string value of a field.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Required field parsed as `usize`.
    ///
    /// # Errors
    ///
    /// [`StoreError::MissingField`] if absent,
    /// [`StoreError::MalformedHeader`] if unparsable.
    pub fn get_usize(&self, name: &str) -> Result<usize, StoreError> {
        self.require(name)?.parse().map_err(|_| StoreError::MalformedHeader {
            detail: format!("field '{name}' is not an unsigned integer"),
        })
    }

    /// Required field parsed as `f32`.
    ///
    /// # Errors
    ///
    /// [`StoreError::MissingField`] if absent,
    /// [`StoreError::MalformedHeader`] if unparsable.
    pub fn get_f32(&self, name: &str) -> Result<f32, StoreError> {
        self.require(name)?.parse().map_err(|_| StoreError::MalformedHeader {
            detail: format!("field '{name}' is not a number"),
        })
    }

    fn require(&self, name: &str) -> Result<&str, StoreError> {
        self.get(name).ok_or_else(|| StoreError::MissingField {
            name: name.to_string(),
        })
    }

    /// Parse a header from text.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MalformedHeader`] on a line without `=`.
    pub fn parse(text: &str) -> Result<Self, StoreError> {
        let mut fields = IndexMap::new();
        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (name, value) = line.split_once('=').ok_or_else(|| StoreError::MalformedHeader {
                detail: format!("line {}: expected name=value, got '{line}'", lineno + 1),
            })?;
            fields.insert(name.trim().to_string(), value.trim().to_string());
        }
        Ok(Self { fields })
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when no fields are set.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl fmt::Display for VolumeHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.fields {
            writeln!(f, "{name}={value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parse_skips_comments_and_blanks() {
        let h = VolumeHeader::parse("# shape\nn1=100\n\nn2=120\nd1=5.0\n").unwrap();
        assert_eq!(h.get_usize("n1").unwrap(), 100);
        assert_eq!(h.get_usize("n2").unwrap(), 120);
        assert_eq!(h.get_f32("d1").unwrap(), 5.0);
    }

    #[test]
    fn parse_rejects_missing_equals() {
        let err = VolumeHeader::parse("n1 100").unwrap_err();
        assert!(matches!(err, StoreError::MalformedHeader { .. }));
    }

    #[test]
    fn missing_field_is_named() {
        let h = VolumeHeader::parse("n1=100").unwrap();
        match h.get_usize("n2") {
            Err(StoreError::MissingField { name }) => assert_eq!(name, "n2"),
            other => panic!("expected MissingField, got {other:?}"),
        }
    }

    #[test]
    fn display_preserves_insertion_order() {
        let mut h = VolumeHeader::new();
        h.set("n1", 100);
        h.set("d1", 5.0);
        h.set("unit", "m/s");
        assert_eq!(h.to_string(), "n1=100\nd1=5\nunit=m/s\n");
    }

    proptest! {
        #[test]
        fn roundtrip(pairs in prop::collection::vec(("[a-z][a-z0-9_]{0,8}", "[a-zA-Z0-9./-]{1,12}"), 0..8)) {
            let mut h = VolumeHeader::new();
            for (k, v) in &pairs {
                h.set(k, v);
            }
            let parsed = VolumeHeader::parse(&h.to_string()).unwrap();
            prop_assert_eq!(h, parsed);
        }
    }
}
