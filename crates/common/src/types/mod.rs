use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Serialize, Deserialize, Debug)]
pub struct Health {
    pub status: &'static str,
}

/// Opaque bytes that travel as standard base64 text in JSON.
///
/// Used for secrets such as a new password, so `Debug` never prints the content.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Base64(Vec<u8>);

impl Base64 {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn encode(&self) -> String {
        STANDARD.encode(&self.0)
    }

    pub fn decode(text: &str) -> Result<Self, base64::DecodeError> {
        STANDARD.decode(text.trim()).map(Self)
    }
}

impl fmt::Debug for Base64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Base64(<{} bytes>)", self.0.len())
    }
}

impl Serialize for Base64 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}

struct Base64Visitor;

impl<'de> Visitor<'de> for Base64Visitor {
    type Value = Base64;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a base64 encoded string")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Base64::decode(v).map_err(|e| E::custom(format!("invalid base64: {e}")))
    }
}

impl<'de> Deserialize<'de> for Base64 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_str(Base64Visitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base64_reads_standard_text() {
        let v: Base64 = serde_json::from_str("\"c2VjcmV0MTIz\"").unwrap();
        assert_eq!(v.as_bytes(), b"secret123");
        assert_eq!(serde_json::to_string(&v).unwrap(), "\"c2VjcmV0MTIz\"");
    }

    #[test]
    fn base64_rejects_garbage_and_non_strings() {
        assert!(serde_json::from_str::<Base64>("\"%%%\"").is_err());
        assert!(serde_json::from_str::<Base64>("42").is_err());
    }

    #[test]
    fn base64_debug_hides_content() {
        let v = Base64::new(b"hunter22".to_vec());
        assert_eq!(format!("{v:?}"), "Base64(<8 bytes>)");
    }
}
