//! Shared serde helpers.

/// Serializes `Vec<u8>` fields as a standard base64 string.
///
/// Used with `#[serde(with = "crate::serde_helpers::base64_bytes")]` so that
/// byte fields such as CA certificates stay readable in YAML cluster records
/// instead of expanding into a sequence of integers. An empty string
/// deserializes to an empty vector.
pub(crate) mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub(crate) fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub(crate) fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.trim())
            .map_err(serde::de::Error::custom)
    }
}
