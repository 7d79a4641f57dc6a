//! Inbound queue payload decoding.

use std::collections::HashMap;

/// Literal prefix that routes a message through the augmentation backend.
pub const AUGMENTATION_MARKER: &str = "@gpt";

/// A decoded queue payload. Missing fields fall back to safe placeholders so
/// a partially-formed payload still produces a routable message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundPayload {
    pub user_name: String,
    pub group_name: String,
    pub message: String,
    /// Client-supplied timestamp, relayed verbatim.
    pub timestamp: String,
}

impl InboundPayload {
    /// Decode a payload from a flat string-keyed JSON mapping.
    ///
    /// Anything that is not such a mapping (arrays, scalars, non-string
    /// values) is a decode error; the payload will never decode and must not
    /// be retried.
    pub fn decode(raw: &str) -> Result<Self, serde_json::Error> {
        let fields: HashMap<String, String> = serde_json::from_str(raw)?;
        Ok(Self {
            user_name: field_or(&fields, "userName", "Unknown"),
            group_name: field_or(&fields, "groupName", "default"),
            message: field_or(&fields, "message", ""),
            timestamp: field_or(&fields, "timestamp", ""),
        })
    }

    /// Whether the message carries the augmentation marker prefix.
    pub fn wants_augmentation(&self) -> bool {
        self.message.starts_with(AUGMENTATION_MARKER)
    }
}

fn field_or(fields: &HashMap<String, String>, key: &str, fallback: &str) -> String {
    fields
        .get(key)
        .cloned()
        .unwrap_or_else(|| fallback.to_string())
}
