//! Runtime context handed to backend factories.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Host parameters a factory may consult when constructing a decoder backend
/// or a render surface.
///
/// The context is read-only from the factory's point of view; a factory must
/// not keep a reference to it past `create`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuntimeContext {
    /// Identifier of the embedding application.
    pub app_id: String,
    /// Whether the host prefers hardware (MediaCodec/VideoToolbox-style) decoding.
    pub prefer_hardware_decoding: bool,
    /// User agent forwarded to network-capable backends.
    pub user_agent: Option<String>,
    /// Free-form, backend-specific options.
    pub properties: HashMap<String, String>,
}

impl RuntimeContext {
    pub fn new(app_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            ..Default::default()
        }
    }

    pub fn with_hardware_decoding(mut self, enabled: bool) -> Self {
        self.prefer_hardware_decoding = enabled;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_builder() {
        let context = RuntimeContext::new("com.example.player")
            .with_hardware_decoding(true)
            .with_user_agent("player/1.0")
            .with_property("cache_dir", "/tmp/media");

        assert_eq!(context.app_id, "com.example.player");
        assert!(context.prefer_hardware_decoding);
        assert_eq!(context.user_agent.as_deref(), Some("player/1.0"));
        assert_eq!(context.property("cache_dir"), Some("/tmp/media"));
        assert_eq!(context.property("missing"), None);
    }

    #[test]
    fn test_context_serialization() {
        let context = RuntimeContext::new("app").with_property("k", "v");
        let json = serde_json::to_string(&context).unwrap();
        let back: RuntimeContext = serde_json::from_str(&json).unwrap();
        assert_eq!(back, context);
    }
}
