//! Home Assistant MQTT discovery documents.
//!
//! The document is a text template with two placeholders, `<BASE_TOPIC>`
//! and `<NAME>`, filled from each entity's topic base and description.  It
//! is published retained to `<topic_base><discovery_suffix>` once per
//! broker session.

use core::fmt;

use crate::catalog::{Catalog, Entity};
use crate::config::MqttSettings;

const BASE_TOPIC: &str = "<BASE_TOPIC>";
const NAME: &str = "<NAME>";

/// One rendered announcement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    pub topic: String,
    pub payload: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryError {
    /// The filled template is not a JSON document.
    InvalidDocument { topic: String, reason: String },
}

impl fmt::Display for DiscoveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDocument { topic, reason } => {
                write!(f, "discovery document for {} is not JSON: {}", topic, reason)
            }
        }
    }
}

/// Substitute both placeholders.  The description is JSON-escaped so a
/// quote or backslash in a name cannot break the document.
pub fn render(template: &str, entity: &Entity) -> String {
    template
        .replace(BASE_TOPIC, &escape(entity.topic_base()))
        .replace(NAME, &escape(entity.description()))
}

/// JSON string escaping without the surrounding quotes.
fn escape(text: &str) -> String {
    let quoted = serde_json::to_string(text).unwrap_or_default();
    quoted
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(text)
        .to_owned()
}

/// Render and check the announcement of one entity.
pub fn announce(settings: &MqttSettings, entity: &Entity) -> Result<Announcement, DiscoveryError> {
    let topic = format!("{}{}", entity.topic_base(), settings.discovery_suffix);
    let payload = render(&settings.discovery_template, entity);
    if let Err(e) = serde_json::from_str::<serde_json::Value>(&payload) {
        return Err(DiscoveryError::InvalidDocument {
            topic,
            reason: e.to_string(),
        });
    }
    Ok(Announcement { topic, payload })
}

/// Announcements for every entity, in id order.
pub fn announcements(
    settings: &MqttSettings,
    catalog: &Catalog,
) -> Result<Vec<Announcement>, DiscoveryError> {
    catalog.entities().map(|e| announce(settings, e)).collect()
}
