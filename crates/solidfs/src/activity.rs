//! I define parsing of ActivityStreams change notices delivered over
//! notification websockets.
//!

use pod_uri::PodUri;
use serde_json::Value;

/// Expanded iri of the `Update` activity type.
pub const ACTIVITY_UPDATE: &str = "https://www.w3.org/ns/activitystreams#Update";

/// Expanded iri of the `Delete` activity type.
pub const ACTIVITY_DELETE: &str = "https://www.w3.org/ns/activitystreams#Delete";

/// A change activity the mount knows how to react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    /// The resource's representation changed.
    Update,

    /// The resource was removed.
    Delete,
}

/// Error of an unusable notification message.
#[derive(Debug, thiserror::Error)]
pub enum ActivityError {
    /// The message is not valid json.
    #[error("invalid notification json: {0}")]
    Json(#[from] serde_json::Error),

    /// The message is about a different resource than the
    /// subscription topic.
    #[error("unexpected notification for {actual:?} instead of {expected}")]
    UnexpectedTopic {
        /// Object uris named by the message.
        actual: Vec<String>,

        /// The subscription topic.
        expected: String,
    },
}

/// Parse a notification message about `topic`.
///
/// Messages arrive as compacted json-ld; only the `type` and `object`
/// keys are ever inspected, in both their compact and expanded forms.
/// Activities of unknown types yield `None`.
pub fn parse_activity(topic: &PodUri, message: &str) -> Result<Option<Activity>, ActivityError> {
    let value: Value = serde_json::from_str(message)?;

    let objects = collect_strings(value.get("object").or_else(|| value.get("@object")));
    if !objects.iter().any(|o| o == topic.as_str()) {
        return Err(ActivityError::UnexpectedTopic {
            actual: objects,
            expected: topic.to_string(),
        });
    }

    let types = collect_strings(value.get("type").or_else(|| value.get("@type")));
    for type_name in &types {
        match type_name.as_str() {
            "Update" | ACTIVITY_UPDATE => return Ok(Some(Activity::Update)),
            "Delete" | ACTIVITY_DELETE => return Ok(Some(Activity::Delete)),
            _ => {}
        }
    }

    Ok(None)
}

/// Collect the string forms of a json-ld value position: a string, an
/// object with `id`/`@id`, or an array of either.
fn collect_strings(value: Option<&Value>) -> Vec<String> {
    let mut collected = Vec::new();
    let Some(value) = value else {
        return collected;
    };

    let items: Box<dyn Iterator<Item = &Value>> = match value {
        Value::Array(items) => Box::new(items.iter()),
        other => Box::new(std::iter::once(other)),
    };

    for item in items {
        match item {
            Value::String(s) => collected.push(s.clone()),
            Value::Object(map) => {
                if let Some(Value::String(id)) = map.get("id").or_else(|| map.get("@id")) {
                    collected.push(id.clone());
                }
            }
            _ => {}
        }
    }
    collected
}
