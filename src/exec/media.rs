//! Media metadata as printed by `--dump-json`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::ExecError;

/// Version block attached to every record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VersionInfo {
    /// Tool version that produced the record.
    #[serde(default)]
    pub version: String,
    /// Remaining fields (`release_git_head`, `repository`, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One media record.
///
/// Only `_type` and `_version` are typed; every other field is kept as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Record type, e.g. `"video"` or `"playlist"`.
    #[serde(rename = "_type", default)]
    pub kind: String,
    /// Version of the tool that produced the record.
    #[serde(rename = "_version", default)]
    pub version: VersionInfo,
    /// All other fields.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl MediaInfo {
    /// Look up a field by name.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Look up a string field by name.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// The `id` field.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.get_str("id")
    }

    /// The `title` field.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.get_str("title")
    }
}

/// Metadata for a single item or for each item of a multi-item query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MediaInfoResult {
    /// The tool printed one object.
    Single(Box<MediaInfo>),
    /// The tool printed one object per line.
    Many(Vec<MediaInfo>),
}

impl MediaInfoResult {
    /// All records in output order.
    #[must_use]
    pub fn into_vec(self) -> Vec<MediaInfo> {
        match self {
            Self::Single(info) => vec![*info],
            Self::Many(infos) => infos,
        }
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Many(infos) => infos.len(),
        }
    }

    /// Returns true if there are no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Parse `--dump-json` output.
///
/// A single item is printed as one bare object; multi-item queries print
/// one object per line with no enclosing array, so on a failed whole-text
/// parse the lines are joined into an array and parsed again.
///
/// # Errors
///
/// Returns `ExecError::Parse` if neither form parses.
pub fn parse_media_info(stdout: &str) -> Result<MediaInfoResult, ExecError> {
    if let Ok(value) = serde_json::from_str::<Value>(stdout) {
        return Ok(match value {
            Value::Array(_) => MediaInfoResult::Many(serde_json::from_value(value)?),
            _ => MediaInfoResult::Single(Box::new(serde_json::from_value(value)?)),
        });
    }

    let joined = stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(",");
    tracing::trace!(bytes = stdout.len(), "Parsing output as JSON lines");
    Ok(MediaInfoResult::Many(serde_json::from_str(&format!(
        "[{joined}]"
    ))?))
}
