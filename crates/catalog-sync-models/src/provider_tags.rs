use serde::{Deserialize, Serialize};

/// Provider-id annotations attached to a catalog entry.
///
/// These are the join keys between the local catalog tree and the metadata
/// source. An entry may carry zero, one, or several of these: an episode
/// carries `episode_id` and, once a physical file backs it, `file_id`;
/// extras additionally carry `series_id` so owner cleanup can find them.
///
/// `cross_id` is the cross-provider slot. When source grouping is active it
/// holds an anti-merge sentinel (an intentionally invalid value that stops
/// the host from merging grouped entries with outside metadata); in
/// merge-friendly mode it holds the other provider's own episode id.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderTags {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episode_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cross_id: Option<String>,
}

impl ProviderTags {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no tag slot is populated.
    pub fn is_empty(&self) -> bool {
        self.episode_id.is_none()
            && self.series_id.is_none()
            && self.file_id.is_none()
            && self.upstream_id.is_none()
            && self.cross_id.is_none()
    }

    /// Merge tags from `other` into `self`, only filling in `None` slots.
    /// Existing values are not overwritten.
    pub fn merge(&mut self, other: &ProviderTags) {
        if self.episode_id.is_none() {
            self.episode_id = other.episode_id.clone();
        }
        if self.series_id.is_none() {
            self.series_id = other.series_id.clone();
        }
        if self.file_id.is_none() {
            self.file_id = other.file_id.clone();
        }
        if self.upstream_id.is_none() {
            self.upstream_id = other.upstream_id.clone();
        }
        if self.cross_id.is_none() {
            self.cross_id = other.cross_id.clone();
        }
    }
}
