use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::info::ExtraKind;
use crate::provider_tags::ProviderTags;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Collection,
    Series,
    Season,
    Episode,
    Extra,
}

/// A node in the local catalog tree.
///
/// Entries are either physical (backed by an imported file) or virtual
/// placeholders created by the reconciliation engine for metadata the source
/// knows about but the user has not imported yet.
///
/// `presentation_key` is the sort/presentation key of the owning series: a
/// series carries its own key, and its seasons and episodes carry the same
/// key so catalog-wide existence queries can be scoped to one series.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogEntry {
    pub id: String,
    pub kind: EntryKind,
    pub parent_id: Option<String>,
    /// Extras hang off an owner (series or season) instead of a parent.
    pub owner_id: Option<String>,
    pub name: String,
    pub original_title: Option<String>,
    pub overview: Option<String>,
    pub path: Option<String>,
    pub is_virtual: bool,
    pub index_number: Option<i32>,
    /// End of range for merged multi-part entries (one file spanning
    /// several source episodes). Set by the physical import pipeline.
    pub index_number_end: Option<i32>,
    pub parent_index_number: Option<i32>,
    /// In-sequence placement for specials: "airs after season N,
    /// before episode M of season N+1".
    pub airs_after_season: Option<i32>,
    pub airs_before_episode: Option<i32>,
    pub airs_before_season: Option<i32>,
    pub presentation_key: String,
    pub provider_tags: ProviderTags,
    pub extra_kind: Option<ExtraKind>,
    /// Ids of extras owned by this entry (series or season owners only).
    pub extra_ids: Vec<String>,
    pub premiere_date: Option<NaiveDate>,
    pub community_rating: Option<f32>,
    pub date_modified: DateTime<Utc>,
}

impl CatalogEntry {
    pub fn new(kind: EntryKind, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            parent_id: None,
            owner_id: None,
            name: String::new(),
            original_title: None,
            overview: None,
            path: None,
            is_virtual: false,
            index_number: None,
            index_number_end: None,
            parent_index_number: None,
            airs_after_season: None,
            airs_before_episode: None,
            airs_before_season: None,
            presentation_key: String::new(),
            provider_tags: ProviderTags::new(),
            extra_kind: None,
            extra_ids: Vec::new(),
            premiere_date: None,
            community_rating: None,
            date_modified: Utc::now(),
        }
    }

    /// Whether this entry can own theme-media extras.
    pub fn supports_theme_media(&self) -> bool {
        matches!(self.kind, EntryKind::Series | EntryKind::Season)
    }
}
