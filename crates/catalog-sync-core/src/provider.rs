use catalog_sync_config::GroupFilter;
use catalog_sync_models::{CatalogEntry, EpisodeInfo, GroupInfo, SeriesInfo};
use thiserror::Error;

/// Errors surfaced by the out-of-scope collaborators.
///
/// The engine never propagates these to the host: they are caught at the
/// event-handler boundary, logged, and the event is dropped (fail-open;
/// the next full library scan corrects the catalog).
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("metadata source request failed: {0}")]
    Source(String),
    #[error("catalog store rejected the operation: {0}")]
    Store(String),
}

/// Read-only snapshots from the metadata source.
///
/// All reads are synchronous: they complete before any lock-protected
/// section returns. `Ok(None)` signals an unknown id and aborts the pass
/// for that item only.
pub trait MetadataSource: Send + Sync {
    fn series_info(&self, series_id: &str) -> Result<Option<SeriesInfo>, ProviderError>;

    fn group_info_for_series(
        &self,
        series_id: &str,
        filter: GroupFilter,
    ) -> Result<Option<GroupInfo>, ProviderError>;

    fn series_info_for_episode(&self, episode_id: &str)
        -> Result<Option<SeriesInfo>, ProviderError>;
}

/// Resolution between catalog entries and source ids, provided by the
/// external-id shims.
pub trait IdLookup: Send + Sync {
    fn series_id_for(&self, entry: &CatalogEntry) -> Option<String>;
    fn episode_id_for(&self, entry: &CatalogEntry) -> Option<String>;
    fn series_id_from_episode_id(&self, episode_id: &str) -> Option<String>;
    fn path_for_episode_id(&self, episode_id: &str) -> Option<String>;
}

/// Numbering contract the engine consumes. The derivation algorithm is an
/// externally supplied ordering service.
pub trait OrderingOracle: Send + Sync {
    fn episode_number(
        &self,
        group: Option<&GroupInfo>,
        series: &SeriesInfo,
        episode: &EpisodeInfo,
    ) -> i32;

    fn season_number(
        &self,
        group: Option<&GroupInfo>,
        series: &SeriesInfo,
        episode: &EpisodeInfo,
    ) -> i32;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DeleteOptions {
    pub delete_backing_file: bool,
}

/// Query/mutate primitives of the host catalog.
///
/// Mutations from concurrent passes may interleave; the engine's existence
/// checks before every creation are the guard against duplicate creation in
/// the residual race window between check and write.
pub trait CatalogStore: Send + Sync {
    fn entry(&self, id: &str) -> Option<CatalogEntry>;

    fn children(&self, parent_id: &str) -> Vec<CatalogEntry>;

    /// All entries below `id`, any depth.
    fn descendants(&self, id: &str) -> Vec<CatalogEntry>;

    /// Episode entries (physical or virtual) tagged with this episode
    /// source id, catalog-wide.
    fn episodes_with_episode_tag(&self, episode_id: &str) -> Vec<CatalogEntry>;

    /// Extra entries tagged with this series source id.
    fn extras_with_series_tag(&self, series_id: &str) -> Vec<CatalogEntry>;

    /// Season entries with this index number under the series identified by
    /// its presentation key.
    fn seasons_with_number(&self, presentation_key: &str, number: i32) -> Vec<CatalogEntry>;

    fn find_by_path(&self, path: &str) -> Option<CatalogEntry>;

    fn create(&self, entry: CatalogEntry) -> Result<(), ProviderError>;

    fn update(&self, entry: CatalogEntry) -> Result<(), ProviderError>;

    fn delete(&self, id: &str, options: DeleteOptions) -> Result<(), ProviderError>;

    /// Derive a stable local identity from a seed. Deterministic: the same
    /// seed always yields the same id.
    fn new_entry_id(&self, seed: &str) -> String;
}
