use std::collections::HashSet;
use std::sync::Arc;

use catalog_sync_models::{CatalogEntry, EntryKind};
use tracing::{info, warn};

use crate::provider::{CatalogStore, DeleteOptions, IdLookup, ProviderError};

/// Detects and removes catalog entries that became redundant after a
/// reconciliation pass: two seasons sharing an index number, or a virtual
/// episode duplicating a newly-imported physical one.
///
/// Sweeping is a fixed point: running it on an already-clean tree is a
/// no-op, so it is safe to run after every pass.
pub struct DuplicateSweeper {
    store: Arc<dyn CatalogStore>,
    lookup: Arc<dyn IdLookup>,
}

impl DuplicateSweeper {
    pub fn new(store: Arc<dyn CatalogStore>, lookup: Arc<dyn IdLookup>) -> Self {
        Self { store, lookup }
    }

    /// Remove virtual entries sharing `episode_id` with `keep`. Physical
    /// entries always survive; only virtual duplicates are swept.
    pub fn sweep_episodes(
        &self,
        keep: &CatalogEntry,
        episode_id: &str,
    ) -> Result<usize, ProviderError> {
        let duplicates: Vec<CatalogEntry> = self
            .store
            .episodes_with_episode_tag(episode_id)
            .into_iter()
            .filter(|entry| entry.id != keep.id && entry.is_virtual)
            .collect();

        for duplicate in &duplicates {
            self.store.delete(
                &duplicate.id,
                DeleteOptions {
                    delete_backing_file: false,
                },
            )?;
        }

        if !duplicates.is_empty() {
            info!(
                count = duplicates.len(),
                episode_name = %keep.name,
                episode_id,
                "Removed duplicate episodes"
            );
        }
        Ok(duplicates.len())
    }

    /// Walk every season of `series`, keeping one physical-preferred survivor
    /// per season number and sweeping the rest, then deduplicate the
    /// survivor's episodes.
    pub fn sweep_seasons(
        &self,
        series: &CatalogEntry,
        series_id: &str,
    ) -> Result<(), ProviderError> {
        let mut seasons: Vec<CatalogEntry> = self
            .store
            .children(&series.id)
            .into_iter()
            .filter(|entry| entry.kind == EntryKind::Season)
            .collect();
        // Physical seasons sort first so they win the survivor slot.
        seasons.sort_by_key(|season| season.is_virtual);

        let mut seen = HashSet::new();
        for season in seasons {
            let Some(number) = season.index_number else {
                continue;
            };
            if !seen.insert(number) {
                continue;
            }
            self.sweep_season(&season, series, number, series_id)?;
        }
        Ok(())
    }

    /// Remove the seasons colliding with `keep` on `number`, then sweep
    /// duplicate episodes below the survivor.
    pub fn sweep_season(
        &self,
        keep: &CatalogEntry,
        series: &CatalogEntry,
        number: i32,
        series_id: &str,
    ) -> Result<(), ProviderError> {
        let duplicates: Vec<CatalogEntry> = self
            .store
            .seasons_with_number(&series.presentation_key, number)
            .into_iter()
            .filter(|entry| entry.id != keep.id && entry.is_virtual)
            .collect();

        if !duplicates.is_empty() {
            warn!(
                count = duplicates.len(),
                series_name = %series.name,
                series_id,
                "Removing duplicate seasons"
            );
            for duplicate in &duplicates {
                self.store.delete(
                    &duplicate.id,
                    DeleteOptions {
                        delete_backing_file: false,
                    },
                )?;
            }
        }

        let mut episodes: Vec<CatalogEntry> = self
            .store
            .children(&keep.id)
            .into_iter()
            .filter(|entry| entry.kind == EntryKind::Episode)
            .collect();
        // Physical episodes first, so they are the ones kept.
        episodes.sort_by_key(|episode| episode.is_virtual);

        let mut seen = HashSet::new();
        for episode in episodes {
            let Some(episode_id) = self.lookup.episode_id_for(&episode) else {
                continue;
            };
            // Only visit each index number once.
            if !seen.insert(episode.index_number) {
                continue;
            }
            self.sweep_episodes(&episode, &episode_id)?;
        }
        Ok(())
    }
}
