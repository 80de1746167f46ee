use std::sync::Arc;

use catalog_sync_config::{GroupingMode, SyncConfig};
use catalog_sync_models::{
    CatalogEntry, EntryKind, EpisodeInfo, EpisodeKind, GroupInfo, SeriesInfo, SeriesKind,
};
use tracing::{debug, info};

use crate::provider::{CatalogStore, DeleteOptions, IdLookup, OrderingOracle, ProviderError};
use crate::titles::TitleResolver;

/// Builds synthetic season/episode/extra entries from source metadata when no
/// physical file backs them, and attaches/cleans up extras on their owners.
///
/// Every creation is preceded by an existence check against the catalog;
/// losing a race to another pass is a silent no-op.
pub struct VirtualItemFactory {
    store: Arc<dyn CatalogStore>,
    lookup: Arc<dyn IdLookup>,
    ordering: Arc<dyn OrderingOracle>,
    titles: TitleResolver,
    config: SyncConfig,
}

impl VirtualItemFactory {
    pub fn new(
        store: Arc<dyn CatalogStore>,
        lookup: Arc<dyn IdLookup>,
        ordering: Arc<dyn OrderingOracle>,
        config: SyncConfig,
    ) -> Self {
        Self {
            store,
            lookup,
            ordering,
            titles: TitleResolver::new(&config),
            config,
        }
    }

    fn season_exists(&self, series: &CatalogEntry, number: i32) -> bool {
        let existing = self
            .store
            .seasons_with_number(&series.presentation_key, number);
        if !existing.is_empty() {
            debug!(
                season_number = number,
                series_name = %series.name,
                "Season was created by another concurrent pass, skipping"
            );
            return true;
        }
        false
    }

    /// Synthesize a plain numbered season under `series`. Returns `None` when
    /// a physical-or-virtual season with that number already exists.
    pub fn create_virtual_season(
        &self,
        series: &CatalogEntry,
        number: i32,
    ) -> Result<Option<CatalogEntry>, ProviderError> {
        if self.season_exists(series, number) {
            return Ok(None);
        }

        let name = if number == 0 {
            self.config.season_zero_name.clone()
        } else {
            format!("Season {number}")
        };

        let id = self
            .store
            .new_entry_id(&format!("{}:season:{}", series.id, number));
        let mut season = CatalogEntry::new(EntryKind::Season, id);
        season.name = name;
        season.index_number = Some(number);
        season.is_virtual = true;
        season.parent_id = Some(series.id.clone());
        season.presentation_key = series.presentation_key.clone();

        info!(
            season_number = number,
            series_name = %series.name,
            "Adding virtual season"
        );

        self.store.create(season.clone())?;
        Ok(Some(season))
    }

    /// Synthesize a season carrying a source series' metadata, used when a
    /// season number maps onto a whole source series (grouped mode, or the
    /// unmapped season 1). `offset` is the season's position within its own
    /// source series when the number was remapped from a merged source.
    pub fn create_virtual_season_from_series(
        &self,
        series_info: &SeriesInfo,
        offset: i32,
        number: i32,
        series: &CatalogEntry,
    ) -> Result<Option<CatalogEntry>, ProviderError> {
        if self.season_exists(series, number) {
            return Ok(None);
        }

        let (display, alternate) = self.titles.series_titles(series_info);
        let base = display.unwrap_or_else(|| series_info.default_name.clone());
        let name = if offset > 0 {
            format!("{} (Season {})", base, offset + 1)
        } else {
            base
        };

        let id = self
            .store
            .new_entry_id(&format!("{}:season:{}", series.id, number));
        let mut season = CatalogEntry::new(EntryKind::Season, id);
        season.name = name;
        season.original_title = alternate;
        season.overview = Some(self.titles.series_description(series_info));
        season.index_number = Some(number);
        season.is_virtual = true;
        season.parent_id = Some(series.id.clone());
        season.presentation_key = series.presentation_key.clone();
        season.provider_tags.series_id = Some(series_info.id.clone());

        info!(
            season_number = number,
            series_name = %series.name,
            source_series = %series_info.id,
            "Adding virtual season"
        );

        self.store.create(season.clone())?;
        Ok(Some(season))
    }

    /// Synthesize an episode under `season`. No-op when any entry with this
    /// episode's source id already exists in the catalog.
    pub fn create_virtual_episode(
        &self,
        group: Option<&GroupInfo>,
        series_info: &SeriesInfo,
        episode_info: &EpisodeInfo,
        season: &CatalogEntry,
    ) -> Result<(), ProviderError> {
        if !self
            .store
            .episodes_with_episode_tag(&episode_info.id)
            .is_empty()
        {
            debug!(
                episode_id = %episode_info.id,
                series_id = %series_info.id,
                group_id = group.map(|g| g.id.as_str()).unwrap_or("-"),
                "A virtual or physical entry already exists for this episode, skipping"
            );
            return Ok(());
        }

        let movie = series_info.kind == SeriesKind::Movie
            && matches!(episode_info.kind, EpisodeKind::Normal | EpisodeKind::Special);
        let (mut display, mut alternate) = if movie {
            self.titles.movie_titles(series_info, episode_info)
        } else {
            self.titles.episode_titles(series_info, episode_info)
        };

        let episode_number = self.ordering.episode_number(group, series_info, episode_info);
        let season_number = self.ordering.season_number(group, series_info, episode_info);

        if group.is_some()
            && self.config.mark_specials_when_grouped
            && episode_info.kind != EpisodeKind::Normal
        {
            let prefix = classification_prefix(episode_info.kind);
            display = display.map(|title| format!("{prefix}{episode_number} {title}"));
            alternate = alternate.map(|title| format!("{prefix}{episode_number} {title}"));
        }

        let id = self.store.new_entry_id(&format!(
            "{}:{}:episode:{}",
            season.presentation_key, series_info.id, episode_info.id
        ));
        let mut episode = CatalogEntry::new(EntryKind::Episode, id);
        episode.name = display.unwrap_or_default();
        episode.original_title = alternate;
        episode.overview = Some(self.titles.episode_description(episode_info));
        episode.index_number = Some(episode_number);
        episode.is_virtual = true;
        episode.parent_id = Some(season.id.clone());
        episode.presentation_key = season.presentation_key.clone();
        episode.premiere_date = episode_info.air_date;
        episode.community_rating = episode_info.community_rating;

        if group.is_some() && episode_info.kind == EpisodeKind::Special {
            // Place the special in-sequence between the seasons it belongs
            // to, when its anchor predecessor is known.
            let previous_number = series_info
                .special_anchors
                .get(&episode_info.id)
                .and_then(|anchor_id| series_info.episode(anchor_id))
                .map(|anchor| self.ordering.episode_number(group, series_info, anchor));
            let next_number = previous_number
                .filter(|&n| (n as usize) < series_info.episodes.len())
                .map(|n| n + 1);
            episode.parent_index_number = Some(0);
            episode.airs_after_season = Some(season_number);
            episode.airs_before_episode = next_number;
            episode.airs_before_season = Some(season_number + 1);
        } else {
            episode.parent_index_number = Some(season_number);
        }

        episode.provider_tags.episode_id = Some(episode_info.id.clone());
        match self.config.grouping_mode {
            // Anti-merge sentinel: stops the host from merging grouped
            // entries with outside metadata.
            GroupingMode::SourceGroups => {
                episode.provider_tags.cross_id =
                    Some(format!("INVALID-BUT-DO-NOT-TOUCH:{}", episode_info.id));
            }
            GroupingMode::MergeFriendly => {
                if let Some(other_id) = episode_info.other_id {
                    episode.provider_tags.cross_id = Some(other_id.to_string());
                }
            }
            GroupingMode::Default => {}
        }
        if self.config.add_upstream_ids {
            if let Some(upstream_id) = episode_info.upstream_id {
                episode.provider_tags.upstream_id = Some(upstream_id.to_string());
            }
        }

        info!(
            episode_number,
            season_name = %season.name,
            episode_id = %episode_info.id,
            series_id = %series_info.id,
            group_id = group.map(|g| g.id.as_str()).unwrap_or("-"),
            "Adding virtual episode"
        );

        self.store.create(episode)
    }

    /// Attach the source's extras list to `owner`. Entries already present at
    /// the backing path are re-owned and re-tagged; missing ones are created.
    /// The owner's extra-id list is updated exactly once, and only when it
    /// actually changed.
    pub fn attach_extras(
        &self,
        owner: &CatalogEntry,
        series_info: &SeriesInfo,
    ) -> Result<(), ProviderError> {
        if series_info.extras.is_empty() {
            return Ok(());
        }

        let mut new_extra_ids = Vec::new();
        for episode_info in &series_info.extras {
            let Some(path) = self.lookup.path_for_episode_id(&episode_info.id) else {
                continue;
            };
            if let Some(extra_kind) = episode_info.extra_kind {
                if extra_kind.is_theme_media() && !owner.supports_theme_media() {
                    continue;
                }
            }

            if let Some(mut video) = self.store.find_by_path(&path) {
                video.parent_id = None;
                video.owner_id = Some(owner.id.clone());
                video.name = episode_info.default_name.clone();
                video.extra_kind = episode_info.extra_kind;
                video.provider_tags.merge(&tags_for_extra(episode_info, series_info));
                let video_id = video.id.clone();
                self.store.update(video)?;
                if !owner.extra_ids.contains(&video_id) {
                    new_extra_ids.push(video_id);
                }
            } else {
                info!(
                    extra_kind = ?episode_info.extra_kind,
                    video_name = %episode_info.default_name,
                    owner_name = %owner.name,
                    series_id = %series_info.id,
                    "Adding extra to owner"
                );
                let id = self.store.new_entry_id(&format!(
                    "{}:extra:{}",
                    owner.id, episode_info.id
                ));
                let mut video = CatalogEntry::new(EntryKind::Extra, id.clone());
                video.name = episode_info.default_name.clone();
                video.path = Some(path);
                video.extra_kind = episode_info.extra_kind;
                video.owner_id = Some(owner.id.clone());
                video.provider_tags = tags_for_extra(episode_info, series_info);
                self.store.create(video)?;
                new_extra_ids.push(id);
            }
        }

        if !new_extra_ids.is_empty() {
            let mut owner = owner.clone();
            for id in new_extra_ids {
                if !owner.extra_ids.contains(&id) {
                    owner.extra_ids.push(id);
                }
            }
            self.store.update(owner)?;
        }
        Ok(())
    }

    /// Delete every non-virtual owned extra tagged with this series' source
    /// id. Backing files are kept.
    pub fn remove_extras(
        &self,
        owner: &CatalogEntry,
        series_id: &str,
    ) -> Result<(), ProviderError> {
        let extras: Vec<CatalogEntry> = self
            .store
            .extras_with_series_tag(series_id)
            .into_iter()
            .filter(|extra| !extra.is_virtual && extra.owner_id.is_some())
            .collect();

        for extra in &extras {
            self.store.delete(
                &extra.id,
                DeleteOptions {
                    delete_backing_file: false,
                },
            )?;
        }

        if !extras.is_empty() {
            info!(
                count = extras.len(),
                owner_name = %owner.name,
                series_id,
                "Removed extras from owner"
            );
        }
        Ok(())
    }
}

fn tags_for_extra(
    episode_info: &EpisodeInfo,
    series_info: &SeriesInfo,
) -> catalog_sync_models::ProviderTags {
    catalog_sync_models::ProviderTags {
        episode_id: Some(episode_info.id.clone()),
        series_id: Some(series_info.id.clone()),
        ..Default::default()
    }
}

fn classification_prefix(kind: EpisodeKind) -> char {
    match kind {
        EpisodeKind::Special => 'S',
        EpisodeKind::ThemeSong | EpisodeKind::EndingSong | EpisodeKind::OpeningSong => 'C',
        EpisodeKind::Trailer => 'T',
        EpisodeKind::Parody => 'P',
        EpisodeKind::Unknown => 'U',
        EpisodeKind::Normal => 'O',
    }
}
