use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use catalog_sync_config::{GroupingMode, SyncConfig};
use catalog_sync_models::{CatalogEntry, EntryKind, EpisodeInfo, GroupInfo, SeriesInfo};
use tracing::{error, warn};

use crate::factory::VirtualItemFactory;
use crate::lock::LockTable;
use crate::provider::{CatalogStore, IdLookup, MetadataSource, OrderingOracle, ProviderError};
use crate::sweeper::DuplicateSweeper;

const SERIES: &str = "series";
const SEASON: &str = "season";
const EPISODE: &str = "episode";
const UPDATE: &str = "update";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Added,
    Updated,
    Removed,
}

/// A catalog lifecycle notification from the host.
#[derive(Debug, Clone)]
pub struct CatalogEvent {
    pub kind: EventKind,
    pub item: CatalogEntry,
    pub parent: Option<CatalogEntry>,
}

/// The top-level reconciliation state machine.
///
/// Receives catalog lifecycle events, classifies the item, serializes the
/// pass through the lock table, and drives the virtual item factory and the
/// duplicate sweeper. Events may arrive concurrently on the host's own
/// threads; passes for the same lock key never overlap, passes for different
/// keys may interleave freely.
///
/// Failures never reach the host: every pass either completes or is dropped
/// with a log line, leaving the catalog to be corrected by the next full
/// library scan.
pub struct ReconcileEngine {
    store: Arc<dyn CatalogStore>,
    source: Arc<dyn MetadataSource>,
    lookup: Arc<dyn IdLookup>,
    ordering: Arc<dyn OrderingOracle>,
    locks: LockTable,
    factory: VirtualItemFactory,
    sweeper: DuplicateSweeper,
    config: SyncConfig,
}

impl ReconcileEngine {
    pub fn new(
        store: Arc<dyn CatalogStore>,
        source: Arc<dyn MetadataSource>,
        lookup: Arc<dyn IdLookup>,
        ordering: Arc<dyn OrderingOracle>,
        config: SyncConfig,
    ) -> Self {
        let factory = VirtualItemFactory::new(
            Arc::clone(&store),
            Arc::clone(&lookup),
            Arc::clone(&ordering),
            config.clone(),
        );
        let sweeper = DuplicateSweeper::new(Arc::clone(&store), Arc::clone(&lookup));
        Self {
            store,
            source,
            lookup,
            ordering,
            locks: LockTable::new(),
            factory,
            sweeper,
            config,
        }
    }

    /// The engine's lock table, for hosts that coordinate their own passes
    /// with ours.
    pub fn locks(&self) -> &LockTable {
        &self.locks
    }

    /// Entry point for every catalog lifecycle event.
    pub fn handle(&self, event: &CatalogEvent) {
        // Deleting a placeholder never cascades.
        if event.kind == EventKind::Removed && event.item.is_virtual {
            return;
        }

        let result = match (event.item.kind, event.kind) {
            (EntryKind::Series, EventKind::Added) => self.on_series_changed(&event.item, false),
            (EntryKind::Series, EventKind::Updated) => self.on_series_changed(&event.item, true),
            (EntryKind::Series, EventKind::Removed) => self.on_series_removed(&event.item),
            (EntryKind::Season, EventKind::Added) => {
                self.on_season_changed(&event.item, event.parent.as_ref(), false)
            }
            (EntryKind::Season, EventKind::Updated) => {
                self.on_season_changed(&event.item, event.parent.as_ref(), true)
            }
            (EntryKind::Season, EventKind::Removed) => {
                self.on_season_removed(&event.item, event.parent.as_ref())
            }
            (EntryKind::Episode, EventKind::Added | EventKind::Updated) => {
                self.on_episode_changed(&event.item)
            }
            (EntryKind::Episode, EventKind::Removed) => self.on_episode_removed(&event.item),
            // Collections and extras are not reconciled.
            _ => Ok(()),
        };

        if let Err(err) = result {
            error!(
                item_kind = ?event.item.kind,
                event_kind = ?event.kind,
                item_name = %event.item.name,
                error = %err,
                "Reconciliation pass failed, dropping event"
            );
        }
    }

    // ---- Add / update ----------------------------------------------------

    fn on_series_changed(&self, series: &CatalogEntry, sweep: bool) -> Result<(), ProviderError> {
        let Some(series_id) = self.lookup.series_id_for(series) else {
            return Ok(());
        };
        let Some(_guard) = self.locks.guard(SERIES, &series_id, UPDATE) else {
            return Ok(());
        };

        self.sync_series(series, &series_id)?;
        if sweep {
            self.sweeper.sweep_seasons(series, &series_id)?;
        }
        Ok(())
    }

    fn on_season_changed(
        &self,
        season: &CatalogEntry,
        parent: Option<&CatalogEntry>,
        sweep: bool,
    ) -> Result<(), ProviderError> {
        // Display-only season entries lack an index number.
        let Some(number) = season.index_number else {
            return Ok(());
        };
        let Some(series) = self.series_of(season, parent) else {
            return Ok(());
        };
        let Some(series_id) = self.lookup.series_id_for(&series) else {
            return Ok(());
        };
        // An in-flight series pass covers this season.
        if self.locks.is_held(SERIES, &series_id, UPDATE) {
            return Ok(());
        }
        let season_key = format!("{series_id}:{number}");
        let Some(_guard) = self.locks.guard(SEASON, &season_key, UPDATE) else {
            return Ok(());
        };

        self.sync_season(season, &series, &series_id, false)?;
        if sweep {
            self.sweeper.sweep_season(season, &series, number, &series_id)?;
        }
        Ok(())
    }

    fn on_episode_changed(&self, episode: &CatalogEntry) -> Result<(), ProviderError> {
        let Some(episode_id) = self.lookup.episode_id_for(episode) else {
            return Ok(());
        };
        let Some(series_id) = self.lookup.series_id_from_episode_id(&episode_id) else {
            return Ok(());
        };
        if self.locks.is_held(SERIES, &series_id, UPDATE) {
            return Ok(());
        }
        if let Some(number) = episode.parent_index_number {
            if self
                .locks
                .is_held(SEASON, &format!("{series_id}:{number}"), UPDATE)
            {
                return Ok(());
            }
        }
        let Some(_guard) = self.locks.guard(EPISODE, &episode_id, UPDATE) else {
            return Ok(());
        };

        self.sweeper.sweep_episodes(episode, &episode_id)?;
        Ok(())
    }

    // ---- Removal ---------------------------------------------------------

    fn on_series_removed(&self, series: &CatalogEntry) -> Result<(), ProviderError> {
        let Some(series_id) = self.lookup.series_id_for(series) else {
            return Ok(());
        };

        self.factory.remove_extras(series, &series_id)?;

        // In grouped mode every season was fed from its own source series;
        // purge their extras as well.
        if self.config.grouping_mode == GroupingMode::SourceGroups {
            for season in self.store.children(&series.id) {
                if season.kind == EntryKind::Season && !season.is_virtual {
                    self.factory.remove_extras(&season, &series_id)?;
                }
            }
        }
        Ok(())
    }

    fn on_season_removed(
        &self,
        season: &CatalogEntry,
        parent: Option<&CatalogEntry>,
    ) -> Result<(), ProviderError> {
        if season.index_number.is_none() {
            return Ok(());
        }
        let Some(series) = self.series_of(season, parent) else {
            return Ok(());
        };
        let Some(series_id) = self.lookup.series_id_for(&series) else {
            return Ok(());
        };

        if self.store.entry(&series.id).is_some() {
            // The series survived; regenerate a virtual replacement.
            self.sync_season(season, &series, &series_id, true)
        } else {
            self.factory.remove_extras(season, &series_id)
        }
    }

    fn on_episode_removed(&self, episode: &CatalogEntry) -> Result<(), ProviderError> {
        let Some(episode_id) = self.lookup.episode_id_for(episode) else {
            return Ok(());
        };

        self.sweeper.sweep_episodes(episode, &episode_id)?;

        // Regenerate a virtual replacement under the same season.
        let Some(series_info) = self.source.series_info_for_episode(&episode_id)? else {
            warn!(%episode_id, "Unable to find series info for removed episode");
            return Ok(());
        };
        let Some(episode_info) = series_info.episode(&episode_id) else {
            warn!(
                %episode_id,
                series_id = %series_info.id,
                "Removed episode is no longer listed by the source"
            );
            return Ok(());
        };
        let group_info = if self.config.grouping_mode == GroupingMode::SourceGroups {
            self.source
                .group_info_for_series(&series_info.id, self.config.group_filter())?
        } else {
            None
        };
        let Some(season) = episode
            .parent_id
            .as_deref()
            .and_then(|id| self.store.entry(id))
        else {
            warn!(%episode_id, "Removed episode has no surviving season");
            return Ok(());
        };

        self.factory
            .create_virtual_episode(group_info.as_ref(), &series_info, episode_info, &season)
    }

    // ---- Sync passes -----------------------------------------------------

    /// Diff the series' subtree against the source snapshot and create the
    /// missing seasons, episodes and extras.
    fn sync_series(&self, series: &CatalogEntry, series_id: &str) -> Result<(), ProviderError> {
        if self.config.grouping_mode == GroupingMode::SourceGroups {
            let Some(group) = self
                .source
                .group_info_for_series(series_id, self.config.group_filter())?
            else {
                warn!(series_id, "Unable to find group info for series");
                return Ok(());
            };

            let (mut seasons, episode_ids) = self.existing_seasons_and_episode_ids(series);
            for (number, season) in self.missing_group_seasons(&group, series, &seasons)? {
                seasons.entry(number).or_insert(season);
            }

            // Specials of every member series land in season zero.
            if let Some(zero) = seasons.get(&0) {
                for series_info in &group.series {
                    for episode_info in &series_info.specials {
                        if episode_ids.contains(&episode_info.id) {
                            continue;
                        }
                        self.factory
                            .create_virtual_episode(Some(&group), series_info, episode_info, zero)?;
                    }
                }
            }

            for (&number, &index) in &group.season_order {
                let Some(season) = seasons.get(&number) else {
                    continue;
                };
                let Some(series_info) = group.series.get(index) else {
                    warn!(
                        season_number = number,
                        group_id = %group.id,
                        "Group season order points at a missing series entry"
                    );
                    continue;
                };
                for episode_info in &series_info.episodes {
                    if episode_ids.contains(&episode_info.id) {
                        continue;
                    }
                    self.factory
                        .create_virtual_episode(Some(&group), series_info, episode_info, season)?;
                }
            }

            // Extras at season granularity when grouped: the default series'
            // on the series itself, each member's on its own season.
            if let Some(default_info) = group.default_series_info() {
                self.factory.attach_extras(series, default_info)?;
            }
            for (&number, &index) in &group.season_order {
                let (Some(season), Some(series_info)) =
                    (seasons.get(&number), group.series.get(index))
                else {
                    continue;
                };
                self.factory.attach_extras(season, series_info)?;
            }
        } else {
            let Some(series_info) = self.source.series_info(series_id)? else {
                warn!(series_id, "Unable to find series info");
                return Ok(());
            };

            let (mut seasons, episode_ids) = self.existing_seasons_and_episode_ids(series);

            // Season numbers for every raw episode up front; the missing
            // season set derives from them.
            let raw: Vec<&EpisodeInfo> = series_info.raw_episodes().collect();
            let numbers: Vec<i32> = raw
                .iter()
                .map(|&episode| self.ordering.season_number(None, &series_info, episode))
                .collect();
            let mut known: Vec<i32> = numbers.clone();
            known.sort_unstable();
            known.dedup();

            for (number, season) in self.missing_seasons(&series_info, series, &seasons, &known)? {
                seasons.insert(number, season);
            }

            for (&episode_info, &number) in raw.iter().zip(numbers.iter()) {
                if episode_info.extra_kind.is_some() {
                    continue;
                }
                if episode_ids.contains(&episode_info.id) {
                    continue;
                }
                let Some(season) = seasons.get(&number) else {
                    continue;
                };
                self.factory
                    .create_virtual_episode(None, &series_info, episode_info, season)?;
            }

            self.factory.attach_extras(series, &series_info)?;
        }
        Ok(())
    }

    /// Fill one season, optionally recreating the season entry itself first
    /// when the pass was triggered by the removal of a physical season.
    fn sync_season(
        &self,
        season: &CatalogEntry,
        series: &CatalogEntry,
        series_id: &str,
        removed: bool,
    ) -> Result<(), ProviderError> {
        let Some(number) = season.index_number else {
            return Ok(());
        };
        let grouped = self.config.grouping_mode == GroupingMode::SourceGroups;

        let mut group_info: Option<GroupInfo> = None;
        let mut single_info: Option<SeriesInfo> = None;
        let mut group_series_index: Option<usize> = None;

        if grouped {
            let Some(group) = self
                .source
                .group_info_for_series(series_id, self.config.group_filter())?
            else {
                warn!(series_id, "Unable to find group info for series");
                return Ok(());
            };
            if number != 0 {
                let Some((index, _)) = group.series_for_season(number) else {
                    warn!(
                        season_number = number,
                        group_id = %group.id,
                        "No series in the group maps to this season"
                    );
                    return Ok(());
                };
                group_series_index = Some(index);
            }
            group_info = Some(group);
        } else {
            let Some(info) = self.source.series_info(series_id)? else {
                warn!(season_number = number, series_id, "Unable to find series info for season");
                return Ok(());
            };
            single_info = Some(info);
        }

        let season = if removed {
            let recreated = match (&group_info, group_series_index, &single_info) {
                (Some(_), _, _) if number == 0 => self.factory.create_virtual_season(series, 0)?,
                (Some(group), Some(index), _) => {
                    let offset = group.season_offset(index, number);
                    self.factory.create_virtual_season_from_series(
                        &group.series[index],
                        offset,
                        number,
                        series,
                    )?
                }
                (None, _, Some(info)) => {
                    // Note: merge-friendly only skips the season-1 remap when
                    // the other-provider alignment exists; this mirrors the
                    // creation path in `missing_seasons` but stays separate.
                    let merge_friendly = self.config.grouping_mode == GroupingMode::MergeFriendly
                        && info.has_other_alignment;
                    if number == 1 && !merge_friendly {
                        self.factory
                            .create_virtual_season_from_series(info, 0, 1, series)?
                    } else {
                        self.factory.create_virtual_season(series, number)?
                    }
                }
                _ => None,
            };
            match recreated {
                Some(season) => season,
                None => return Ok(()),
            }
        } else {
            season.clone()
        };

        // Existing episodes, physical and virtual, excluded when adding.
        let mut existing = HashSet::new();
        for child in self.store.children(&season.id) {
            if child.kind == EntryKind::Episode {
                if let Some(id) = self.lookup.episode_id_for(&child) {
                    existing.insert(id);
                }
            }
        }

        if number == 0 {
            if let Some(group) = &group_info {
                for series_info in &group.series {
                    for episode_info in &series_info.specials {
                        if existing.contains(&episode_info.id) {
                            continue;
                        }
                        self.factory.create_virtual_episode(
                            Some(group),
                            series_info,
                            episode_info,
                            &season,
                        )?;
                    }
                }
            } else if let Some(series_info) = &single_info {
                for episode_info in &series_info.specials {
                    if existing.contains(&episode_info.id) {
                        continue;
                    }
                    self.factory
                        .create_virtual_episode(None, series_info, episode_info, &season)?;
                }
            }
        } else {
            let series_info = match (&group_info, group_series_index, &single_info) {
                (Some(group), Some(index), _) => &group.series[index],
                (None, _, Some(info)) => info,
                _ => return Ok(()),
            };
            for episode_info in &series_info.episodes {
                let parent = self
                    .ordering
                    .season_number(group_info.as_ref(), series_info, episode_info);
                if parent != number || existing.contains(&episode_info.id) {
                    continue;
                }
                self.factory.create_virtual_episode(
                    group_info.as_ref(),
                    series_info,
                    episode_info,
                    &season,
                )?;
            }
            if group_info.is_some() {
                self.factory.attach_extras(&season, series_info)?;
            }
        }
        Ok(())
    }

    // ---- Helpers ---------------------------------------------------------

    fn series_of(
        &self,
        entry: &CatalogEntry,
        parent: Option<&CatalogEntry>,
    ) -> Option<CatalogEntry> {
        if let Some(parent) = parent {
            if parent.kind == EntryKind::Series {
                return Some(parent.clone());
            }
        }
        entry
            .parent_id
            .as_deref()
            .and_then(|id| self.store.entry(id))
            .filter(|candidate| candidate.kind == EntryKind::Series)
    }

    /// Seasons by number and episode source ids currently reachable from the
    /// series node, physical and virtual alike.
    fn existing_seasons_and_episode_ids(
        &self,
        series: &CatalogEntry,
    ) -> (HashMap<i32, CatalogEntry>, HashSet<String>) {
        let mut seasons = HashMap::new();
        let mut episode_ids = HashSet::new();
        for item in self.store.descendants(&series.id) {
            match item.kind {
                EntryKind::Season => {
                    if let Some(number) = item.index_number {
                        seasons.entry(number).or_insert(item);
                    }
                }
                EntryKind::Episode => {
                    if let Some(id) = self.lookup.episode_id_for(&item) {
                        episode_ids.insert(id);
                    }
                }
                _ => {}
            }
        }
        (seasons, episode_ids)
    }

    fn missing_seasons(
        &self,
        series_info: &SeriesInfo,
        series: &CatalogEntry,
        existing: &HashMap<i32, CatalogEntry>,
        all: &[i32],
    ) -> Result<Vec<(i32, CatalogEntry)>, ProviderError> {
        let merge_friendly = self.config.grouping_mode == GroupingMode::MergeFriendly
            && series_info.has_other_alignment;
        let mut added = Vec::new();
        for &number in all {
            if existing.contains_key(&number) {
                continue;
            }
            // Season 1 carries the series' own metadata unless merge-friendly
            // remapping applies.
            let season = if number == 1 && !merge_friendly {
                self.factory
                    .create_virtual_season_from_series(series_info, 0, 1, series)?
            } else {
                self.factory.create_virtual_season(series, number)?
            };
            if let Some(season) = season {
                added.push((number, season));
            }
        }
        Ok(added)
    }

    fn missing_group_seasons(
        &self,
        group: &GroupInfo,
        series: &CatalogEntry,
        existing: &HashMap<i32, CatalogEntry>,
    ) -> Result<Vec<(i32, CatalogEntry)>, ProviderError> {
        let mut has_specials = false;
        let mut added = Vec::new();
        for (&number, &index) in &group.season_order {
            if existing.contains_key(&number) {
                continue;
            }
            let Some(series_info) = group.series.get(index) else {
                warn!(
                    season_number = number,
                    group_id = %group.id,
                    "Group season order points at a missing series entry"
                );
                continue;
            };
            if !series_info.specials.is_empty() {
                has_specials = true;
            }
            let offset = group.season_offset(index, number);
            if let Some(season) =
                self.factory
                    .create_virtual_season_from_series(series_info, offset, number, series)?
            {
                added.push((number, season));
            }
        }
        if has_specials && !existing.contains_key(&0) {
            if let Some(zero) = self.factory.create_virtual_season(series, 0)? {
                added.push((0, zero));
            }
        }
        Ok(added)
    }
}
