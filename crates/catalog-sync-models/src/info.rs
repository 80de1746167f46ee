use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::title::Title;

/// Typed classification of a source-side episode record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum EpisodeKind {
    Normal,
    Special,
    ThemeSong,
    EndingSong,
    OpeningSong,
    Trailer,
    Parody,
    Unknown,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SeriesKind {
    Show,
    Movie,
    Other,
}

/// How an extra episode is presented when attached to its owner.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ExtraKind {
    Trailer,
    ThemeSong,
    ThemeVideo,
    Clip,
}

impl ExtraKind {
    pub fn is_theme_media(&self) -> bool {
        matches!(self, ExtraKind::ThemeSong | ExtraKind::ThemeVideo)
    }
}

/// Read-only snapshot of one source-side episode.
///
/// Two competing text sources are carried: the primary source's titles and
/// description, and the optional "other" provider's strings. The title
/// resolver picks between them under the configured policies.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EpisodeInfo {
    pub id: String,
    pub kind: EpisodeKind,
    /// Set when the source classifies this entry as a non-episode extra.
    pub extra_kind: Option<ExtraKind>,
    /// Display name the source itself resolved for this episode.
    pub default_name: String,
    pub titles: Vec<Title>,
    pub description: String,
    pub other_title: Option<String>,
    pub other_description: Option<String>,
    /// The other provider's numeric id, when aligned.
    pub other_id: Option<u32>,
    /// The primary source's own numeric id.
    pub upstream_id: Option<u32>,
    pub air_date: Option<NaiveDate>,
    pub community_rating: Option<f32>,
}

impl EpisodeInfo {
    pub fn new(id: impl Into<String>, kind: EpisodeKind, default_name: &str) -> Self {
        Self {
            id: id.into(),
            kind,
            extra_kind: None,
            default_name: default_name.to_string(),
            titles: Vec::new(),
            description: String::new(),
            other_title: None,
            other_description: None,
            other_id: None,
            upstream_id: None,
            air_date: None,
            community_rating: None,
        }
    }
}

/// Read-only snapshot of one source-side series.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeriesInfo {
    pub id: String,
    pub kind: SeriesKind,
    pub default_name: String,
    pub titles: Vec<Title>,
    pub description: String,
    pub other_description: Option<String>,
    /// Whether an alignment with the external TV database exists.
    /// Merge-friendly grouping only remaps seasons when it does.
    pub has_other_alignment: bool,
    /// Ordered main episode list.
    pub episodes: Vec<EpisodeInfo>,
    /// Specials, kept apart from the main list.
    pub specials: Vec<EpisodeInfo>,
    /// Non-episode videos (trailers, theme songs) attached to the series.
    pub extras: Vec<EpisodeInfo>,
    /// Special id -> the normal episode it airs after.
    pub special_anchors: HashMap<String, String>,
}

impl SeriesInfo {
    pub fn new(id: impl Into<String>, kind: SeriesKind, default_name: &str) -> Self {
        Self {
            id: id.into(),
            kind,
            default_name: default_name.to_string(),
            titles: Vec::new(),
            description: String::new(),
            other_description: None,
            has_other_alignment: false,
            episodes: Vec::new(),
            specials: Vec::new(),
            extras: Vec::new(),
            special_anchors: HashMap::new(),
        }
    }

    /// Look up an episode by source id across the main, specials and extras
    /// lists.
    pub fn episode(&self, episode_id: &str) -> Option<&EpisodeInfo> {
        self.episodes
            .iter()
            .chain(self.specials.iter())
            .chain(self.extras.iter())
            .find(|episode| episode.id == episode_id)
    }

    /// The main and specials lists in source order. This is the raw list the
    /// ungrouped reconciliation path walks.
    pub fn raw_episodes(&self) -> impl Iterator<Item = &EpisodeInfo> {
        self.episodes.iter().chain(self.specials.iter())
    }
}

/// Read-only snapshot of a source-side group: several series merged under one
/// catalog series when the grouped mode is configured.
///
/// `season_order` is a `BTreeMap` so walking the seasons of a group is
/// deterministic across reconciliation passes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GroupInfo {
    pub id: String,
    pub name: String,
    pub series: Vec<SeriesInfo>,
    /// Index of the default series within `series`.
    pub default_series: usize,
    /// Season number -> index into `series`.
    pub season_order: BTreeMap<i32, usize>,
    /// Series index -> the first season number assigned to that series.
    pub season_bases: HashMap<usize, i32>,
}

impl GroupInfo {
    pub fn default_series_info(&self) -> Option<&SeriesInfo> {
        self.series.get(self.default_series)
    }

    /// The series a given season number maps to, if any.
    pub fn series_for_season(&self, season_number: i32) -> Option<(usize, &SeriesInfo)> {
        let index = *self.season_order.get(&season_number)?;
        self.series.get(index).map(|info| (index, info))
    }

    /// Season-number offset of `season_number` within its own series.
    /// Zero for a single-season series; N for the (N+1)-th season of a
    /// multi-season source series.
    pub fn season_offset(&self, series_index: usize, season_number: i32) -> i32 {
        season_number - self.season_bases.get(&series_index).copied().unwrap_or(season_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_episode_lookup_covers_all_lists() {
        let mut series = SeriesInfo::new("sr-1", SeriesKind::Show, "Example");
        series.episodes.push(EpisodeInfo::new("ep-1", EpisodeKind::Normal, "One"));
        series.specials.push(EpisodeInfo::new("sp-1", EpisodeKind::Special, "Special"));
        series.extras.push(EpisodeInfo::new("ex-1", EpisodeKind::Trailer, "Trailer"));

        assert!(series.episode("ep-1").is_some());
        assert!(series.episode("sp-1").is_some());
        assert!(series.episode("ex-1").is_some());
        assert!(series.episode("missing").is_none());
    }

    #[test]
    fn test_season_offset() {
        let mut group = GroupInfo {
            id: "g-1".to_string(),
            name: "Group".to_string(),
            series: vec![SeriesInfo::new("sr-1", SeriesKind::Show, "Example")],
            default_series: 0,
            season_order: BTreeMap::new(),
            season_bases: HashMap::new(),
        };
        group.season_order.insert(2, 0);
        group.season_order.insert(3, 0);
        group.season_bases.insert(0, 2);

        assert_eq!(group.season_offset(0, 2), 0);
        assert_eq!(group.season_offset(0, 3), 1);
    }
}
