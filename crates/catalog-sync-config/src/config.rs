use serde::{Deserialize, Serialize};
use std::path::Path;

/// How source series are mapped onto catalog series.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum GroupingMode {
    /// One source series per catalog series.
    Default,
    /// Merge every series of a source group under one catalog series,
    /// one-or-more seasons per source series.
    SourceGroups,
    /// Keep series one-to-one but align numbering with the external
    /// TV database when an alignment exists.
    MergeFriendly,
}

/// Which group listing the metadata source is asked for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum GroupFilter {
    Default,
    Others,
}

/// Where descriptions are taken from when two providers compete.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DescriptionSource {
    /// Grouping-mode dependent: merge-friendly prefers the other provider,
    /// everything else prefers the primary source.
    Default,
    OnlyPrimary,
    PreferPrimary,
    PreferOther,
    OnlyOther,
}

/// Language selection for constructed titles.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TitleLanguagePolicy {
    /// Let the source decide; no candidate matching.
    Default,
    /// Try the configured display language, fall back to `Default`.
    MetadataPreferred,
    /// Try only the guessed origin language, no fallback.
    Origin,
    /// Never produce a title.
    Ignore,
}

/// Configuration threaded into every reconciliation entry point.
///
/// Passes are deterministic given their inputs; nothing is read from
/// ambient state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_grouping_mode")]
    pub grouping_mode: GroupingMode,

    /// Ask the source for the "others" group listing instead of the default
    /// one (set when the library is filtered by type).
    #[serde(default)]
    pub filter_on_library_types: bool,

    #[serde(default = "default_description_source")]
    pub description_source: DescriptionSource,

    #[serde(default = "default_title_main_policy")]
    pub title_main_policy: TitleLanguagePolicy,

    #[serde(default = "default_title_alternate_policy")]
    pub title_alternate_policy: TitleLanguagePolicy,

    /// Metadata display language for `MetadataPreferred` titles.
    #[serde(default = "default_display_language")]
    pub display_language: String,

    /// Prefix specials and other non-normal episodes with a one-letter
    /// marker when grouped.
    #[serde(default = "default_true")]
    pub mark_specials_when_grouped: bool,

    // Summary sanitizer toggles, each independent.
    #[serde(default = "default_true")]
    pub synopsis_clean_links: bool,
    #[serde(default = "default_true")]
    pub synopsis_clean_misc_lines: bool,
    #[serde(default = "default_true")]
    pub synopsis_remove_summary: bool,
    #[serde(default = "default_true")]
    pub synopsis_clean_multi_empty_lines: bool,

    /// Display name given to the specials season.
    #[serde(default = "default_season_zero_name")]
    pub season_zero_name: String,

    /// Also record the primary source's numeric ids on created entries.
    #[serde(default)]
    pub add_upstream_ids: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            grouping_mode: default_grouping_mode(),
            filter_on_library_types: false,
            description_source: default_description_source(),
            title_main_policy: default_title_main_policy(),
            title_alternate_policy: default_title_alternate_policy(),
            display_language: default_display_language(),
            mark_specials_when_grouped: true,
            synopsis_clean_links: true,
            synopsis_clean_misc_lines: true,
            synopsis_remove_summary: true,
            synopsis_clean_multi_empty_lines: true,
            season_zero_name: default_season_zero_name(),
            add_upstream_ids: false,
        }
    }
}

impl SyncConfig {
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: &Path) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.season_zero_name.trim().is_empty() {
            return Err(anyhow::anyhow!("season_zero_name cannot be empty"));
        }
        let preferred = self.title_main_policy == TitleLanguagePolicy::MetadataPreferred
            || self.title_alternate_policy == TitleLanguagePolicy::MetadataPreferred;
        if preferred && self.display_language.trim().is_empty() {
            return Err(anyhow::anyhow!(
                "display_language is required when a title policy is MetadataPreferred"
            ));
        }
        Ok(())
    }

    /// The group listing matching the library-type filter toggle.
    pub fn group_filter(&self) -> GroupFilter {
        if self.filter_on_library_types {
            GroupFilter::Others
        } else {
            GroupFilter::Default
        }
    }
}

fn default_grouping_mode() -> GroupingMode {
    GroupingMode::Default
}

fn default_description_source() -> DescriptionSource {
    DescriptionSource::Default
}

fn default_title_main_policy() -> TitleLanguagePolicy {
    TitleLanguagePolicy::Default
}

fn default_title_alternate_policy() -> TitleLanguagePolicy {
    TitleLanguagePolicy::Origin
}

pub fn default_display_language() -> String {
    "en".to_string()
}

pub fn default_season_zero_name() -> String {
    "Specials".to_string()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_toml() {
        let config: SyncConfig = toml::from_str("").unwrap();
        assert_eq!(config.grouping_mode, GroupingMode::Default);
        assert_eq!(config.description_source, DescriptionSource::Default);
        assert!(config.mark_specials_when_grouped);
        assert_eq!(config.season_zero_name, "Specials");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_group_filter_follows_library_toggle() {
        let mut config = SyncConfig::default();
        assert_eq!(config.group_filter(), GroupFilter::Default);
        config.filter_on_library_types = true;
        assert_eq!(config.group_filter(), GroupFilter::Others);
    }

    #[test]
    fn test_validate_rejects_empty_season_zero_name() {
        let config = SyncConfig {
            season_zero_name: "  ".to_string(),
            ..SyncConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_requires_display_language_for_preferred() {
        let config = SyncConfig {
            title_main_policy: TitleLanguagePolicy::MetadataPreferred,
            display_language: String::new(),
            ..SyncConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog-sync.toml");

        let config = SyncConfig {
            grouping_mode: GroupingMode::MergeFriendly,
            season_zero_name: "Extras & Specials".to_string(),
            ..SyncConfig::default()
        };
        config.save_to_file(&path).unwrap();

        let loaded = SyncConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.grouping_mode, GroupingMode::MergeFriendly);
        assert_eq!(loaded.season_zero_name, "Extras & Specials");
    }

    #[test]
    fn test_roundtrip() {
        let config = SyncConfig {
            grouping_mode: GroupingMode::SourceGroups,
            filter_on_library_types: true,
            ..SyncConfig::default()
        };
        let serialized = toml::to_string_pretty(&config).unwrap();
        let parsed: SyncConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.grouping_mode, GroupingMode::SourceGroups);
        assert!(parsed.filter_on_library_types);
    }
}
