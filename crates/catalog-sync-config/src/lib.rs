pub mod config;

pub use config::{
    default_display_language, default_season_zero_name, DescriptionSource, GroupFilter,
    GroupingMode, SyncConfig, TitleLanguagePolicy,
};
