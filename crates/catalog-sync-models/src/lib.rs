pub mod entry;
pub mod info;
pub mod provider_tags;
pub mod title;

pub use entry::{CatalogEntry, EntryKind};
pub use info::{EpisodeInfo, EpisodeKind, ExtraKind, GroupInfo, SeriesInfo, SeriesKind};
pub use provider_tags::ProviderTags;
pub use title::Title;
