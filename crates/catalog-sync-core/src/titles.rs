use catalog_sync_config::{DescriptionSource, GroupingMode, SyncConfig, TitleLanguagePolicy};
use catalog_sync_models::{EpisodeInfo, SeriesInfo, Title};
use regex::Regex;

/// A description source with the grouping-dependent `Default` already
/// resolved away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DescriptionStrategy {
    PreferOther,
    PreferPrimary,
    OnlyPrimary,
    OnlyOther,
}

/// Which shape of title is being constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TitleOutput {
    /// Series title only.
    Main,
    /// Episode title only.
    Sub,
    /// Colon-joined series and episode titles (movies).
    Full,
}

/// Pure title/description resolution: candidates plus policy in, one display
/// string out. No state beyond the compiled sanitizer patterns.
pub struct TitleResolver {
    config: SyncConfig,
    link_pattern: Regex,
    misc_line_pattern: Regex,
    trailing_note_pattern: Regex,
    blank_run_pattern: Regex,
}

impl TitleResolver {
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            config: config.clone(),
            link_pattern: Regex::new(r"https?://\w+\.\w+(?:/?\w+)? \[([^\]]+)\]").unwrap(),
            misc_line_pattern: Regex::new(r"(?m)^(\*|--|~) .*$").unwrap(),
            trailing_note_pattern: Regex::new(r"(?s)\s*\b(Source|Note|Summary):.*$").unwrap(),
            blank_run_pattern: Regex::new(r"\n{2,}").unwrap(),
        }
    }

    // ---- Descriptions -----------------------------------------------------

    pub fn series_description(&self, series: &SeriesInfo) -> String {
        self.description(&series.description, series.other_description.as_deref())
    }

    pub fn episode_description(&self, episode: &EpisodeInfo) -> String {
        self.description(&episode.description, episode.other_description.as_deref())
    }

    /// Left-to-right cascade, first non-empty wins.
    fn description(&self, primary: &str, other: Option<&str>) -> String {
        match self.effective_description_source() {
            DescriptionStrategy::PreferOther => {
                let text = other.unwrap_or("").to_string();
                if text.is_empty() {
                    self.sanitize_summary(primary)
                } else {
                    text
                }
            }
            DescriptionStrategy::PreferPrimary => {
                let text = self.sanitize_summary(primary);
                if text.is_empty() {
                    other.unwrap_or("").to_string()
                } else {
                    text
                }
            }
            DescriptionStrategy::OnlyPrimary => self.sanitize_summary(primary),
            DescriptionStrategy::OnlyOther => other.unwrap_or("").to_string(),
        }
    }

    /// `Default` resolves by grouping mode: merge-friendly grouping trusts
    /// the other provider, everything else prefers the primary source.
    fn effective_description_source(&self) -> DescriptionStrategy {
        match self.config.description_source {
            DescriptionSource::Default => match self.config.grouping_mode {
                GroupingMode::MergeFriendly => DescriptionStrategy::PreferOther,
                _ => DescriptionStrategy::PreferPrimary,
            },
            DescriptionSource::PreferOther => DescriptionStrategy::PreferOther,
            DescriptionSource::PreferPrimary => DescriptionStrategy::PreferPrimary,
            DescriptionSource::OnlyPrimary => DescriptionStrategy::OnlyPrimary,
            DescriptionSource::OnlyOther => DescriptionStrategy::OnlyOther,
        }
    }

    /// Scrub a primary-source summary. Each stage toggles independently.
    pub fn sanitize_summary(&self, summary: &str) -> String {
        let mut text = summary.to_string();
        if self.config.synopsis_clean_links {
            text = self.link_pattern.replace_all(&text, "$1").into_owned();
        }
        if self.config.synopsis_clean_misc_lines {
            text = self.misc_line_pattern.replace_all(&text, "").into_owned();
        }
        if self.config.synopsis_remove_summary {
            text = self.trailing_note_pattern.replace(&text, "").into_owned();
        }
        if self.config.synopsis_clean_multi_empty_lines {
            text = self.blank_run_pattern.replace_all(&text, "\n").into_owned();
        }
        text.trim().to_string()
    }

    // ---- Titles -----------------------------------------------------------

    /// (primary, alternate) series titles.
    pub fn series_titles(&self, series: &SeriesInfo) -> (Option<String>, Option<String>) {
        self.titles(
            &series.titles,
            None,
            Some(&series.default_name),
            None,
            TitleOutput::Main,
        )
    }

    /// (primary, alternate) episode titles.
    pub fn episode_titles(
        &self,
        series: &SeriesInfo,
        episode: &EpisodeInfo,
    ) -> (Option<String>, Option<String>) {
        self.titles(
            &series.titles,
            Some(&episode.titles),
            None,
            Some(&episode.default_name),
            TitleOutput::Sub,
        )
    }

    /// (primary, alternate) combined titles for movie-type series, where the
    /// episode title collapses into the series title.
    pub fn movie_titles(
        &self,
        series: &SeriesInfo,
        episode: &EpisodeInfo,
    ) -> (Option<String>, Option<String>) {
        self.titles(
            &series.titles,
            Some(&episode.titles),
            Some(&series.default_name),
            Some(&episode.default_name),
            TitleOutput::Full,
        )
    }

    fn titles(
        &self,
        series_titles: &[Title],
        episode_titles: Option<&[Title]>,
        series_fallback: Option<&str>,
        episode_fallback: Option<&str>,
        output: TitleOutput,
    ) -> (Option<String>, Option<String>) {
        let origin = guess_origin_language(series_titles);
        (
            self.title_with_policy(
                self.config.title_main_policy,
                series_titles,
                episode_titles,
                series_fallback,
                episode_fallback,
                output,
                &origin,
            ),
            self.title_with_policy(
                self.config.title_alternate_policy,
                series_titles,
                episode_titles,
                series_fallback,
                episode_fallback,
                output,
                &origin,
            ),
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn title_with_policy(
        &self,
        policy: TitleLanguagePolicy,
        series_titles: &[Title],
        episode_titles: Option<&[Title]>,
        series_fallback: Option<&str>,
        episode_fallback: Option<&str>,
        output: TitleOutput,
        origin: &[String],
    ) -> Option<String> {
        match policy {
            TitleLanguagePolicy::Ignore => None,
            // No candidate matching; the source-provided strings decide.
            TitleLanguagePolicy::Default => {
                compose(&[], None, series_fallback, episode_fallback, output, &[])
            }
            TitleLanguagePolicy::MetadataPreferred => {
                let display = [self.config.display_language.clone()];
                let title = compose(
                    series_titles,
                    episode_titles,
                    series_fallback,
                    episode_fallback,
                    output,
                    &display,
                );
                match title {
                    Some(title) if !title.is_empty() => Some(title),
                    _ => compose(&[], None, series_fallback, episode_fallback, output, &[]),
                }
            }
            TitleLanguagePolicy::Origin => compose(
                series_titles,
                episode_titles,
                series_fallback,
                episode_fallback,
                output,
                origin,
            ),
        }
    }
}

fn compose(
    series_titles: &[Title],
    episode_titles: Option<&[Title]>,
    series_fallback: Option<&str>,
    episode_fallback: Option<&str>,
    output: TitleOutput,
    languages: &[String],
) -> Option<String> {
    match output {
        TitleOutput::Main | TitleOutput::Full => {
            let main = title_by_kind_and_language(series_titles, "official", languages)
                .or_else(|| series_fallback.map(str::to_string))
                .map(|title| title.trim().to_string());
            if output == TitleOutput::Main {
                return main;
            }
            let sub = sub_title(episode_titles, episode_fallback, languages);
            match (main, sub) {
                // The literal sub-title "Complete Movie" is presentation
                // noise and never joined on.
                (Some(main), Some(sub)) if sub != "Complete Movie" && !sub.is_empty() => {
                    Some(format!("{main}: {sub}"))
                }
                (main, _) => main,
            }
        }
        TitleOutput::Sub => sub_title(episode_titles, episode_fallback, languages),
    }
}

fn sub_title(
    episode_titles: Option<&[Title]>,
    episode_fallback: Option<&str>,
    languages: &[String],
) -> Option<String> {
    episode_titles
        .and_then(|titles| title_by_languages(titles, languages))
        .or_else(|| episode_fallback.map(str::to_string))
        .map(|title| title.trim().to_string())
}

/// First title of the given kind matching the language candidates, in
/// candidate order.
fn title_by_kind_and_language(titles: &[Title], kind: &str, languages: &[String]) -> Option<String> {
    for language in languages {
        if let Some(title) = titles
            .iter()
            .find(|t| t.kind == kind && t.language.eq_ignore_ascii_case(language))
        {
            return Some(title.name.clone());
        }
    }
    None
}

/// First title matching the language candidates, any kind.
fn title_by_languages(titles: &[Title], languages: &[String]) -> Option<String> {
    for language in languages {
        if let Some(title) = titles
            .iter()
            .find(|t| t.language.eq_ignore_ascii_case(language))
        {
            return Some(title.name.clone());
        }
    }
    None
}

/// Guess a series' origin language from its main-typed title.
pub fn guess_origin_language(titles: &[Title]) -> Vec<String> {
    let code = titles
        .iter()
        .find(|t| t.kind == "main")
        .map(|t| t.language.to_lowercase());
    match code.as_deref() {
        // Transliterated or untagged main titles are overwhelmingly Japanese.
        None | Some("x-jat") | Some("x-other") => vec!["ja".to_string()],
        Some("x-zht") => ["zn-hans", "zn-hant", "zn-c-mcm", "zn"]
            .iter()
            .map(|c| c.to_string())
            .collect(),
        Some(code) => vec![code.to_string()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_sync_models::{EpisodeKind, SeriesKind};

    fn create_series(titles: Vec<Title>) -> SeriesInfo {
        let mut series = SeriesInfo::new("sr-1", SeriesKind::Show, "Fallback Name");
        series.titles = titles;
        series
    }

    fn resolver(config: SyncConfig) -> TitleResolver {
        TitleResolver::new(&config)
    }

    #[test]
    fn test_metadata_preferred_picks_display_language() {
        let config = SyncConfig {
            title_main_policy: TitleLanguagePolicy::MetadataPreferred,
            display_language: "en".to_string(),
            ..SyncConfig::default()
        };
        let series = create_series(vec![
            Title::new("Example", "en", "official"),
            Title::new("サンプル", "ja", "main"),
        ]);

        let (main, _) = resolver(config).series_titles(&series);
        assert_eq!(main.as_deref(), Some("Example"));
    }

    #[test]
    fn test_origin_without_match_falls_back_to_source_title() {
        let config = SyncConfig {
            title_main_policy: TitleLanguagePolicy::Origin,
            ..SyncConfig::default()
        };
        // Main title is x-jat, so origin guesses "ja", but there is no
        // official ja title; the source-provided name wins, not empty.
        let series = create_series(vec![
            Title::new("Example", "en", "official"),
            Title::new("Sanpuru", "x-jat", "main"),
        ]);

        let (main, _) = resolver(config).series_titles(&series);
        assert_eq!(main.as_deref(), Some("Fallback Name"));
    }

    #[test]
    fn test_default_policy_uses_source_strings() {
        let config = SyncConfig {
            title_main_policy: TitleLanguagePolicy::Default,
            ..SyncConfig::default()
        };
        let series = create_series(vec![Title::new("Example", "en", "official")]);

        let (main, _) = resolver(config).series_titles(&series);
        assert_eq!(main.as_deref(), Some("Fallback Name"));
    }

    #[test]
    fn test_ignore_policy_produces_nothing() {
        let config = SyncConfig {
            title_main_policy: TitleLanguagePolicy::Ignore,
            ..SyncConfig::default()
        };
        let series = create_series(vec![Title::new("Example", "en", "official")]);

        let (main, _) = resolver(config).series_titles(&series);
        assert!(main.is_none());
    }

    #[test]
    fn test_movie_title_joins_with_colon() {
        let config = SyncConfig {
            title_main_policy: TitleLanguagePolicy::MetadataPreferred,
            display_language: "en".to_string(),
            ..SyncConfig::default()
        };
        let series = create_series(vec![Title::new("Example", "en", "official")]);
        let mut episode = EpisodeInfo::new("ep-1", EpisodeKind::Normal, "Part One");
        episode.titles = vec![Title::new("Part One", "en", "official")];

        let (main, _) = resolver(config).movie_titles(&series, &episode);
        assert_eq!(main.as_deref(), Some("Example: Part One"));
    }

    #[test]
    fn test_complete_movie_sub_title_is_suppressed() {
        let config = SyncConfig {
            title_main_policy: TitleLanguagePolicy::MetadataPreferred,
            display_language: "en".to_string(),
            ..SyncConfig::default()
        };
        let series = create_series(vec![Title::new("Example", "en", "official")]);
        let mut episode = EpisodeInfo::new("ep-1", EpisodeKind::Normal, "Complete Movie");
        episode.titles = vec![Title::new("Complete Movie", "en", "official")];

        let (main, _) = resolver(config).movie_titles(&series, &episode);
        assert_eq!(main.as_deref(), Some("Example"));
    }

    #[test]
    fn test_origin_language_guess() {
        assert_eq!(
            guess_origin_language(&[Title::new("Sanpuru", "x-jat", "main")]),
            vec!["ja".to_string()]
        );
        assert_eq!(
            guess_origin_language(&[Title::new("样本", "x-zht", "main")]),
            vec![
                "zn-hans".to_string(),
                "zn-hant".to_string(),
                "zn-c-mcm".to_string(),
                "zn".to_string()
            ]
        );
        assert_eq!(
            guess_origin_language(&[Title::new("Exemple", "fr", "main")]),
            vec!["fr".to_string()]
        );
        // No main-typed title at all.
        assert_eq!(
            guess_origin_language(&[Title::new("Example", "en", "official")]),
            vec!["ja".to_string()]
        );
    }

    #[test]
    fn test_sanitizer_truncates_at_source_marker() {
        let resolver = resolver(SyncConfig::default());
        let input = "Great show. Source: Wikipedia\n\n\nMore text";
        assert_eq!(resolver.sanitize_summary(input), "Great show.");
    }

    #[test]
    fn test_sanitizer_collapses_links_and_misc_lines() {
        let resolver = resolver(SyncConfig::default());
        let input = "See https://example.org/page [the wiki] for more.\n* staff note\nBody.";
        assert_eq!(
            resolver.sanitize_summary(input),
            "See the wiki for more.\nBody."
        );
    }

    #[test]
    fn test_sanitizer_stages_toggle_independently() {
        let config = SyncConfig {
            synopsis_remove_summary: false,
            synopsis_clean_multi_empty_lines: false,
            ..SyncConfig::default()
        };
        let resolver = resolver(config);
        let input = "Great show. Source: Wikipedia\n\n\nMore text";
        assert_eq!(resolver.sanitize_summary(input), input);
    }

    #[test]
    fn test_description_cascade_prefers_other_when_merge_friendly() {
        let config = SyncConfig {
            grouping_mode: GroupingMode::MergeFriendly,
            ..SyncConfig::default()
        };
        let resolver = resolver(config);
        let mut series = create_series(vec![]);
        series.description = "Primary text".to_string();
        series.other_description = Some("Other text".to_string());
        assert_eq!(resolver.series_description(&series), "Other text");

        // Empty other falls through to the sanitized primary.
        series.other_description = Some(String::new());
        assert_eq!(resolver.series_description(&series), "Primary text");
    }

    #[test]
    fn test_description_cascade_default_prefers_primary() {
        let resolver = resolver(SyncConfig::default());
        let mut episode = EpisodeInfo::new("ep-1", EpisodeKind::Normal, "One");
        episode.description = "Primary text".to_string();
        episode.other_description = Some("Other text".to_string());
        assert_eq!(resolver.episode_description(&episode), "Primary text");

        episode.description = String::new();
        assert_eq!(resolver.episode_description(&episode), "Other text");
    }

    #[test]
    fn test_description_only_variants_never_fall_through() {
        let mut series = create_series(vec![]);
        series.description = "Primary text".to_string();
        series.other_description = None;

        let only_other = resolver(SyncConfig {
            description_source: DescriptionSource::OnlyOther,
            ..SyncConfig::default()
        });
        assert_eq!(only_other.series_description(&series), "");

        series.description = String::new();
        series.other_description = Some("Other text".to_string());
        let only_primary = resolver(SyncConfig {
            description_source: DescriptionSource::OnlyPrimary,
            ..SyncConfig::default()
        });
        assert_eq!(only_primary.series_description(&series), "");
    }
}
