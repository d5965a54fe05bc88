use crate::models::SeriesTarget;
use crate::normalize::normalize;

/// Ordered search titles for one series lookup.
///
/// The first entry is the primary title. Fallbacks follow only for a series
/// that has nothing downloaded and no manual alternate title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitlePlan {
    titles: Vec<String>,
}

impl TitlePlan {
    pub fn build(
        target: &SeriesTarget,
        alternative_title: Option<&str>,
        nothing_downloaded: bool,
    ) -> Self {
        let alternative_title = alternative_title.map(str::trim).filter(|t| !t.is_empty());
        let primary = alternative_title.unwrap_or(&target.title).to_string();
        let mut plan = Self {
            titles: vec![primary.clone()],
        };

        if alternative_title.is_none() && nothing_downloaded {
            if let Some((before, _)) = primary.split_once(':') {
                plan.push(before);
            }
            if let Some(english) = &target.english {
                plan.push(english);
            }
            for synonym in &target.synonyms {
                plan.push(synonym);
            }
        }
        plan
    }

    fn push(&mut self, title: &str) {
        let title = title.trim();
        if title.is_empty() {
            return;
        }
        let key = normalize(title);
        if self.titles.iter().any(|t| normalize(t) == key) {
            return;
        }
        self.titles.push(title.to_string());
    }

    pub fn primary(&self) -> &str {
        &self.titles[0]
    }

    /// Titles to try in order; index 0 is the primary title.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.titles.iter().map(String::as_str).enumerate()
    }

    pub fn len(&self) -> usize {
        self.titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> SeriesTarget {
        SeriesTarget {
            media_id: 1,
            title: "Sousou no Frieren: Season 2".into(),
            english: Some("Frieren: Beyond Journey's End".into()),
            synonyms: vec!["Frieren".into(), "sousou no frieren".into()],
            progress: 0,
            status: None,
            total_episodes: None,
            next_airing_episode: None,
            restricted: false,
            cover_url: None,
        }
    }

    #[test]
    fn test_fallback_order() {
        let plan = TitlePlan::build(&target(), None, true);
        let titles: Vec<_> = plan.iter().map(|(_, t)| t).collect();
        assert_eq!(
            titles,
            vec![
                "Sousou no Frieren: Season 2",
                "Sousou no Frieren",
                "Frieren: Beyond Journey's End",
                "Frieren",
            ]
        );
    }

    #[test]
    fn test_no_fallbacks_once_something_is_downloaded() {
        let plan = TitlePlan::build(&target(), None, false);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.primary(), "Sousou no Frieren: Season 2");
    }

    #[test]
    fn test_alternative_title_wins() {
        let plan = TitlePlan::build(&target(), Some("Frieren S2"), true);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.primary(), "Frieren S2");
    }

    #[test]
    fn test_blank_alternative_title_is_ignored() {
        let plan = TitlePlan::build(&target(), Some("  "), true);
        assert_eq!(plan.primary(), "Sousou no Frieren: Season 2");
        assert!(plan.len() > 1);
    }
}
