// Candidate filters applied before hybrid ranking
use crate::item::{Gender, Item};

pub trait Filter {
    fn matches(&self, item: &Item) -> bool;
}

/// Keeps items whose gender tag or usage label contains the requested
/// audience word by word, case-insensitively. Each requested word must start
/// a label word, so a partial label like "sport" matches "Sports".
///
/// The request is normalized through [`Gender::parse`] first, so "Male"
/// matches items tagged "Men". Matching from word starts keeps "men" from
/// matching "women".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudienceFilter {
    words: Vec<String>,
}

impl AudienceFilter {
    /// `None` for blank input, which means "no filter".
    pub fn new(raw: &str) -> Option<Self> {
        let canonical = Gender::parse(raw)?;
        let words = words(canonical.as_str());
        if words.is_empty() {
            return None;
        }
        Some(Self { words })
    }

    pub fn as_words(&self) -> &[String] {
        &self.words
    }
}

fn words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn contains_words(haystack: &str, needle: &[String]) -> bool {
    let hay = words(haystack);
    hay.windows(needle.len())
        .any(|w| w.iter().zip(needle).all(|(h, n)| h.starts_with(n.as_str())))
}

impl Filter for AudienceFilter {
    fn matches(&self, item: &Item) -> bool {
        item.audience
            .labels()
            .any(|label| contains_words(label, &self.words))
    }
}
