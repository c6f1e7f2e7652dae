use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Item metadata as loaded from the catalog: field name to string/number value.
pub type Metadata = Map<String, Value>;

/// Canonical audience tag, resolved once when the catalog is loaded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Men,
    Women,
    Boys,
    Girls,
    Unisex,
    Other(String),
}

impl Gender {
    /// Normalize a free-form label ("Male", "women", " Girls ") to its tag.
    /// Blank input has no tag.
    pub fn parse(raw: &str) -> Option<Self> {
        let value = raw.trim().to_lowercase();
        let gender = match value.as_str() {
            "" => return None,
            "men" | "man" | "male" | "m" => Gender::Men,
            "women" | "woman" | "female" | "f" | "w" => Gender::Women,
            "boys" | "boy" => Gender::Boys,
            "girls" | "girl" => Gender::Girls,
            "unisex" => Gender::Unisex,
            _ => Gender::Other(value),
        };
        Some(gender)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Gender::Men => "men",
            Gender::Women => "women",
            Gender::Boys => "boys",
            Gender::Girls => "girls",
            Gender::Unisex => "unisex",
            Gender::Other(s) => s,
        }
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The gender and usage labels an audience filter is matched against.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudienceTags {
    pub gender: Option<Gender>,
    /// Lowercased usage label ("casual", "sports", ...).
    pub usage: Option<String>,
}

impl AudienceTags {
    pub fn new(gender: Option<&str>, usage: Option<&str>) -> Self {
        let usage = usage
            .map(|u| u.trim().to_lowercase())
            .filter(|u| !u.is_empty());
        Self {
            gender: gender.and_then(Gender::parse),
            usage,
        }
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.gender
            .as_ref()
            .map(Gender::as_str)
            .into_iter()
            .chain(self.usage.as_deref())
    }
}

/// A catalog entry. `row` is its position in the embedding matrix and
/// the text matrix, fixed for the lifetime of the process.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Item {
    pub id: String,
    pub row: usize,
    pub image_path: String,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub audience: AudienceTags,
}

impl Item {
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>, row: usize, image_path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            row,
            image_path: image_path.into(),
            metadata: Metadata::new(),
            audience: AudienceTags::default(),
        }
    }

    #[inline]
    #[must_use]
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_audience(mut self, audience: AudienceTags) -> Self {
        self.audience = audience;
        self
    }
}

/// One ranked result. Produced per request, never stored.
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub item: Arc<Item>,
    pub score: f32,
    /// Full metadata of the item, attached by the quiz ranking path.
    pub metadata: Option<Metadata>,
}

impl ScoredCandidate {
    #[inline]
    #[must_use]
    pub fn new(item: Arc<Item>, score: f32) -> Self {
        Self {
            item,
            score,
            metadata: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_metadata_snapshot(mut self) -> Self {
        self.metadata = Some(self.item.metadata.clone());
        self
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.item.id
    }
}
