//! TF-IDF text model over catalog metadata.
//!
//! Fitted once at startup from each item's document text. The fitted rows are
//! L2-normalized, and so is every query projected through [`TfidfVectorizer::transform`],
//! which makes their dot product a cosine similarity.

use crate::sparse::{SparseMatrix, SparseVector};
use crate::{Error, Result};
use ahash::{AHashMap, AHashSet};

/// Unigrams and bigrams.
pub const DEFAULT_NGRAM_RANGE: (usize, usize) = (1, 2);
pub const DEFAULT_MAX_FEATURES: usize = 20_000;

#[derive(Debug, Clone)]
pub struct TfidfVectorizer {
    vocabulary: AHashMap<String, u32>,
    idf: Vec<f32>,
    ngram_range: (usize, usize),
    max_features: Option<usize>,
}

impl TfidfVectorizer {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            vocabulary: AHashMap::new(),
            idf: Vec::new(),
            ngram_range: (1, 1),
            max_features: None,
        }
    }

    #[must_use]
    pub fn with_ngram_range(mut self, min_n: usize, max_n: usize) -> Self {
        let min_n = min_n.max(1);
        self.ngram_range = (min_n, max_n.max(min_n));
        self
    }

    #[must_use]
    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features);
        self
    }

    /// Lowercase, split on anything that is not alphanumeric, drop single characters.
    #[inline]
    pub fn tokenize(text: &str) -> Vec<String> {
        text.to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|s| s.chars().count() > 1)
            .map(str::to_string)
            .collect()
    }

    fn terms(&self, text: &str) -> Vec<String> {
        let tokens = Self::tokenize(text);
        let (min_n, max_n) = self.ngram_range;
        let mut terms = Vec::new();
        for n in min_n..=max_n {
            for window in tokens.windows(n) {
                terms.push(window.join(" "));
            }
        }
        terms
    }

    /// Learn vocabulary and idf weights, then return the document-term matrix.
    pub fn fit_transform<S: AsRef<str>>(&mut self, documents: &[S]) -> Result<SparseMatrix> {
        if documents.is_empty() {
            return Err(Error::InvalidInput(
                "cannot fit a text model on zero documents".to_string(),
            ));
        }

        let doc_terms: Vec<Vec<String>> = documents.iter().map(|d| self.terms(d.as_ref())).collect();

        let mut corpus_freq: AHashMap<&str, usize> = AHashMap::new();
        let mut doc_freq: AHashMap<&str, usize> = AHashMap::new();
        for terms in &doc_terms {
            let mut seen: AHashSet<&str> = AHashSet::new();
            for term in terms {
                *corpus_freq.entry(term.as_str()).or_insert(0) += 1;
                if seen.insert(term.as_str()) {
                    *doc_freq.entry(term.as_str()).or_insert(0) += 1;
                }
            }
        }

        let mut ranked: Vec<(&str, usize)> = corpus_freq.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        if let Some(max) = self.max_features {
            ranked.truncate(max);
        }

        let mut kept: Vec<&str> = ranked.into_iter().map(|(t, _)| t).collect();
        kept.sort_unstable();

        let n_docs = documents.len() as f32;
        self.vocabulary = AHashMap::with_capacity(kept.len());
        self.idf = Vec::with_capacity(kept.len());
        for (i, term) in kept.iter().enumerate() {
            let df = doc_freq.get(term).copied().unwrap_or(0) as f32;
            self.vocabulary.insert((*term).to_string(), i as u32);
            self.idf.push(((1.0 + n_docs) / (1.0 + df)).ln() + 1.0);
        }

        let rows: Vec<SparseVector> = doc_terms.iter().map(|terms| self.weigh(terms)).collect();
        SparseMatrix::from_rows(self.vocabulary.len(), rows)
    }

    /// Project text into the fitted term space. Unknown terms are ignored,
    /// so empty or out-of-vocabulary text gives an empty vector.
    pub fn transform(&self, text: &str) -> SparseVector {
        self.weigh(&self.terms(text))
    }

    fn weigh(&self, terms: &[String]) -> SparseVector {
        let pairs: Vec<(u32, f32)> = terms
            .iter()
            .filter_map(|t| self.vocabulary.get(t.as_str()))
            .map(|&i| (i, self.idf[i as usize]))
            .collect();
        // from_pairs sums duplicates, which turns idf per occurrence into tf * idf
        let mut v = SparseVector::from_pairs(pairs);
        v.l2_normalize();
        v
    }

    #[inline]
    #[must_use]
    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn term_index(&self, term: &str) -> Option<u32> {
        self.vocabulary.get(term).copied()
    }
}

impl Default for TfidfVectorizer {
    fn default() -> Self {
        Self::new()
    }
}

/// A fitted vectorizer together with the matrix it produced.
#[derive(Debug, Clone)]
pub struct TextModel {
    pub vectorizer: TfidfVectorizer,
    pub matrix: SparseMatrix,
}

impl TextModel {
    /// Fit with the catalog defaults (unigrams + bigrams, 20k features).
    pub fn fit<S: AsRef<str>>(documents: &[S]) -> Result<Self> {
        let mut vectorizer = TfidfVectorizer::new()
            .with_ngram_range(DEFAULT_NGRAM_RANGE.0, DEFAULT_NGRAM_RANGE.1)
            .with_max_features(DEFAULT_MAX_FEATURES);
        let matrix = vectorizer.fit_transform(documents)?;
        Ok(Self { vectorizer, matrix })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize() {
        let tokens = TfidfVectorizer::tokenize("Blue T-Shirt, a casual-wear ITEM!");
        assert_eq!(tokens, vec!["blue", "shirt", "casual", "wear", "item"]);
    }

    #[test]
    fn test_fit_bigrams() {
        let mut v = TfidfVectorizer::new().with_ngram_range(1, 2);
        let m = v.fit_transform(&["red dress", "blue dress"]).unwrap();
        assert_eq!(m.rows(), 2);
        assert!(v.term_index("red dress").is_some());
        assert!(v.term_index("dress").is_some());
        assert!(v.term_index("red blue").is_none());
        assert_eq!(v.vocabulary_size(), 5);
    }

    #[test]
    fn test_rarer_terms_weigh_more() {
        let mut v = TfidfVectorizer::new();
        v.fit_transform(&["red dress", "blue dress", "green dress"]).unwrap();
        let q = v.transform("red dress");
        let red = v.term_index("red").unwrap();
        let dress = v.term_index("dress").unwrap();
        let weight = |i: u32| {
            let pos = q.indices().iter().position(|&x| x == i).unwrap();
            q.values()[pos]
        };
        assert!(weight(red) > weight(dress));
    }

    #[test]
    fn test_rows_are_unit_length() {
        let mut v = TfidfVectorizer::new();
        let m = v.fit_transform(&["red dress shoes", "blue jeans"]).unwrap();
        for r in 0..m.rows() {
            let (_, vals) = m.row(r);
            let n: f32 = vals.iter().map(|x| x * x).sum::<f32>().sqrt();
            assert!((n - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_max_features_keeps_most_frequent() {
        let mut v = TfidfVectorizer::new().with_max_features(1);
        v.fit_transform(&["shirt shirt", "shirt jeans"]).unwrap();
        assert_eq!(v.vocabulary_size(), 1);
        assert!(v.term_index("shirt").is_some());
    }

    #[test]
    fn test_empty_and_unknown_queries() {
        let mut v = TfidfVectorizer::new();
        v.fit_transform(&["red dress"]).unwrap();
        assert!(v.transform("").is_empty());
        assert!(v.transform("   ").is_empty());
        assert!(v.transform("tuxedo").is_empty());
    }

    #[test]
    fn test_fit_on_nothing_fails() {
        let mut v = TfidfVectorizer::new();
        let docs: Vec<String> = Vec::new();
        assert!(v.fit_transform(&docs).is_err());
    }

    #[test]
    fn test_text_model_fit() {
        let model = TextModel::fit(&["casual shirt", "formal shoes"]).unwrap();
        assert_eq!(model.matrix.rows(), 2);
        assert!(model.vectorizer.term_index("casual shirt").is_some());
    }
}
