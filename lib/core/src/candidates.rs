use crate::tfidf::TextModel;
use crate::Result;

/// Lower bound on the candidate pool handed to the hybrid ranker.
pub const MIN_OVER_FETCH: usize = 200;
/// Candidates fetched per requested result.
pub const OVER_FETCH_FACTOR: usize = 20;

/// Candidate pool size for a request of `top_k` results.
///
/// The visual re-ranking stage needs a pool much wider than the final
/// result, or it collapses onto near-duplicate lexical matches.
#[inline]
#[must_use]
pub fn over_fetch_count(top_k: usize) -> usize {
    MIN_OVER_FETCH.max(top_k.saturating_mul(OVER_FETCH_FACTOR))
}

/// Quiz answers as one query string.
pub fn join_answers<S: AsRef<str>>(answers: &[S]) -> String {
    answers
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Lexical candidate generation against the text matrix.
pub struct TextCandidateGenerator<'a> {
    model: &'a TextModel,
}

impl<'a> TextCandidateGenerator<'a> {
    #[inline]
    pub fn new(model: &'a TextModel) -> Self {
        Self { model }
    }

    /// The `over_fetch` best `(row, text_score)` pairs, highest first.
    ///
    /// Scores are raw dot products with the projected query. Ties, including
    /// the all-zero scores of an empty query, keep ascending row order.
    pub fn candidates(&self, query_text: &str, over_fetch: usize) -> Result<Vec<(usize, f32)>> {
        let query = self.model.vectorizer.transform(query_text);
        let scores = self.model.matrix.dot_vector(&query)?;

        let mut ranked: Vec<(usize, f32)> = scores.into_iter().enumerate().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.truncate(over_fetch);
        Ok(ranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> TextModel {
        TextModel::fit(&[
            "navy blue casual shirt",
            "black formal shoes",
            "red summer dress",
            "blue denim jeans",
            "white sports shoes",
        ])
        .unwrap()
    }

    #[test]
    fn test_over_fetch_policy() {
        assert_eq!(over_fetch_count(1), 200);
        assert_eq!(over_fetch_count(10), 200);
        assert_eq!(over_fetch_count(11), 220);
        assert_eq!(over_fetch_count(50), 1000);
    }

    #[test]
    fn test_join_answers() {
        assert_eq!(join_answers(&["casual", "blue"]), "casual blue");
        assert_eq!(join_answers::<&str>(&[]), "");
    }

    #[test]
    fn test_lexical_ranking() {
        let model = model();
        let gen = TextCandidateGenerator::new(&model);
        let c = gen.candidates("sports shoes", 5).unwrap();
        assert_eq!(c.len(), 5);
        assert_eq!(c[0].0, 4);
        assert_eq!(c[1].0, 1);
        assert!(c.windows(2).all(|w| w[0].1 >= w[1].1));
    }

    #[test]
    fn test_empty_query_keeps_row_order() {
        let model = model();
        let gen = TextCandidateGenerator::new(&model);
        for q in ["", "   "] {
            let c = gen.candidates(q, 3).unwrap();
            assert_eq!(c, vec![(0, 0.0), (1, 0.0), (2, 0.0)]);
        }
    }

    #[test]
    fn test_pool_capped_by_catalog() {
        let model = model();
        let gen = TextCandidateGenerator::new(&model);
        assert_eq!(gen.candidates("blue", 200).unwrap().len(), 5);
        assert!(gen.candidates("blue", 0).unwrap().is_empty());
    }
}
