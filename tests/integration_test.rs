// Integration tests for Lookalike
use lookalike_core::{
    min_max_normalize, AudienceTags, EmbeddingMatrix, Gender, HnswParams, IndexKind, Item, Metadata, NeighborIndex,
    RecommendMode, RecommendationEngine, Resources, TextCandidateGenerator, TextModel,
};
use lookalike_storage::{ArtifactStore, LoadOptions};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;
use tempfile::TempDir;

fn five_items() -> Resources {
    let embeddings = EmbeddingMatrix::from_rows(vec![
        vec![1.0, 0.0],
        vec![0.9, 0.1],
        vec![0.0, 1.0],
        vec![0.1, 0.9],
        vec![0.5, 0.5],
    ])
    .unwrap();
    let items = (0..5).map(|i| Item::new(i.to_string(), i, format!("{}.jpg", i))).collect();
    Resources::new(embeddings, items)
}

fn random_catalog(rows: usize, dim: usize, seed: u64) -> Resources {
    let mut rng = StdRng::seed_from_u64(seed);
    let data: Vec<Vec<f32>> = (0..rows)
        .map(|_| (0..dim).map(|_| rng.random_range(-1.0f32..1.0)).collect())
        .collect();
    let embeddings = EmbeddingMatrix::from_rows(data).unwrap();
    let genders = ["Men", "Women", "Unisex"];
    let items = (0..rows)
        .map(|i| {
            Item::new(format!("sku-{}", i), i, format!("images/{}.jpg", i))
                .with_audience(AudienceTags::new(Some(genders[i % 3]), Some("Casual")))
        })
        .collect();
    Resources::new(embeddings, items)
}

fn catalog_docs(rows: usize) -> Vec<String> {
    let colors = ["navy", "black", "white", "red", "olive"];
    let kinds = ["shirt", "dress", "jeans", "jacket", "sneakers", "scarf", "hoodie"];
    (0..rows)
        .map(|i| format!("{} {} casual", colors[i % colors.len()], kinds[i % kinds.len()]))
        .collect()
}

#[test]
fn test_similar_to_item_end_to_end() {
    let engine = RecommendationEngine::new(five_items()).unwrap();
    let results = engine.recommend_similar_to_item("0", 2).unwrap();
    let ids: Vec<&str> = results.iter().map(|c| c.id()).collect();
    assert_eq!(ids, vec!["1", "4"]);
    assert!(results[0].score > results[1].score);
}

#[test]
fn test_similar_never_returns_query() {
    let engine = RecommendationEngine::new(random_catalog(60, 8, 7)).unwrap();
    for row in [0usize, 17, 59] {
        let id = format!("sku-{}", row);
        let results = engine.recommend_similar_to_item(&id, 10).unwrap();
        assert_eq!(results.len(), 10);
        assert!(results.iter().all(|c| c.id() != id));
    }
}

#[test]
fn test_similar_at_most_k() {
    let engine = RecommendationEngine::new(five_items()).unwrap();
    assert_eq!(engine.recommend_similar_to_item("2", 3).unwrap().len(), 3);
    // Only four other items exist
    assert_eq!(engine.recommend_similar_to_item("2", 50).unwrap().len(), 4);
    assert!(engine.recommend_similar_to_item("2", 0).unwrap().is_empty());
}

#[test]
fn test_brute_force_matches_exact_index() {
    let brute = RecommendationEngine::new(random_catalog(200, 16, 11)).unwrap();

    let resources = random_catalog(200, 16, 11);
    let index = NeighborIndex::build(IndexKind::Flat, &resources.embeddings, HnswParams::default());
    let indexed = RecommendationEngine::new(resources.with_neighbor_index(index)).unwrap();
    assert!(indexed.snapshot().has_neighbor_index());
    assert!(!brute.snapshot().has_neighbor_index());

    for row in [0usize, 42, 123, 199] {
        let id = format!("sku-{}", row);
        let a = brute.recommend_similar_to_item(&id, 10).unwrap();
        let b = indexed.recommend_similar_to_item(&id, 10).unwrap();
        let ids_a: Vec<&str> = a.iter().map(|c| c.id()).collect();
        let ids_b: Vec<&str> = b.iter().map(|c| c.id()).collect();
        assert_eq!(ids_a, ids_b);
        for (x, y) in a.iter().zip(&b) {
            assert!((x.score - y.score).abs() < 1e-5);
        }
    }
}

#[test]
fn test_hnsw_recall_on_random_catalog() {
    let resources = random_catalog(300, 16, 3);
    let brute = RecommendationEngine::new(resources.clone()).unwrap();
    let index = NeighborIndex::build(IndexKind::Hnsw, &resources.embeddings, HnswParams::default());
    let hnsw = RecommendationEngine::new(resources.with_neighbor_index(index)).unwrap();

    let mut hits = 0;
    let mut total = 0;
    for row in (0..300).step_by(25) {
        let id = format!("sku-{}", row);
        let exact: Vec<String> = brute
            .recommend_similar_to_item(&id, 10)
            .unwrap()
            .iter()
            .map(|c| c.id().to_string())
            .collect();
        let approx = hnsw.recommend_similar_to_item(&id, 10).unwrap();
        assert!(approx.iter().all(|c| c.id() != id));
        hits += approx.iter().filter(|c| exact.iter().any(|e| e == c.id())).count();
        total += exact.len();
    }
    assert!(hits as f32 / total as f32 >= 0.8, "recall {}/{}", hits, total);
}

#[test]
fn test_min_max_bounds() {
    let scores = [0.12, -0.4, 0.9, 0.33];
    let normalized = min_max_normalize(&scores);
    assert!(normalized.iter().all(|s| (0.0..=1.0).contains(s)));
    assert_eq!(normalized[2], 1.0);
    assert_eq!(normalized[1], 0.0);
}

#[test]
fn test_quiz_filter_fallback_keeps_count() {
    let model = TextModel::fit(&catalog_docs(90)).unwrap();
    let engine = RecommendationEngine::new(random_catalog(90, 8, 5).with_text_model(model)).unwrap();

    let unfiltered = engine.recommend_by_query(&["navy", "shirt"], None, 12).unwrap();
    // No girls' items in the catalog
    let fallback = engine.recommend_by_query(&["navy", "shirt"], Some("Girls"), 12).unwrap();
    assert_eq!(fallback.results.len(), unfiltered.results.len());
    assert_eq!(fallback.stats, unfiltered.stats);

    let women = engine.recommend_by_query(&["navy", "shirt"], Some("female"), 12).unwrap();
    assert_eq!(women.mode, RecommendMode::Hybrid);
    assert!(women.stats.text_candidates < unfiltered.stats.text_candidates);
    assert!(women
        .results
        .iter()
        .all(|c| c.item.audience.gender == Some(Gender::Women)));
}

#[test]
fn test_quiz_results_sorted_and_bounded() {
    let model = TextModel::fit(&catalog_docs(50)).unwrap();
    let engine = RecommendationEngine::new(random_catalog(50, 8, 9).with_text_model(model)).unwrap();
    let recs = engine.recommend_by_query(&["black dress"], None, 7).unwrap();
    assert_eq!(recs.results.len(), 7);
    assert!(recs.results.windows(2).all(|w| w[0].score >= w[1].score));
    assert!(recs.results.iter().all(|c| (0.0..=1.0).contains(&c.score)));
    assert!(recs.results.iter().all(|c| c.metadata.is_some()));
}

#[test]
fn test_empty_query_keeps_catalog_order() {
    let model = TextModel::fit(&catalog_docs(5)).unwrap();
    let candidates = TextCandidateGenerator::new(&model).candidates("", 5).unwrap();
    let rows: Vec<usize> = candidates.iter().map(|(row, _)| *row).collect();
    assert_eq!(rows, vec![0, 1, 2, 3, 4]);
    assert!(candidates.iter().all(|(_, score)| *score == 0.0));
}

#[test]
fn test_quiz_without_text_model_falls_back() {
    let engine = RecommendationEngine::new(five_items()).unwrap();
    let recs = engine.recommend_by_query(&["red"], Some("Men"), 3).unwrap();
    assert_eq!(recs.mode, RecommendMode::IndexOrderFallback);
    let ids: Vec<&str> = recs.results.iter().map(|c| c.id()).collect();
    assert_eq!(ids, vec!["0", "1", "2"]);
}

#[test]
fn test_artifact_round_trip() {
    let dir = TempDir::new().unwrap();
    let store = ArtifactStore::open(dir.path()).unwrap();

    let records: Vec<Metadata> = (0..5)
        .map(|i| {
            json!({
                "id": i,
                "image_path": format!("data/processed/images/{}.jpg", i),
                "gender": if i % 2 == 0 { "Men" } else { "Women" },
                "usage": "Casual",
                "productDisplayName": format!("item number {}", i),
            })
            .as_object()
            .cloned()
            .unwrap()
        })
        .collect();
    store.save_catalog(&records).unwrap();
    store.save_embeddings(&five_items().embeddings).unwrap();
    store.build_neighbor_index(IndexKind::Flat, HnswParams::default()).unwrap();

    let resources = store.load_resources(LoadOptions::default()).unwrap();
    let engine = RecommendationEngine::new(resources).unwrap();
    let snapshot = engine.snapshot();
    assert!(snapshot.has_neighbor_index());
    assert!(snapshot.has_text_model());

    let ids: Vec<String> = engine
        .recommend_similar_to_item("0", 2)
        .unwrap()
        .iter()
        .map(|c| c.id().to_string())
        .collect();
    assert_eq!(ids, vec!["1", "4"]);
}

#[test]
fn test_hot_reload_swaps_snapshot() {
    let engine = RecommendationEngine::new(five_items()).unwrap();
    let before = engine.snapshot();

    engine.store().replace(random_catalog(20, 4, 1)).unwrap();
    assert_eq!(engine.snapshot().len(), 20);
    // Readers holding the old snapshot are unaffected
    assert_eq!(before.len(), 5);

    // A broken reload keeps the current snapshot
    let mut broken = random_catalog(3, 4, 2);
    broken.items.pop();
    assert!(engine.store().replace(broken).is_err());
    assert_eq!(engine.snapshot().len(), 20);
}
