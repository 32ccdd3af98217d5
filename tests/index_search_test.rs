mod helpers;

use helpers::{metadata, seed_products, similar_embedding, test_embedding, test_index, DIM};
use shelfsense::embedding::compare_embeddings;
use shelfsense::index::{Metadata, SimilarityIndex};
use shelfsense::Error;

#[test]
fn slots_track_successful_adds() {
    let index = test_index();
    let mut successes = 0usize;
    let mut last: Option<usize> = None;

    for i in 0..20 {
        // every fifth add has the wrong dimension and must not consume a slot
        let embedding = if i % 5 == 4 { vec![1.0; DIM - 1] } else { test_embedding(i) };
        if let Ok(slot) = index.add_product(&format!("p{i}"), &embedding, Metadata::new()) {
            successes += 1;
            assert_eq!(slot, successes - 1);
            if let Some(prev) = last {
                assert!(slot > prev);
            }
            last = Some(slot);
        }
    }
    assert_eq!(index.len(), successes);
}

#[test]
fn three_product_scenario() {
    let index = test_index();
    let p1 = test_embedding(1);
    index.add_product("product-1", &p1, metadata("Cola")).unwrap();
    index.add_product("product-2", &similar_embedding(&p1), metadata("Cola Zero")).unwrap();
    index.add_product("product-3", &test_embedding(40), metadata("Chips")).unwrap();

    let hits = index.search(&p1, 2, Some(0.5)).unwrap();
    assert!(!hits.is_empty() && hits.len() <= 2);
    assert_eq!(hits[0].product_id, "product-1");
    assert!((hits[0].similarity - 1.0).abs() < 1e-5);
    assert_eq!(hits[0].metadata["name"], "Cola");
    assert_eq!(hits[1].product_id, "product-2");
    assert!(hits[1].similarity >= 0.5);
}

#[test]
fn results_sorted_by_similarity_then_slot() {
    let index = test_index();
    let base = test_embedding(3);
    index.add_product("a", &test_embedding(9), Metadata::new()).unwrap();
    index.add_product("b", &base, Metadata::new()).unwrap();
    index.add_product("c", &similar_embedding(&base), Metadata::new()).unwrap();
    index.add_product("d", &base, Metadata::new()).unwrap();

    let hits = index.search(&base, 10, Some(-1.0)).unwrap();
    assert_eq!(hits.len(), 4);
    for pair in hits.windows(2) {
        assert!(
            pair[0].similarity > pair[1].similarity
                || (pair[0].similarity == pair[1].similarity && pair[0].slot < pair[1].slot)
        );
    }
    let order: Vec<&str> = hits.iter().map(|h| h.product_id.as_str()).collect();
    assert_eq!(order, vec!["b", "d", "c", "a"]);
}

#[test]
fn scores_are_remapped_similarities() {
    let index = test_index();
    seed_products(&index, 4);
    for hit in index.search(&test_embedding(2), 4, Some(-1.0)).unwrap() {
        assert!((hit.score - (hit.similarity + 1.0) / 2.0).abs() < 1e-6);
        assert!((0.0..=1.0).contains(&hit.score));
    }
}

#[test]
fn empty_index_and_no_match_look_the_same() {
    let index = SimilarityIndex::new(DIM, 0.9).unwrap();
    assert!(index.search(&test_embedding(0), 3, None).unwrap().is_empty());

    index.add_product("x", &test_embedding(1), Metadata::new()).unwrap();
    assert!(index.search(&test_embedding(0), 3, None).unwrap().is_empty());
}

#[test]
fn text_queries_use_the_same_ranking() {
    let index = test_index();
    seed_products(&index, 5);
    let query = similar_embedding(&test_embedding(2));
    let by_image = index.search(&query, 3, Some(0.1)).unwrap();
    let by_text = index.search_by_text(&query, 3, Some(0.1)).unwrap();
    assert_eq!(by_image, by_text);
    assert_eq!(by_text[0].product_id, "sku-2");
}

#[test]
fn invalid_search_arguments() {
    let index = test_index();
    seed_products(&index, 2);
    assert!(matches!(
        index.search(&test_embedding(0), 0, None),
        Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(
        index.search_by_text(&[1.0; 3], 1, None),
        Err(Error::InvalidArgument(_))
    ));
}

#[test]
fn compare_embeddings_self_similarity() {
    for seed in [0, 7, 63] {
        let e = similar_embedding(&test_embedding(seed));
        let score = compare_embeddings(&e, &e).unwrap();
        assert!((score - 1.0).abs() < 1e-6);
    }
    // unnormalized input is normalized first
    let raw = vec![2.0; DIM];
    assert!((compare_embeddings(&raw, &raw).unwrap() - 1.0).abs() < 1e-6);
}
