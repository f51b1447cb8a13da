//! Tests for in-memory vector index search ordering and dimension handling.

use std::sync::Arc;

use docqa_rag::document::{Chunk, Document};
use docqa_rag::error::RagError;
use docqa_rag::index::{VectorIndex, cosine_similarity};
use docqa_rag::inmemory::InMemoryVectorIndex;
use docqa_rag::split;
use proptest::prelude::*;

/// Generate a non-zero L2-normalized embedding of the given dimension.
fn arb_normalized_embedding(dim: usize) -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-1.0f32..1.0f32, dim).prop_filter_map("non-zero embedding", |mut v| {
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm < 1e-8 {
            return None;
        }
        for val in &mut v {
            *val /= norm;
        }
        Some(v)
    })
}

fn chunk(id: &str, text: &str) -> Chunk {
    let mut chunks = split(id, text, text.chars().count().max(1), 0).unwrap();
    chunks.remove(0)
}

/// **Search ordering: results are sorted by descending cosine similarity and bounded by k**
mod prop_inmemory_search_ordering {
    use super::*;

    const DIM: usize = 16;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn results_ordered_descending_and_bounded_by_k(
            vectors in proptest::collection::vec(arb_normalized_embedding(DIM), 1..20),
            query in arb_normalized_embedding(DIM),
            k in 1usize..25,
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let count = vectors.len();
            let results = rt.block_on(async {
                let index = InMemoryVectorIndex::new();
                let entries = vectors
                    .iter()
                    .enumerate()
                    .map(|(i, v)| (chunk(&format!("c{i}"), "some chunk text"), v.clone()))
                    .collect();
                index.add(entries).await.unwrap();
                index.search(&query, k).await.unwrap()
            });

            prop_assert_eq!(results.len(), k.min(count));

            for window in results.windows(2) {
                prop_assert!(
                    window[0].score >= window[1].score,
                    "results not in descending order: {} < {}",
                    window[0].score,
                    window[1].score,
                );
            }
        }

        #[test]
        fn cosine_is_symmetric_and_bounded(
            a in arb_normalized_embedding(DIM),
            b in arb_normalized_embedding(DIM),
        ) {
            let ab = cosine_similarity(&a, &b);
            prop_assert!((ab - cosine_similarity(&b, &a)).abs() < 1e-6);
            prop_assert!((-1.0 - 1e-5..=1.0 + 1e-5).contains(&ab));
            prop_assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-5);
        }
    }
}

#[tokio::test]
async fn nearest_vector_wins() {
    let index = InMemoryVectorIndex::new();
    index
        .add(vec![
            (chunk("a", "about pods"), vec![1.0, 0.0, 0.0]),
            (chunk("b", "about nodes"), vec![0.0, 1.0, 0.0]),
        ])
        .await
        .unwrap();

    let results = index.search(&[0.9, 0.1, 0.0], 1).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].chunk.text, "about pods");
    assert!(results[0].score > 0.99);
}

#[tokio::test]
async fn identical_direction_scores_exactly_one() {
    let index = InMemoryVectorIndex::new();
    index
        .add(vec![
            (chunk("a", "about pods"), vec![1.0, 0.0, 0.0]),
            (chunk("b", "about nodes"), vec![0.0, 1.0, 0.0]),
        ])
        .await
        .unwrap();

    let results = index.search(&[1.0, 0.0, 0.0], 1).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].chunk.source_id, "a");
    assert_eq!(results[0].score, 1.0);
}

#[tokio::test]
async fn large_magnitudes_rank_exact_match_first() {
    let index = InMemoryVectorIndex::new();
    index
        .add(vec![
            (chunk("c0", "up"), vec![0.0, 1.0]),
            (chunk("c1", "right"), vec![1e20, 0.0]),
            (chunk("c2", "up again"), vec![0.0, 3.0]),
        ])
        .await
        .unwrap();

    let results = index.search(&[1e20, 0.0], 3).await.unwrap();
    let ids: Vec<_> = results.iter().map(|r| r.chunk.source_id.as_str()).collect();
    assert_eq!(ids, vec!["c1", "c0", "c2"]);
    assert_eq!(results[0].score, 1.0);
    assert!(results.iter().all(|r| r.score.is_finite()));
}

#[tokio::test]
async fn empty_index_search_fails() {
    let index = InMemoryVectorIndex::new();
    let err = index.search(&[1.0, 0.0], 3).await.unwrap_err();
    assert!(matches!(err, RagError::EmptyIndex));
}

#[tokio::test]
async fn zero_k_is_invalid() {
    let index = InMemoryVectorIndex::new();
    index.add(vec![(chunk("a", "x"), vec![1.0, 0.0])]).await.unwrap();
    let err = index.search(&[1.0, 0.0], 0).await.unwrap_err();
    assert!(matches!(err, RagError::InvalidConfiguration(_)));
}

#[tokio::test]
async fn mismatched_add_is_atomic() {
    let index = InMemoryVectorIndex::new();
    index.add(vec![(chunk("a", "first"), vec![1.0, 0.0, 0.0])]).await.unwrap();

    let err = index
        .add(vec![
            (chunk("b", "fits"), vec![0.0, 1.0, 0.0]),
            (chunk("c", "too long"), vec![0.0, 0.0, 1.0, 0.0]),
        ])
        .await
        .unwrap_err();

    assert!(matches!(err, RagError::DimensionMismatch { expected: 3, actual: 4 }));
    assert_eq!(index.len().await, 1);
}

#[tokio::test]
async fn non_finite_add_is_atomic() {
    let index = InMemoryVectorIndex::new();
    index.add(vec![(chunk("a", "first"), vec![1.0, 0.0])]).await.unwrap();

    for bad in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
        let err = index
            .add(vec![(chunk("b", "fits"), vec![0.0, 1.0]), (chunk("c", "broken"), vec![bad, 1.0])])
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::InvalidConfiguration(_)));
    }
    assert_eq!(index.len().await, 1);

    let temp = tempfile::tempdir().unwrap();
    index.persist(temp.path()).await.unwrap();
    let loaded = InMemoryVectorIndex::load(temp.path()).await.unwrap();
    assert_eq!(loaded.len().await, 1);
}

#[tokio::test]
async fn non_finite_query_is_invalid() {
    let index = InMemoryVectorIndex::new();
    index.add(vec![(chunk("a", "x"), vec![1.0, 0.0])]).await.unwrap();
    let err = index.search(&[f32::NAN, 0.0], 1).await.unwrap_err();
    assert!(matches!(err, RagError::InvalidConfiguration(_)));
}

#[tokio::test]
async fn mismatched_first_batch_leaves_index_unset() {
    let index = InMemoryVectorIndex::new();
    let err = index
        .add(vec![(chunk("a", "x"), vec![1.0, 0.0]), (chunk("b", "y"), vec![1.0])])
        .await
        .unwrap_err();
    assert!(matches!(err, RagError::DimensionMismatch { expected: 2, actual: 1 }));
    assert!(index.is_empty().await);
    assert_eq!(index.dimensions().await, None);
}

#[tokio::test]
async fn query_dimension_must_match() {
    let index = InMemoryVectorIndex::new();
    index.add(vec![(chunk("a", "x"), vec![1.0, 0.0, 0.0])]).await.unwrap();
    let err = index.search(&[1.0, 0.0], 1).await.unwrap_err();
    assert!(matches!(err, RagError::DimensionMismatch { expected: 3, actual: 2 }));
}

#[tokio::test]
async fn ties_keep_insertion_order() {
    let index = InMemoryVectorIndex::new();
    index
        .add(vec![
            (chunk("first", "first"), vec![1.0, 0.0]),
            (chunk("other", "other"), vec![0.0, 1.0]),
            (chunk("second", "second"), vec![2.0, 0.0]),
        ])
        .await
        .unwrap();

    let results = index.search(&[1.0, 0.0], 2).await.unwrap();
    let ids: Vec<_> = results.iter().map(|r| r.chunk.source_id.as_str()).collect();
    assert_eq!(ids, vec!["first", "second"]);
}

#[tokio::test]
async fn k_larger_than_index_returns_everything() {
    let index = InMemoryVectorIndex::new();
    index
        .add(vec![(chunk("a", "x"), vec![1.0, 0.0]), (chunk("b", "y"), vec![0.0, 1.0])])
        .await
        .unwrap();
    assert_eq!(index.search(&[1.0, 1.0], 10).await.unwrap().len(), 2);
}

#[tokio::test]
async fn clear_forgets_dimensions() {
    let index = InMemoryVectorIndex::new();
    index.add(vec![(chunk("a", "x"), vec![1.0, 0.0])]).await.unwrap();
    index.clear().await.unwrap();
    assert!(index.is_empty().await);
    index.add(vec![(chunk("b", "y"), vec![1.0, 0.0, 0.0])]).await.unwrap();
    assert_eq!(index.dimensions().await, Some(3));
}

#[tokio::test]
async fn concurrent_searches_share_the_index() {
    let index = Arc::new(InMemoryVectorIndex::new());
    let doc = Document::new("doc", "abcdefghij");
    let entries = split(&doc.id, &doc.text, 2, 0)
        .unwrap()
        .into_iter()
        .enumerate()
        .map(|(i, c)| (c, vec![1.0, i as f32]))
        .collect();
    index.add(entries).await.unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let index = Arc::clone(&index);
            tokio::spawn(async move { index.search(&[1.0, 0.0], 3).await })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap().len(), 3);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn search_during_add_sees_whole_batches() {
    const BATCH: usize = 5;
    let index = Arc::new(InMemoryVectorIndex::new());
    let batch = |round: usize| -> Vec<(Chunk, Vec<f32>)> {
        (0..BATCH)
            .map(|i| (chunk(&format!("r{round}-{i}"), "text"), vec![1.0, i as f32]))
            .collect()
    };
    index.add(batch(0)).await.unwrap();

    let writer = {
        let index = Arc::clone(&index);
        tokio::spawn(async move {
            for round in 1..=20 {
                index.add(batch(round)).await.unwrap();
                tokio::task::yield_now().await;
            }
        })
    };
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let index = Arc::clone(&index);
            tokio::spawn(async move {
                for _ in 0..50 {
                    let seen = index.search(&[1.0, 0.0], usize::MAX).await.unwrap().len();
                    assert_eq!(seen % BATCH, 0, "search saw a partial batch of {seen}");
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();

    writer.await.unwrap();
    for reader in readers {
        reader.await.unwrap();
    }
    assert_eq!(index.len().await, BATCH * 21);
}
