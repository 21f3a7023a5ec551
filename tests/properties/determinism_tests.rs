use proptest::prelude::*;

use nexus_match::search::{EmbeddingProvider, HashEmbedder, cosine_similarity};

proptest! {
    #[test]
    fn test_hash_embedding_deterministic(text in ".*") {
        let embedder = HashEmbedder::new(64);
        let first = embedder.embed(&text).unwrap();
        let second = embedder.embed(&text).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn test_hash_embedding_length(text in ".*", dim in 1usize..256usize) {
        let embedder = HashEmbedder::new(dim);
        let embedding = embedder.embed(&text).unwrap();
        prop_assert_eq!(embedding.dims(), dim);
    }

    #[test]
    fn test_cosine_bounded_and_symmetric(
        pair in (1usize..32).prop_flat_map(|n| (
            prop::collection::vec(-100.0f32..100.0, n),
            prop::collection::vec(-100.0f32..100.0, n),
        ))
    ) {
        let (a, b) = pair;
        let ab = cosine_similarity(&a, &b).unwrap();
        let ba = cosine_similarity(&b, &a).unwrap();
        prop_assert!((-1.0..=1.0).contains(&ab));
        prop_assert_eq!(ab, ba);
    }

    #[test]
    fn test_cosine_self_similarity(a in prop::collection::vec(0.1f32..100.0, 1..32)) {
        let similarity = cosine_similarity(&a, &a).unwrap();
        prop_assert_eq!(similarity, 1.0);
    }

    #[test]
    fn test_cosine_rejects_length_mismatch(
        a in prop::collection::vec(-1.0f32..1.0, 1..16),
        extra in 1usize..8,
    ) {
        let b = vec![0.5f32; a.len() + extra];
        prop_assert!(cosine_similarity(&a, &b).is_err());
    }
}
