//! Confidence scoring.
//!
//! Blends evidence quantity with per-hit relevance when the latter is
//! available. More corroborating chunks raise confidence; stronger
//! average relevance raises it further; the result is always capped
//! below certainty.

use crate::index::SearchHit;

/// Hard ceiling when relevance scores contribute.
pub const MAX_CONFIDENCE: f64 = 0.95;
/// Ceiling attainable on evidence count alone.
pub const MAX_BASE_CONFIDENCE: f64 = 0.9;

/// Score retrieved evidence into `[0, MAX_CONFIDENCE]`.
///
/// Zero evidence is zero confidence. Otherwise the base is
/// `min(0.9, 0.5 + 0.1 * n)`; if any hits carry a relevance score, the
/// clamped average contributes up to another 0.5, capped at 0.95.
pub fn score(hits: &[SearchHit]) -> f64 {
    if hits.is_empty() {
        return 0.0;
    }

    let base = MAX_BASE_CONFIDENCE.min(0.5 + 0.1 * hits.len() as f64);

    let relevance: Vec<f64> = hits
        .iter()
        .filter_map(|h| h.relevance.map(f64::from))
        .collect();

    if relevance.is_empty() {
        return base;
    }

    let avg = relevance.iter().sum::<f64>() / relevance.len() as f64;
    MAX_CONFIDENCE.min(base + avg.clamp(0.0, 1.0) * 0.5)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::{Chunk, DocMetadata};

    fn hit(relevance: Option<f32>) -> SearchHit {
        SearchHit {
            chunk: Chunk {
                id: "c".to_string(),
                text: "text".to_string(),
                metadata: DocMetadata {
                    id: "1".to_string(),
                    title: "T".to_string(),
                    category: "c".to_string(),
                    source_category: "c".to_string(),
                },
                start_offset: 0,
                chunk_index: 0,
            },
            distance: 0.1,
            relevance,
        }
    }

    fn hits(n: usize, relevance: Option<f32>) -> Vec<SearchHit> {
        (0..n).map(|_| hit(relevance)).collect()
    }

    #[test]
    fn zero_iff_no_evidence() {
        assert_eq!(score(&[]), 0.0);
        assert!(score(&hits(1, None)) > 0.0);
    }

    #[test]
    fn base_grows_with_evidence_count() {
        assert!((score(&hits(1, None)) - 0.6).abs() < 1e-9);
        assert!((score(&hits(2, None)) - 0.7).abs() < 1e-9);
        assert!((score(&hits(3, None)) - 0.8).abs() < 1e-9);
        assert!((score(&hits(7, None)) - 0.9).abs() < 1e-9);
    }

    #[test]
    fn monotonic_in_evidence_count() {
        for relevance in [None, Some(0.4)] {
            let mut prev = 0.0;
            for n in 1..12 {
                let current = score(&hits(n, relevance));
                assert!(current >= prev, "confidence dropped at n={}", n);
                prev = current;
            }
        }
    }

    #[test]
    fn capped_at_point_nine_without_relevance() {
        assert!((score(&hits(50, None)) - MAX_BASE_CONFIDENCE).abs() < 1e-9);
    }

    #[test]
    fn relevance_raises_confidence_up_to_cap() {
        let without = score(&hits(2, None));
        let with = score(&hits(2, Some(0.4)));
        assert!(with > without);
        assert!((with - 0.9).abs() < 1e-6); // 0.7 base + 0.2 relevance

        assert_eq!(score(&hits(7, Some(1.0))), MAX_CONFIDENCE);
    }

    #[test]
    fn out_of_range_relevance_is_clamped() {
        // A denormalized score cannot push past the cap, nor below base.
        assert_eq!(score(&hits(7, Some(5.0))), MAX_CONFIDENCE);
        assert!(score(&hits(2, Some(-3.0))) >= 0.7 - 1e-9);
    }

    #[test]
    fn always_within_bounds() {
        for n in 0..20 {
            for relevance in [None, Some(0.0), Some(0.3), Some(1.0), Some(9.0)] {
                let c = score(&hits(n, relevance));
                assert!((0.0..=MAX_CONFIDENCE).contains(&c));
            }
        }
    }
}
