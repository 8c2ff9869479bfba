//! Relevance cut-off detection for ranked screening scores.
//!
//! Scores are ranked descending and the elbow is the rank furthest from the
//! chord joining the first and last points (the "maximum distance" knee
//! heuristic). Quantile cut scores for the top 10% and top 25% are reported
//! alongside.

use serde::Serialize;
use std::cmp::Ordering;
use thiserror::Error;

pub const DEFAULT_MIN_POINTS: usize = 3;

/// Why no threshold could be computed. Never fatal; callers draw a placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InsufficientData {
    #[error("no scores supplied")]
    Empty,
    #[error("{count} scores supplied, at least {required} are required")]
    BelowMinimum { count: usize, required: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RankedCut {
    /// 1-based rank in the descending sequence.
    pub rank: usize,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdResult {
    /// Descending-sorted copy of the input.
    pub ranked: Vec<f64>,
    /// `None` when every score is equal and the chord has no length.
    pub elbow: Option<RankedCut>,
    pub median: f64,
    pub top_10: RankedCut,
    pub top_25: RankedCut,
}

impl ThresholdResult {
    pub fn len(&self) -> usize {
        self.ranked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }

    /// Score at the elbow, used as the confidence threshold line.
    pub fn confidence_threshold(&self) -> Option<f64> {
        self.elbow.map(|cut| cut.score)
    }
}

#[derive(Debug, Clone)]
pub struct ThresholdDetector {
    pub min_points: usize,
}

impl Default for ThresholdDetector {
    fn default() -> Self {
        Self {
            min_points: DEFAULT_MIN_POINTS,
        }
    }
}

impl ThresholdDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Minimum number of scores before an elbow is attempted. Values below 1
    /// are raised to 1.
    pub fn with_min_points(mut self, min_points: usize) -> Self {
        self.min_points = min_points.max(1);
        self
    }

    pub fn detect(&self, scores: &[f64]) -> Result<ThresholdResult, InsufficientData> {
        let mut ranked: Vec<f64> = scores.iter().copied().filter(|s| s.is_finite()).collect();
        if ranked.is_empty() {
            return Err(InsufficientData::Empty);
        }
        if ranked.len() < self.min_points {
            return Err(InsufficientData::BelowMinimum {
                count: ranked.len(),
                required: self.min_points,
            });
        }
        ranked.sort_by(|a, b| b.partial_cmp(a).unwrap_or(Ordering::Equal));

        let median = median_of_sorted(&ranked);
        let elbow = elbow_rank(&ranked).map(|rank| RankedCut {
            rank,
            score: ranked[rank - 1],
        });
        let top_10 = quantile_cut(&ranked, 0.10);
        let top_25 = quantile_cut(&ranked, 0.25);

        Ok(ThresholdResult {
            ranked,
            elbow,
            median,
            top_10,
            top_25,
        })
    }
}

/// Detect with the default three-point minimum.
pub fn detect(scores: &[f64]) -> Result<ThresholdResult, InsufficientData> {
    ThresholdDetector::default().detect(scores)
}

fn median_of_sorted(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    let mid = n / 2;
    if n % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Rank (1-based) with the largest perpendicular distance to the chord from
/// the first to the last point. Ties keep the lowest rank.
fn elbow_rank(ranked: &[f64]) -> Option<usize> {
    let n = ranked.len();
    let (x1, y1) = (1.0_f64, ranked[0]);
    let (x2, y2) = (n as f64, ranked[n - 1]);
    let a = y1 - y2;
    let b = x2 - x1;
    let c = x1 * y2 - x2 * y1;
    let denominator = (a * a + b * b).sqrt();
    if denominator == 0.0 || a == 0.0 {
        // Flat sequence: every point lies on the chord.
        return None;
    }

    let mut best: Option<(usize, f64)> = None;
    for (idx, score) in ranked.iter().enumerate() {
        let rank = idx + 1;
        let distance = (a * rank as f64 + b * score + c).abs() / denominator;
        match best {
            Some((_, max)) if distance <= max => {}
            _ => best = Some((rank, distance)),
        }
    }
    best.map(|(rank, _)| rank)
}

fn quantile_cut(ranked: &[f64], fraction: f64) -> RankedCut {
    let rank = ((ranked.len() as f64 * fraction).floor() as usize)
        .max(1)
        .min(ranked.len());
    RankedCut {
        rank,
        score: ranked[rank - 1],
    }
}
