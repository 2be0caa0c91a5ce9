pub mod forward_backward;
pub mod lattice;
pub mod model;
pub mod tagger;
pub mod viterbi;

/// Computes log(sum(exp(x))) in a numerically stable way.
pub fn logsumexp(logs: &[f64]) -> f64 {
    let max = logs.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
    if max == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    let sum = logs.iter().map(|&x| (x - max).exp()).sum::<f64>();
    max + sum.ln()
}

/// Maximum of `scores` and the position of its first occurrence.
///
/// Only a strictly greater score replaces the current best, so ties resolve
/// to the lowest index. An all `-inf` input yields `(-inf, 0)`.
#[inline]
pub(crate) fn argmax<I: IntoIterator<Item = f64>>(scores: I) -> (f64, usize) {
    let mut best = (f64::NEG_INFINITY, 0);
    for (i, score) in scores.into_iter().enumerate() {
        if score > best.0 {
            best = (score, i);
        }
    }
    best
}
