use std::sync::Arc;

use serde::Serialize;

use super::{
    lattice::{Flags, Lattice},
    model::ProbabilityModel,
};
use crate::Result;

/// Posterior label probabilities of a sequence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marginals {
    labels: Vec<String>,
    /// Log of the total probability of the sequence over all paths.
    pub log_norm: f64,
    /// `[T][L]`, row-major.
    probs: Vec<f64>,
}

impl Marginals {
    /// Number of positions.
    pub fn len(&self) -> usize {
        self.probs.len() / self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probs.is_empty()
    }

    pub fn num_states(&self) -> usize {
        self.labels.len()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    #[inline]
    pub fn get(&self, t: usize, state: usize) -> f64 {
        self.probs[self.labels.len() * t + state]
    }

    /// Posterior of `label` at `t`; `None` for a label the model lacks.
    pub fn probability(&self, t: usize, label: &str) -> Option<f64> {
        let l = self.labels.iter().position(|x| x == label)?;
        Some(self.get(t, l))
    }

    pub fn row(&self, t: usize) -> &[f64] {
        let L = self.labels.len();
        &self.probs[L * t..L * (t + 1)]
    }

    /// Most probable label at `t`, lowest index on ties.
    pub fn argmax(&self, t: usize) -> &str {
        let (_, l) = super::argmax(self.row(t).iter().copied());
        &self.labels[l]
    }
}

/// Sum-product engine over a shared [`ProbabilityModel`].
#[derive(Debug, Clone)]
pub struct ForwardBackwardEngine {
    model: Arc<ProbabilityModel>,
}

impl ForwardBackwardEngine {
    pub fn new(model: Arc<ProbabilityModel>) -> Self {
        Self { model }
    }

    pub fn compute_marginals<S: AsRef<str>>(&self, observations: &[S]) -> Marginals {
        let labels = self.model.labels().to_vec();
        if observations.is_empty() {
            return Marginals { labels, log_norm: 0.0, probs: Vec::new() };
        }
        let mut lattice = Lattice::new(&self.model, Flags::MARGINALS, observations);
        lattice.alpha_score();
        lattice.beta_score();
        lattice.marginals();
        log::trace!("log_norm {} over {} items", lattice.lognorm(), lattice.num_items());
        let (probs, log_norm) = lattice.into_marginals();
        Marginals { labels, log_norm, probs }
    }

    /// Log of the total probability of `observations`; `0.0` when empty.
    pub fn log_likelihood<S: AsRef<str>>(&self, observations: &[S]) -> f64 {
        let mut lattice = Lattice::new(&self.model, Flags::MARGINALS, observations);
        lattice.alpha_score();
        lattice.lognorm()
    }

    /// Log joint probability of `path` and `observations`, the start row
    /// summed over the same way as the forward pass.
    pub fn log_joint<S: AsRef<str>, P: AsRef<str>>(&self, observations: &[S], path: &[P]) -> Result<f64> {
        let labels = self.model.resolve_path(observations.len(), path)?;
        let mut lattice = Lattice::new(&self.model, Flags::empty(), observations);
        Ok(lattice.log_joint(&labels))
    }

    /// Raw alpha table, `[T][L]` row-major.
    pub fn forward<S: AsRef<str>>(&self, observations: &[S]) -> Vec<f64> {
        let mut lattice = Lattice::new(&self.model, Flags::MARGINALS, observations);
        lattice.alpha_score();
        lattice.alpha().to_vec()
    }

    /// Raw beta table, `[T][L]` row-major.
    pub fn backward<S: AsRef<str>>(&self, observations: &[S]) -> Vec<f64> {
        let mut lattice = Lattice::new(&self.model, Flags::MARGINALS, observations);
        lattice.beta_score();
        lattice.beta().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hmm::{logsumexp, model::ModelSpec};

    fn engine() -> ForwardBackwardEngine {
        let spec = ModelSpec::new(["A", "B"], "B")
            .with_fallback(-5.0)
            .transition("B", "A", 0.9f64.ln())
            .transition("B", "B", 0.1f64.ln())
            .transition("A", "A", 0.3f64.ln())
            .transition("A", "B", 0.7f64.ln())
            .emission("x", "A", 0.8f64.ln())
            .emission("x", "B", 0.2f64.ln())
            .emission("y", "A", 0.1f64.ln())
            .emission("y", "B", 0.6f64.ln());
        ForwardBackwardEngine::new(Arc::new(ProbabilityModel::new(spec).unwrap()))
    }

    #[test]
    fn empty_sequence() {
        let m = engine().compute_marginals::<&str>(&[]);
        assert!(m.is_empty());
        assert_eq!(m.len(), 0);
        assert_eq!(m.log_norm, 0.0);
    }

    #[test]
    fn rows_sum_to_one() {
        let m = engine().compute_marginals(&["x", "y", "y", "z", "x"]);
        assert_eq!(m.len(), 5);
        for t in 0..m.len() {
            let sum: f64 = m.row(t).iter().sum();
            assert!((sum - 1.0).abs() < 1e-6, "t={t}: {sum}");
        }
    }

    #[test]
    fn single_item_posterior_is_normalized_joint() {
        let m = engine().compute_marginals(&["x"]);
        // start row: A = -5.0, B = 0.0; only B contributes meaningfully.
        let a = logsumexp(&[-5.0 + 0.3f64.ln(), 0.9f64.ln()]) + 0.8f64.ln();
        let b = logsumexp(&[-5.0 + 0.7f64.ln(), 0.1f64.ln()]) + 0.2f64.ln();
        let expected = a.exp() / (a.exp() + b.exp());
        assert!((m.probability(0, "A").unwrap() - expected).abs() < 1e-9);
        assert!((m.log_norm - logsumexp(&[a, b])).abs() < 1e-12);
        assert_eq!(m.argmax(0), "A");
        assert_eq!(m.probability(0, "C"), None);
    }

    #[test]
    fn forward_total_equals_log_norm() {
        let engine = engine();
        let obs = ["y", "x", "x"];
        let alpha = engine.forward(&obs);
        let m = engine.compute_marginals(&obs);
        assert_eq!(logsumexp(&alpha[4..]), m.log_norm);
        assert_eq!(engine.log_likelihood(&obs), m.log_norm);
        assert_eq!(&engine.backward(&obs)[4..], &[0.0, 0.0]);
    }

    #[test]
    fn no_valid_path_gives_zero_posteriors() {
        let spec = ModelSpec::new(["A", "B"], "A").with_fallback(f64::NEG_INFINITY);
        let engine = ForwardBackwardEngine::new(Arc::new(ProbabilityModel::new(spec).unwrap()));
        let m = engine.compute_marginals(&["x", "y"]);
        assert_eq!(m.log_norm, f64::NEG_INFINITY);
        assert!((0..m.len()).all(|t| m.row(t).iter().all(|&p| p == 0.0)));
    }
}
