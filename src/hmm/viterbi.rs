use std::sync::Arc;

use serde::Serialize;

use super::{
    lattice::{Flags, Lattice, Trace},
    model::ProbabilityModel,
};
use crate::Result;

/// Best label path for a sequence and its log-score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decoding {
    pub states: Vec<String>,
    pub score: f64,
}

impl Decoding {
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

/// Max-product decoder over a shared [`ProbabilityModel`].
#[derive(Debug, Clone)]
pub struct ViterbiDecoder {
    model: Arc<ProbabilityModel>,
}

impl ViterbiDecoder {
    pub fn new(model: Arc<ProbabilityModel>) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &Arc<ProbabilityModel> {
        &self.model
    }

    pub fn decode<S: AsRef<str>>(&self, observations: &[S]) -> Decoding {
        if observations.is_empty() {
            return Decoding { states: Vec::new(), score: 0.0 };
        }
        let mut lattice = Lattice::new(&self.model, Flags::VITERBI, observations);
        let (labels, score) = lattice.viterbi();
        self.to_decoding(&labels, score)
    }

    /// Same result as [`Self::decode`], plus the filled lattice.
    pub fn decode_with_trace<S: AsRef<str>>(&self, observations: &[S]) -> (Decoding, Trace) {
        let mut lattice = Lattice::new(&self.model, Flags::VITERBI, observations);
        let (labels, score) = lattice.viterbi();
        (self.to_decoding(&labels, score), lattice.trace())
    }

    /// Log-score of `path` for `observations`, summed the way decoding
    /// scores it: best entry from the start row, then transitions and
    /// emissions along the path.
    pub fn path_score<S: AsRef<str>, P: AsRef<str>>(&self, observations: &[S], path: &[P]) -> Result<f64> {
        let labels = self.model.resolve_path(observations.len(), path)?;
        let lattice = Lattice::new(&self.model, Flags::empty(), observations);
        Ok(lattice.score(&labels))
    }

    fn to_decoding(&self, labels: &[usize], score: f64) -> Decoding {
        let states = labels.iter().map(|&l| self.model.label(l).to_string()).collect();
        Decoding { states, score }
    }
}
