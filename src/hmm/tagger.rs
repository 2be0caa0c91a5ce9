use std::sync::Arc;

use super::{
    forward_backward::{ForwardBackwardEngine, Marginals},
    model::ProbabilityModel,
    viterbi::{Decoding, ViterbiDecoder},
};
use crate::Result;

pub trait Tagger {
    fn labels(&self) -> &[String];
    fn tag<S: AsRef<str>>(&self, observations: &[S]) -> Decoding;
    fn marginals<S: AsRef<str>>(&self, observations: &[S]) -> Marginals;
    /// Viterbi-style score of `path`, comparable with [`Decoding::score`].
    fn score<S: AsRef<str>, P: AsRef<str>>(&self, observations: &[S], path: &[P]) -> Result<f64>;
    /// Conditional probability of `path` given `observations`; sums to one
    /// over every path of the same length.
    fn probability<S: AsRef<str>, P: AsRef<str>>(&self, observations: &[S], path: &[P]) -> Result<f64>;
}

/// Viterbi decoder and forward-backward engine over one model snapshot.
#[derive(Debug, Clone)]
pub struct HmmTagger {
    decoder: ViterbiDecoder,
    engine: ForwardBackwardEngine,
}

impl HmmTagger {
    pub fn new(model: Arc<ProbabilityModel>) -> Self {
        Self { decoder: ViterbiDecoder::new(model.clone()), engine: ForwardBackwardEngine::new(model) }
    }

    pub fn model(&self) -> &Arc<ProbabilityModel> {
        self.decoder.model()
    }

    pub fn decoder(&self) -> &ViterbiDecoder {
        &self.decoder
    }

    pub fn engine(&self) -> &ForwardBackwardEngine {
        &self.engine
    }
}

impl From<ProbabilityModel> for HmmTagger {
    fn from(model: ProbabilityModel) -> Self {
        Self::new(Arc::new(model))
    }
}

impl Tagger for HmmTagger {
    fn labels(&self) -> &[String] {
        self.model().labels()
    }

    fn tag<S: AsRef<str>>(&self, observations: &[S]) -> Decoding {
        self.decoder.decode(observations)
    }

    fn marginals<S: AsRef<str>>(&self, observations: &[S]) -> Marginals {
        self.engine.compute_marginals(observations)
    }

    fn score<S: AsRef<str>, P: AsRef<str>>(&self, observations: &[S], path: &[P]) -> Result<f64> {
        self.decoder.path_score(observations, path)
    }

    fn probability<S: AsRef<str>, P: AsRef<str>>(&self, observations: &[S], path: &[P]) -> Result<f64> {
        let log_joint = self.engine.log_joint(observations, path)?;
        let log_norm = self.engine.log_likelihood(observations);
        if log_norm == f64::NEG_INFINITY {
            return Ok(0.0);
        }
        Ok((log_joint - log_norm).exp())
    }
}
