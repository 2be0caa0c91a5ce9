//! Hidden Markov Model sequence tagging.
//!
//! A [`ProbabilityModel`] holds transition and emission log-probabilities.
//! [`ViterbiDecoder`] finds the best label path for a token sequence and
//! [`ForwardBackwardEngine`] computes per-position posterior label
//! probabilities. Both allocate their tables per call, so one model can be
//! shared by any number of threads behind an `Arc`.
//!
//! ```
//! use std::sync::Arc;
//! use hmmtag::{ModelSpec, ProbabilityModel, ViterbiDecoder};
//!
//! let spec = ModelSpec::new(["A", "B"], "B")
//!     .transition("B", "A", 0.9f64.ln())
//!     .transition("B", "B", 0.1f64.ln())
//!     .emission("x", "A", 0.8f64.ln())
//!     .emission("x", "B", 0.2f64.ln());
//! let model = Arc::new(ProbabilityModel::new(spec).unwrap());
//! let decoding = ViterbiDecoder::new(model).decode(&["x"]);
//! assert_eq!(decoding.states, ["A"]);
//! ```
#![allow(non_snake_case)]

pub mod batch;
pub mod dataset;
mod error;
pub mod evaluation;
pub mod hmm;
pub mod quark;

pub use batch::{BatchTagger, CancellationToken};
pub use dataset::{Dataset, Sentence};
pub use error::{Error, Result};
pub use evaluation::{Estimation, Evaluation};
pub use hmm::{
    forward_backward::{ForwardBackwardEngine, Marginals},
    lattice::Trace,
    model::{ModelSpec, ProbabilityModel},
    tagger::{HmmTagger, Tagger},
    viterbi::{Decoding, ViterbiDecoder},
};
