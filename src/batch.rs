use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use rayon::prelude::*;

use crate::hmm::{
    forward_backward::Marginals,
    lattice::Trace,
    tagger::{HmmTagger, Tagger},
    viterbi::Decoding,
};

/// Cooperative stop signal shared between a batch and its caller.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Decodes independent sequences in parallel.
///
/// Cancellation is checked before each sequence starts; a sequence already
/// in progress always finishes. Skipped sequences come back as `None`, and
/// results keep the input order.
#[derive(Debug, Clone)]
pub struct BatchTagger {
    tagger: HmmTagger,
    token: CancellationToken,
}

impl BatchTagger {
    pub fn new(tagger: HmmTagger) -> Self {
        Self { tagger, token: CancellationToken::new() }
    }

    pub fn with_token(tagger: HmmTagger, token: CancellationToken) -> Self {
        Self { tagger, token }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn tagger(&self) -> &HmmTagger {
        &self.tagger
    }

    pub fn tag_all<S: AsRef<str> + Sync>(&self, sequences: &[Vec<S>]) -> Vec<Option<Decoding>> {
        self.run(sequences, |seq| self.tagger.tag(seq))
    }

    pub fn marginals_all<S: AsRef<str> + Sync>(&self, sequences: &[Vec<S>]) -> Vec<Option<Marginals>> {
        self.run(sequences, |seq| self.tagger.marginals(seq))
    }

    /// Decodings along with their filled lattices.
    pub fn trace_all<S: AsRef<str> + Sync>(&self, sequences: &[Vec<S>]) -> Vec<Option<(Decoding, Trace)>> {
        self.run(sequences, |seq| self.tagger.decoder().decode_with_trace(seq))
    }

    fn run<S, R, F>(&self, sequences: &[Vec<S>], f: F) -> Vec<Option<R>>
    where
        S: AsRef<str> + Sync,
        R: Send,
        F: Fn(&[S]) -> R + Sync,
    {
        let results: Vec<Option<R>> = sequences
            .par_iter()
            .map(|seq| if self.token.is_cancelled() { None } else { Some(f(seq.as_slice())) })
            .collect();
        let skipped = results.iter().filter(|r| r.is_none()).count();
        if skipped > 0 {
            log::info!("batch cancelled: {skipped} of {} sequences skipped", sequences.len());
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hmm::model::{ModelSpec, ProbabilityModel};

    fn tagger() -> HmmTagger {
        let spec = ModelSpec::new(["A", "B"], "B")
            .with_fallback(-8.0)
            .transition("B", "A", 0.9f64.ln())
            .transition("A", "B", 0.6f64.ln())
            .emission("x", "A", 0.8f64.ln())
            .emission("y", "B", 0.7f64.ln());
        ProbabilityModel::new(spec).unwrap().into()
    }

    #[test]
    fn batch_matches_sequential() {
        let tagger = tagger();
        let sequences: Vec<Vec<&str>> = (0..64)
            .map(|i| (0..(i % 7)).map(|j| if (i + j) % 3 == 0 { "y" } else { "x" }).collect())
            .collect();
        let batch = BatchTagger::new(tagger.clone());
        let results = batch.tag_all(&sequences);
        assert_eq!(results.len(), sequences.len());
        for (seq, res) in sequences.iter().zip(results) {
            assert_eq!(res, Some(tagger.tag(seq)));
        }
        for (seq, res) in sequences.iter().zip(batch.trace_all(&sequences)) {
            let (decoding, trace) = res.unwrap();
            assert_eq!(decoding, tagger.tag(seq));
            assert_eq!(trace.scores.len(), seq.len());
        }
    }

    #[test]
    fn cancelled_batch_skips_everything() {
        let token = CancellationToken::new();
        let batch = BatchTagger::with_token(tagger(), token.clone());
        token.cancel();
        let results = batch.marginals_all(&[vec!["x"], vec!["y", "x"]]);
        assert!(results.iter().all(Option::is_none));
        assert!(batch.token().is_cancelled());
    }

    #[test]
    fn cancel_between_sequences() {
        let pool = rayon::ThreadPoolBuilder::new().num_threads(1).build().unwrap();
        let batch = BatchTagger::new(tagger());
        let sequences = vec![vec!["x"], vec!["y"], vec!["stop"], vec!["x", "y"], vec!["y"]];
        let results = pool.install(|| {
            batch.run(&sequences, |seq| {
                if seq == ["stop"] {
                    batch.token().cancel();
                }
                batch.tagger().tag(seq)
            })
        });
        assert_eq!(results.len(), 5);
        // The sequence that cancels is already in progress and finishes.
        assert!(results[..3].iter().all(Option::is_some));
        assert!(results[3..].iter().all(Option::is_none));
    }
}
