use bitflags::bitflags;
use serde::Serialize;

use super::{argmax, logsumexp, model::ProbabilityModel};

bitflags! {
    /// Tables a lattice allocates.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Flags: u32 {
        const VITERBI = 0x01;
        const MARGINALS = 0x02;
        const ALL = Self::VITERBI.bits() | Self::MARGINALS.bits();
    }
}

/// Per-call dynamic programming tables over one observation sequence.
///
/// Every table is row-major with `L` columns, so element `[t][l]` lives at
/// `L * t + l`. Position -1 is not stored in the tables; it is the `start`
/// row, where the boundary state scores `0.0` and every other state scores
/// the model fallback.
#[derive(Debug)]
pub(crate) struct Lattice<'a> {
    model: &'a ProbabilityModel,
    flag: Flags,
    /// The total number of distinct labels (L).
    num_labels: usize,
    /// The number of items (T) in the sequence.
    num_items: usize,
    start: Vec<f64>,
    /**
     * State scores.
     *  This is a [T][L] matrix whose element [t][l] is the emission score
     *  of the observation at #t under label #l.
     */
    state: Vec<f64>,
    /**
     * Delta score matrix.
     *  This is a [T][L] matrix whose element [t][l] is the score of the best
     *  path from position -1 to (t, l).
     */
    delta_score: Vec<f64>,
    /**
     * Backward edges.
     *  This is a [T][L] matrix whose element [t][j] is the label #i at t-1
     *  that yields the maximum score to arrive at (t, j). Row 0 points into
     *  the start row.
     */
    backward_edge: Vec<usize>,
    /**
     * Alpha score matrix.
     *  This is a [T][L] matrix whose element [t][l] is the log of the total
     *  probability of paths starting at position -1 and arriving at (t, l),
     *  the emission at (t, l) included.
     */
    alpha_score: Vec<f64>,
    /**
     * Beta score matrix.
     *  This is a [T][L] matrix whose element [t][l] is the log of the total
     *  probability of the observations after #t given label #l at #t.
     */
    beta_score: Vec<f64>,
    /// Logarithm of the total probability of the sequence.
    log_norm: f64,
    /**
     * Marginal probabilities.
     *  This is a [T][L] matrix whose element [t][l] is the posterior
     *  probability of label #l at #t.
     */
    mexp_state: Vec<f64>,
    /// Work space of length L.
    row: Vec<f64>,
}

impl<'a> Lattice<'a> {
    pub fn new<S: AsRef<str>>(model: &'a ProbabilityModel, flag: Flags, observations: &[S]) -> Self {
        let L = model.num_states();
        let T = observations.len();
        let mut state = Vec::with_capacity(T * L);
        for observation in observations {
            let o = model.observation_id(observation.as_ref());
            state.extend((0..L).map(|l| model.emit(o, l)));
        }
        let mut this = Self {
            model,
            flag,
            num_labels: L,
            num_items: T,
            start: model.start_row(),
            state,
            delta_score: Vec::new(),
            backward_edge: Vec::new(),
            alpha_score: Vec::new(),
            beta_score: Vec::new(),
            log_norm: 0.0,
            mexp_state: Vec::new(),
            row: vec![0.0; L],
        };
        if flag.contains(Flags::VITERBI) {
            this.delta_score.resize(T * L, 0.0);
            this.backward_edge.resize(T * L, 0);
        }
        if flag.contains(Flags::MARGINALS) {
            this.alpha_score.resize(T * L, 0.0);
            this.beta_score.resize(T * L, 0.0);
            this.mexp_state.resize(T * L, 0.0);
        }
        this
    }

    #[inline]
    pub fn num_items(&self) -> usize {
        self.num_items
    }

    /// Score of entering label #j at position 0 from the best start state.
    fn enter(&self, j: usize) -> (f64, usize) {
        argmax((0..self.num_labels).map(|i| self.start[i] + self.model.trans(i, j)))
    }

    /// Fills the delta table and traces back the best path.
    ///
    /// Returns the labels and the path score. The caller is expected to skip
    /// empty sequences; for them this returns `([], 0.0)`.
    pub fn viterbi(&mut self) -> (Vec<usize>, f64) {
        debug_assert!(self.flag.contains(Flags::VITERBI));
        let T = self.num_items;
        let L = self.num_labels;
        if T == 0 {
            return (Vec::new(), 0.0);
        }

        /* Compute the scores at (0, *) from the start row. */
        for j in 0..L {
            let (max_score, argmax_score) = self.enter(j);
            self.backward_edge[j] = argmax_score;
            self.delta_score[j] = max_score + self.state[j];
        }

        /* Compute the scores at (t, *). */
        for t in 1..T {
            for j in 0..L {
                /* Transit from (t-1, i) to (t, j). */
                let prev = &self.delta_score[L * (t - 1)..L * t];
                let (max_score, argmax_score) = argmax((0..L).map(|i| prev[i] + self.model.trans(i, j)));
                self.backward_edge[L * t + j] = argmax_score;
                self.delta_score[L * t + j] = max_score + self.state[L * t + j];
            }
        }

        /* Find the node (T-1, i) with the maximum score. */
        let (max_score, last) = argmax(self.delta_score[L * (T - 1)..].iter().copied());
        let mut labels = vec![0; T];
        labels[T - 1] = last;
        /* Tag labels by tracing the backward links. */
        for t in (0..T - 1).rev() {
            labels[t] = self.backward_edge[L * (t + 1) + labels[t + 1]];
        }
        (labels, max_score)
    }

    pub fn alpha_score(&mut self) {
        debug_assert!(self.flag.contains(Flags::MARGINALS));
        let T = self.num_items;
        let L = self.num_labels;
        if T == 0 {
            self.log_norm = 0.0;
            return;
        }

        /* alpha[0][j] = state[0][j] + lse_i(start[i] + trans[i][j]) */
        for j in 0..L {
            for i in 0..L {
                self.row[i] = self.start[i] + self.model.trans(i, j);
            }
            self.alpha_score[j] = self.state[j] + logsumexp(&self.row);
        }

        /* alpha[t][j] = state[t][j] + lse_i(alpha[t-1][i] + trans[i][j]) */
        for t in 1..T {
            for j in 0..L {
                for i in 0..L {
                    self.row[i] = self.alpha_score[L * (t - 1) + i] + self.model.trans(i, j);
                }
                self.alpha_score[L * t + j] = self.state[L * t + j] + logsumexp(&self.row);
            }
        }

        self.log_norm = logsumexp(&self.alpha_score[L * (T - 1)..]);
    }

    pub fn beta_score(&mut self) {
        debug_assert!(self.flag.contains(Flags::MARGINALS));
        let T = self.num_items;
        let L = self.num_labels;
        if T == 0 {
            return;
        }

        /* Compute the beta scores at (T-1, *). */
        for i in 0..L {
            self.beta_score[L * (T - 1) + i] = 0.0;
        }

        /* beta[t][i] = lse_j(trans[i][j] + state[t+1][j] + beta[t+1][j]) */
        for t in (0..T - 1).rev() {
            for i in 0..L {
                for j in 0..L {
                    self.row[j] = self.model.trans(i, j)
                        + self.state[L * (t + 1) + j]
                        + self.beta_score[L * (t + 1) + j];
                }
                self.beta_score[L * t + i] = logsumexp(&self.row);
            }
        }
    }

    /// Posterior of every (t, l). Requires [`Self::alpha_score`] and
    /// [`Self::beta_score`] to have run.
    pub fn marginals(&mut self) {
        let T = self.num_items;
        let L = self.num_labels;
        if self.log_norm == f64::NEG_INFINITY {
            log::debug!("no path reaches the end of a {T}-item sequence");
            self.mexp_state.iter_mut().for_each(|p| *p = 0.0);
            return;
        }
        for k in 0..T * L {
            self.mexp_state[k] = (self.alpha_score[k] + self.beta_score[k] - self.log_norm).exp();
        }
    }

    #[inline]
    pub fn lognorm(&self) -> f64 {
        self.log_norm
    }

    /// Re-sums the score of a label path the way [`Self::viterbi`] scores it.
    pub fn score(&self, labels: &[usize]) -> f64 {
        match labels.first() {
            /* Enter (0, labels[0]) from the best start state. */
            Some(&first) => self.enter(first).0 + self.path_tail(labels),
            None => 0.0,
        }
    }

    /// Log joint probability of a label path and the observations.
    ///
    /// Unlike [`Self::score`], the start row is summed over as in
    /// [`Self::alpha_score`], so `exp(log_joint - lognorm)` over every path
    /// adds up to one.
    pub fn log_joint(&mut self, labels: &[usize]) -> f64 {
        let Some(&first) = labels.first() else {
            return 0.0;
        };
        for i in 0..self.num_labels {
            self.row[i] = self.start[i] + self.model.trans(i, first);
        }
        logsumexp(&self.row) + self.path_tail(labels)
    }

    /// Emissions and transitions along `labels` from position 0 on.
    fn path_tail(&self, labels: &[usize]) -> f64 {
        let L = self.num_labels;
        let mut i = labels[0];
        let mut r = self.state[i];

        for t in 1..self.num_items {
            let j = labels[t];
            /* Transit from (t-1, i) to (t, j). */
            r += self.model.trans(i, j);
            r += self.state[L * t + j];
            i = j;
        }
        r
    }

    pub fn into_marginals(self) -> (Vec<f64>, f64) {
        (self.mexp_state, self.log_norm)
    }

    pub fn alpha(&self) -> &[f64] {
        &self.alpha_score
    }

    pub fn beta(&self) -> &[f64] {
        &self.beta_score
    }

    pub fn trace(&self) -> Trace {
        let L = self.num_labels;
        Trace {
            labels: self.model.labels().to_vec(),
            start: self.start.clone(),
            scores: self.delta_score.chunks(L).map(<[f64]>::to_vec).collect(),
            backpointers: self.backward_edge.chunks(L).map(<[usize]>::to_vec).collect(),
        }
    }
}

/// Snapshot of a completed Viterbi lattice.
///
/// `scores[t][l]` is the best path score at (t, l) and `backpointers[t][l]`
/// the label index it came from at t-1; for t = 0 it indexes `start`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trace {
    pub labels: Vec<String>,
    pub start: Vec<f64>,
    pub scores: Vec<Vec<f64>>,
    pub backpointers: Vec<Vec<usize>>,
}
