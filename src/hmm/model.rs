use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use serde::{Deserialize, Serialize};

use crate::{
    quark::{Quark, StringTable, TextVectorizer},
    Error, Result,
};

/// Log-probability used for unseen pairs when a spec does not set one.
pub fn default_fallback() -> f64 {
    1e-9_f64.ln()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub from: String,
    pub to: String,
    pub logp: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Emission {
    pub observation: String,
    pub state: String,
    pub logp: f64,
}

/// Serialized form of a model, as produced by whatever estimated it.
///
/// All probabilities are natural logarithms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub states: Vec<String>,
    /// State the synthetic position before the first token is pinned to.
    pub boundary: String,
    #[serde(default = "default_fallback")]
    pub fallback: f64,
    #[serde(default)]
    pub transitions: Vec<Transition>,
    #[serde(default)]
    pub emissions: Vec<Emission>,
}

impl ModelSpec {
    pub fn new<I, S>(states: I, boundary: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            states: states.into_iter().map(|s| s.as_ref().to_string()).collect(),
            boundary: boundary.to_string(),
            fallback: default_fallback(),
            transitions: Vec::new(),
            emissions: Vec::new(),
        }
    }

    pub fn with_fallback(mut self, fallback: f64) -> Self {
        self.fallback = fallback;
        self
    }

    /// Adds `log P(to | from)`.
    pub fn transition(mut self, from: &str, to: &str, logp: f64) -> Self {
        self.transitions.push(Transition { from: from.to_string(), to: to.to_string(), logp });
        self
    }

    /// Adds `log P(observation | state)`.
    pub fn emission(mut self, observation: &str, state: &str, logp: f64) -> Self {
        self.emissions.push(Emission { observation: observation.to_string(), state: state.to_string(), logp });
        self
    }
}

fn check_logp(what: &str, value: f64) -> Result<f64> {
    if value.is_nan() || value > 0.0 {
        return Err(Error::InvalidModel(format!("{what} is not a log-probability: {value}")));
    }
    Ok(value)
}

/// Immutable transition and emission tables of a hidden Markov model.
///
/// States are interned in lexicographic order; that order is the tie-break
/// order of every decoder built on the model.
#[derive(Debug, Clone)]
pub struct ProbabilityModel {
    states: Quark,
    vocabulary: Quark,
    /**
     * Transition scores.
     *  This is a [L][L] matrix whose element [i][j] is log P(j | i).
     */
    trans: Vec<f64>,
    /**
     * Emission scores.
     *  This is a [V][L] matrix whose element [o][l] is log P(o | l).
     */
    emit: Vec<f64>,
    fallback: f64,
    boundary: usize,
}

impl ProbabilityModel {
    pub fn new(spec: ModelSpec) -> Result<Self> {
        let fallback = check_logp("fallback", spec.fallback)?;
        let states = Quark::sorted(&spec.states);
        if states.is_empty() {
            return Err(Error::InvalidModel("empty state set".into()));
        }
        let L = states.len();
        let boundary = states
            .to_id(&spec.boundary)
            .ok_or_else(|| Error::InvalidModel(format!("boundary state {:?} is not a state", spec.boundary)))?;
        let lookup = |label: &str| {
            states
                .to_id(label)
                .ok_or_else(|| Error::InvalidModel(format!("unknown state {label:?}")))
        };

        let mut trans = vec![fallback; L * L];
        for t in &spec.transitions {
            let i = lookup(&t.from)?;
            let j = lookup(&t.to)?;
            trans[L * i + j] = check_logp("transition", t.logp)?;
        }

        let mut vocabulary = Quark::default();
        let mut emit = Vec::new();
        for e in &spec.emissions {
            let l = lookup(&e.state)?;
            let logp = check_logp("emission", e.logp)?;
            let o = vocabulary.find_or_insert(&e.observation);
            if o * L >= emit.len() {
                emit.resize((o + 1) * L, fallback);
            }
            emit[L * o + l] = logp;
        }
        log::debug!(
            "model: {} states, {} observations, {} transitions, boundary {:?}",
            L,
            vocabulary.len(),
            spec.transitions.len(),
            spec.boundary
        );

        Ok(Self { states, vocabulary, trans, emit, fallback, boundary })
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let f = File::open(path)?;
        Self::from_reader(BufReader::new(f))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let spec: ModelSpec = serde_json::from_reader(reader)?;
        Self::new(spec)
    }

    pub fn from_slice(buffer: &[u8]) -> Result<Self> {
        let spec: ModelSpec = serde_json::from_slice(buffer)?;
        Self::new(spec)
    }

    pub fn dump<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut w = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut w, &self.to_spec())?;
        w.flush()?;
        Ok(())
    }

    /// Spec that rebuilds this model. Pairs scoring `fallback` are left out.
    pub fn to_spec(&self) -> ModelSpec {
        let L = self.num_states();
        let mut spec = ModelSpec::new(self.states.iter(), self.label(self.boundary)).with_fallback(self.fallback);
        for (i, from) in self.states.iter().enumerate() {
            for (j, to) in self.states.iter().enumerate() {
                let logp = self.trans[L * i + j];
                if logp.to_bits() != self.fallback.to_bits() {
                    spec = spec.transition(from, to, logp);
                }
            }
        }
        for (o, observation) in self.vocabulary.iter().enumerate() {
            for (l, state) in self.states.iter().enumerate() {
                let logp = self.emit[L * o + l];
                if logp.to_bits() != self.fallback.to_bits() {
                    spec = spec.emission(observation, state, logp);
                }
            }
        }
        spec
    }

    #[inline]
    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    pub fn states(&self) -> &Quark {
        &self.states
    }

    pub fn labels(&self) -> &[String] {
        self.states.as_slice()
    }

    pub fn label(&self, state: usize) -> &str {
        &self.states.as_slice()[state]
    }

    pub fn state_id(&self, label: &str) -> Option<usize> {
        self.states.to_id(label)
    }

    /// State indices of a label path that must cover `len` positions.
    pub fn resolve_path<P: AsRef<str>>(&self, len: usize, path: &[P]) -> Result<Vec<usize>> {
        if path.len() != len {
            return Err(Error::LengthMismatch { expected: len, found: path.len() });
        }
        path.iter()
            .map(|label| {
                let label = label.as_ref();
                self.state_id(label).ok_or_else(|| Error::UnknownState(label.to_string()))
            })
            .collect()
    }

    pub fn vocabulary(&self) -> &Quark {
        &self.vocabulary
    }

    /// Vocabulary id of a token, `None` when it was never seen.
    pub fn observation_id(&self, observation: &str) -> Option<usize> {
        self.vocabulary.to_id(observation)
    }

    pub fn fallback(&self) -> f64 {
        self.fallback
    }

    pub fn boundary(&self) -> usize {
        self.boundary
    }

    /// `log P(to | from)` by state index.
    #[inline]
    pub fn trans(&self, from: usize, to: usize) -> f64 {
        self.trans[self.num_states() * from + to]
    }

    /// `log P(observation | state)`; unknown observations score `fallback`.
    #[inline]
    pub fn emit(&self, observation: Option<usize>, state: usize) -> f64 {
        match observation {
            Some(o) => self.emit[self.num_states() * o + state],
            None => self.fallback,
        }
    }

    pub fn transition_score(&self, to: &str, from: &str) -> f64 {
        match (self.state_id(from), self.state_id(to)) {
            (Some(i), Some(j)) => self.trans(i, j),
            _ => self.fallback,
        }
    }

    pub fn emission_score(&self, observation: &str, state: &str) -> f64 {
        match self.state_id(state) {
            Some(l) => self.emit(self.observation_id(observation), l),
            None => self.fallback,
        }
    }

    /// Scores of the synthetic row before the first position.
    pub fn start_row(&self) -> Vec<f64> {
        let mut row = vec![self.fallback; self.num_states()];
        row[self.boundary] = 0.0;
        row
    }
}

impl TryFrom<ModelSpec> for ProbabilityModel {
    type Error = Error;

    fn try_from(spec: ModelSpec) -> Result<Self> {
        Self::new(spec)
    }
}
