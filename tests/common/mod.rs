#![allow(dead_code, non_snake_case)]

use hmmtag::{hmm::logsumexp, ModelSpec, ProbabilityModel};

/// Every path score over `L^(T+1)` label assignments, position -1 included.
fn all_paths(model: &ProbabilityModel, obs: &[&str]) -> Vec<(Vec<usize>, f64)> {
    let L = model.num_states();
    let start = model.start_row();
    let mut out = Vec::new();
    let total = L.pow(obs.len() as u32 + 1);
    for mut code in 0..total {
        let mut path = Vec::with_capacity(obs.len() + 1);
        for _ in 0..=obs.len() {
            path.push(code % L);
            code /= L;
        }
        let mut score = start[path[0]];
        for (t, o) in obs.iter().enumerate() {
            score += model.trans(path[t], path[t + 1]);
            score += model.emit(model.observation_id(o), path[t + 1]);
        }
        out.push((path[1..].to_vec(), score));
    }
    out
}

pub fn brute_force_best(model: &ProbabilityModel, obs: &[&str]) -> f64 {
    all_paths(model, obs).into_iter().map(|(_, s)| s).fold(f64::NEG_INFINITY, f64::max)
}

pub fn brute_force_log_norm(model: &ProbabilityModel, obs: &[&str]) -> f64 {
    let scores: Vec<f64> = all_paths(model, obs).into_iter().map(|(_, s)| s).collect();
    logsumexp(&scores)
}

/// `[T][L]` posteriors by summing over every path.
pub fn brute_force_marginals(model: &ProbabilityModel, obs: &[&str]) -> Vec<f64> {
    let L = model.num_states();
    let paths = all_paths(model, obs);
    let log_norm = logsumexp(&paths.iter().map(|(_, s)| *s).collect::<Vec<_>>());
    let mut out = vec![0.0; obs.len() * L];
    for (path, score) in &paths {
        let p = (score - log_norm).exp();
        for (t, &l) in path.iter().enumerate() {
            out[L * t + l] += p;
        }
    }
    out
}

/// Part-of-speech toy model with an explicit sentence boundary tag.
pub fn pos_model() -> ModelSpec {
    ModelSpec::new(["DET", "NOUN", "VERB", "ADJ", "."], ".")
        .with_fallback(-9.0)
        .transition(".", "DET", 0.6f64.ln())
        .transition(".", "NOUN", 0.3f64.ln())
        .transition(".", "ADJ", 0.1f64.ln())
        .transition("DET", "NOUN", 0.7f64.ln())
        .transition("DET", "ADJ", 0.3f64.ln())
        .transition("ADJ", "NOUN", 0.9f64.ln())
        .transition("ADJ", "ADJ", 0.1f64.ln())
        .transition("NOUN", "VERB", 0.5f64.ln())
        .transition("NOUN", ".", 0.3f64.ln())
        .transition("NOUN", "NOUN", 0.2f64.ln())
        .transition("VERB", "DET", 0.5f64.ln())
        .transition("VERB", "ADJ", 0.2f64.ln())
        .transition("VERB", ".", 0.3f64.ln())
        .emission("the", "DET", 0.6f64.ln())
        .emission("a", "DET", 0.4f64.ln())
        .emission("dog", "NOUN", 0.2f64.ln())
        .emission("cat", "NOUN", 0.2f64.ln())
        .emission("walks", "NOUN", 0.01f64.ln())
        .emission("walks", "VERB", 0.3f64.ln())
        .emission("sees", "VERB", 0.3f64.ln())
        .emission("big", "ADJ", 0.5f64.ln())
        .emission("old", "ADJ", 0.3f64.ln())
        .emission("old", "NOUN", 0.01f64.ln())
        .emission(".", ".", 0.99f64.ln())
}
