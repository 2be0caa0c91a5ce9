use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use hmmtag::{BatchTagger, ForwardBackwardEngine, HmmTagger, ModelSpec, ProbabilityModel, ViterbiDecoder};

const NUM_STATES: usize = 12;
const NUM_WORDS: usize = 500;

fn synthetic_model() -> ProbabilityModel {
    let states: Vec<String> = (0..NUM_STATES).map(|i| format!("T{i:02}")).collect();
    let mut spec = ModelSpec::new(&states, &states[0]).with_fallback(-15.0);
    for (i, from) in states.iter().enumerate() {
        for (j, to) in states.iter().enumerate() {
            let w = 1.0 + ((i * 7 + j * 3) % 11) as f64;
            spec = spec.transition(from, to, (w / 80.0).ln());
        }
    }
    for w in 0..NUM_WORDS {
        for k in 0..3 {
            let state = &states[(w + k * 5) % NUM_STATES];
            spec = spec.emission(&format!("w{w}"), state, (0.002 * (k + 1) as f64).ln());
        }
    }
    ProbabilityModel::new(spec).expect("failed to build model")
}

fn sentences() -> Vec<Vec<String>> {
    (0..200)
        .map(|s| (0..25).map(|t| format!("w{}", (s * 31 + t * 17) % (NUM_WORDS + 50))).collect())
        .collect()
}

fn decode_benchmark(c: &mut Criterion) {
    let model = Arc::new(synthetic_model());
    let decoder = ViterbiDecoder::new(model.clone());
    let engine = ForwardBackwardEngine::new(model.clone());
    let batch = BatchTagger::new(HmmTagger::new(model));
    let sentences = sentences();

    c.bench_function("viterbi", |b| {
        b.iter(|| {
            for s in &sentences {
                black_box(decoder.decode(black_box(s)));
            }
        })
    });
    c.bench_function("forward_backward", |b| {
        b.iter(|| {
            for s in &sentences {
                black_box(engine.compute_marginals(black_box(s)));
            }
        })
    });
    c.bench_function("batch_viterbi", |b| b.iter(|| black_box(batch.tag_all(black_box(&sentences)))));
}

criterion_group!(benchmarks, decode_benchmark);
criterion_main!(benchmarks);
