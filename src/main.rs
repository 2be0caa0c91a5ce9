use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
    time::Instant,
};

use clap::Parser;
use hmmtag::{BatchTagger, Dataset, Decoding, Evaluation, HmmTagger, ProbabilityModel, Sentence, Tagger, Trace};

/// Assign suitable labels to the sentences in the data sets given by files (FILE)
/// If no FILE is given or FILE is '-', this utility reads data from STDIN
/// Evaluate the performance of the model on labeled sentences (with -t option)
#[derive(Debug, Parser)]
#[command(name = "hmmtag", version)]
struct Argv {
    /// read a model from a JSON file (MODEL)
    #[arg(short, long, required = true, value_name = "MODEL")]
    model: PathBuf,
    /// report the performance of the model on the data
    #[arg(short = 't', long = "test")]
    evaluate: bool,
    /// output the reference labels in the input data
    #[arg(short, long)]
    reference: bool,
    /// output the probability of the label sequences
    #[arg(short, long)]
    probability: bool,
    /// output the marginal probability of items for their predicted label
    #[arg(short = 'i', long)]
    marginal: bool,
    /// output the marginal probabilities of items for all labels
    #[arg(short = 'l', long)]
    marginal_all: bool,
    /// output the Viterbi lattice of every sentence as JSON
    #[arg(long)]
    trace: bool,
    /// suppress tagging results (useful for test mode)
    #[arg(short, long)]
    quiet: bool,
    /// data sets to tag
    #[arg(value_name = "FILE")]
    datasets: Vec<PathBuf>,
}

fn read_dataset(path: &Path) -> hmmtag::Result<Dataset> {
    if path.as_os_str() == "-" {
        return Ok(Dataset::from_reader(io::stdin().lock())?);
    }
    Ok(Dataset::try_from(File::open(path)?)?)
}

fn output_result<W: Write>(
    out: &mut W,
    argv: &Argv,
    tagger: &HmmTagger,
    sentence: &Sentence,
    prediction: &[String],
    trace: Option<&Trace>,
) -> hmmtag::Result<()> {
    if argv.probability {
        let p = tagger.probability(&sentence.tokens, prediction)?;
        writeln!(out, "@probability\t{p:.6}")?;
    }
    let marginals = (argv.marginal || argv.marginal_all).then(|| tagger.marginals(&sentence.tokens));
    for (t, pred) in prediction.iter().enumerate() {
        if argv.reference {
            let reference = sentence.labels.get(t).map(String::as_str).unwrap_or("");
            write!(out, "{reference}\t")?;
        }
        write!(out, "{pred}")?;
        if let Some(m) = &marginals {
            if argv.marginal {
                write!(out, ":{:.6}", m.probability(t, pred).unwrap_or_default())?;
            }
            if argv.marginal_all {
                for (l, label) in m.labels().iter().enumerate() {
                    write!(out, "\t{label}:{:.6}", m.get(t, l))?;
                }
            }
        }
        writeln!(out)?;
    }
    if let Some(trace) = trace {
        serde_json::to_writer(&mut *out, trace)?;
        writeln!(out)?;
    }
    writeln!(out)?;
    Ok(())
}

fn main() -> hmmtag::Result<()> {
    env_logger::init();
    let mut argv = Argv::parse();
    log::info!("{:?}", argv);
    let model = ProbabilityModel::from_path(&argv.model)?;
    let tagger = HmmTagger::from(model);
    let batch = BatchTagger::new(tagger.clone());
    if argv.datasets.is_empty() {
        argv.datasets.push(PathBuf::from("-"));
    }

    let mut evaluation = Evaluation::default();
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let begin = Instant::now();
    let mut num_sentences = 0;
    for fpath in &argv.datasets {
        let dataset = read_dataset(fpath)?;
        let sequences: Vec<Vec<&str>> = dataset.iter().map(|s| s.tokens.iter().map(String::as_str).collect()).collect();
        let predictions: Vec<Option<(Decoding, Option<Trace>)>> = if argv.trace {
            batch.trace_all(&sequences).into_iter().map(|r| r.map(|(d, trace)| (d, Some(trace)))).collect()
        } else {
            batch.tag_all(&sequences).into_iter().map(|r| r.map(|d| (d, None))).collect()
        };
        for (sentence, prediction) in dataset.iter().zip(predictions) {
            let Some((decoding, trace)) = prediction else { continue };
            num_sentences += 1;
            if argv.evaluate && sentence.is_labeled() {
                evaluation.accumulate(&sentence.labels, &decoding.states);
            }
            if !argv.quiet {
                output_result(&mut out, &argv, &tagger, sentence, &decoding.states, trace.as_ref())?;
            }
        }
    }
    let elapsed = begin.elapsed();
    if argv.evaluate {
        evaluation.evaluate();
        write!(out, "{}", evaluation)?;
        writeln!(
            out,
            "Elapsed time: {:.6} [sec] ({:.1} [instance/sec])",
            elapsed.as_secs_f64(),
            num_sentences as f64 / elapsed.as_secs_f64().max(f64::EPSILON)
        )?;
    }
    out.flush()?;
    Ok(())
}
