use std::{collections::BTreeMap, fmt::Display, iter::zip};

/// Label-wise performance values.
#[derive(Debug, Default, Clone)]
struct LabelMeasure {
    /// Number of correct predictions.
    num_correct: usize,
    /// Number of occurrences of the label in the reference data.
    num_observation: usize,
    /// Number of predictions.
    num_prediction: usize,
    precision: f64,
    recall: f64,
    fmeasure: f64,
}

impl LabelMeasure {
    fn compute(&mut self) {
        self.precision = 0.0;
        self.recall = 0.0;
        self.fmeasure = 0.0;
        if self.num_prediction > 0 {
            self.precision = self.num_correct as f64 / self.num_prediction as f64;
        }
        if self.num_observation > 0 {
            self.recall = self.num_correct as f64 / self.num_observation as f64;
        }
        if self.precision + self.recall > 0.0 {
            self.fmeasure = self.precision * self.recall * 2.0 / (self.precision + self.recall);
        }
    }
}

/// Tagging accuracy against reference labels.
#[derive(Debug, Default, Clone)]
pub struct Evaluation {
    tbl: BTreeMap<String, LabelMeasure>,

    /// Number of correctly predicted items.
    item_total_correct: usize,
    /// Total number of items.
    item_total_num: usize,

    /// Number of sequences predicted without a single error.
    inst_total_correct: usize,
    /// Total number of sequences.
    inst_total_num: usize,

    estimation: Estimation,
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Estimation {
    pub precision: f64,
    pub recall: f64,
    pub fmeasure: f64,
    pub item_accuracy: f64,
    pub inst_accuracy: f64,
}

impl Evaluation {
    pub fn accumulate<R: AsRef<str>, P: AsRef<str>>(&mut self, reference: &[R], prediction: &[P]) {
        if reference.len() != prediction.len() {
            log::warn!("skipping sequence: {} references, {} predictions", reference.len(), prediction.len());
            return;
        }
        let mut matched = 0;
        for (r, p) in zip(reference, prediction) {
            let (r, p) = (r.as_ref(), p.as_ref());
            self.tbl.entry(r.to_string()).or_default().num_observation += 1;
            self.tbl.entry(p.to_string()).or_default().num_prediction += 1;
            if r == p {
                self.tbl.entry(r.to_string()).or_default().num_correct += 1;
                matched += 1;
            }
        }
        self.item_total_correct += matched;
        self.item_total_num += prediction.len();
        if matched == prediction.len() {
            self.inst_total_correct += 1;
        }
        self.inst_total_num += 1;
    }

    /// Macro averages run over labels that occur in the reference data.
    pub fn evaluate(&mut self) -> Estimation {
        let mut est = Estimation::default();
        let mut num_labels = 0;
        for lev in self.tbl.values_mut() {
            lev.compute();
            if lev.num_observation == 0 {
                continue;
            }
            num_labels += 1;
            est.precision += lev.precision;
            est.recall += lev.recall;
            est.fmeasure += lev.fmeasure;
        }
        if num_labels > 0 {
            est.precision /= num_labels as f64;
            est.recall /= num_labels as f64;
            est.fmeasure /= num_labels as f64;
        }
        if self.item_total_num > 0 {
            est.item_accuracy = self.item_total_correct as f64 / self.item_total_num as f64;
        }
        if self.inst_total_num > 0 {
            est.inst_accuracy = self.inst_total_correct as f64 / self.inst_total_num as f64;
        }
        self.estimation = est;
        est
    }
}

impl Display for Evaluation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Performance by label (#match, #model, #ref) (precision, recall, F1):")?;
        for (label, lev) in &self.tbl {
            if lev.num_observation == 0 {
                writeln!(f, "\t{}: ({}, {}, {}) (******, ******, ******)", label, lev.num_correct, lev.num_prediction, lev.num_observation)?;
            } else {
                writeln!(
                    f,
                    "\t{}: ({}, {}, {}) ({:.4}, {:.4}, {:.4})",
                    label, lev.num_correct, lev.num_prediction, lev.num_observation, lev.precision, lev.recall, lev.fmeasure
                )?;
            }
        }
        let est = &self.estimation;
        writeln!(f, "Macro-average precision, recall, F1: ({:.6}, {:.6}, {:.6})", est.precision, est.recall, est.fmeasure)?;
        writeln!(f, "Item accuracy: {} / {} ({:.4})", self.item_total_correct, self.item_total_num, est.item_accuracy)?;
        writeln!(f, "Instance accuracy: {} / {} ({:.4})", self.inst_total_correct, self.inst_total_num, est.inst_accuracy)
    }
}
