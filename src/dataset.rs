use std::{
    fs::File,
    io::{BufRead, BufReader, Read},
};

/// A tokenized sentence, optionally with one reference label per token.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Sentence {
    pub tokens: Vec<String>,
    pub labels: Vec<String>,
}

impl Sentence {
    pub fn push(&mut self, token: String, label: Option<String>) {
        self.tokens.push(token);
        if let Some(label) = label {
            self.labels.push(label);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Every token carries a reference label.
    pub fn is_labeled(&self) -> bool {
        !self.tokens.is_empty() && self.labels.len() == self.tokens.len()
    }
}

/// Sentences read from a line-oriented stream.
///
/// Each non-empty line is either `token` or `label<TAB>token`; an empty line
/// ends the current sentence.
#[derive(Debug, Default)]
pub struct Dataset {
    pub v: Vec<Sentence>,
}

impl Dataset {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, std::io::Error> {
        let mut this = Self::default();
        let mut sentence = Sentence::default();
        for line in BufReader::new(reader).lines() {
            let line = line?;
            if !line.is_empty() {
                let fields: Vec<&str> = line.split('\t').collect();
                match fields.as_slice() {
                    [token] => sentence.push(token.to_string(), None),
                    [label, token] => sentence.push(token.to_string(), Some(label.to_string())),
                    _ => log::warn!("invalid line: {line}"),
                }
            } else if !sentence.is_empty() {
                this.v.push(std::mem::take(&mut sentence));
            }
        }
        if !sentence.is_empty() {
            this.v.push(sentence);
        }
        log::debug!("read {} sentences, {} tokens", this.len(), this.total_items());
        Ok(this)
    }

    pub fn len(&self) -> usize {
        self.v.len()
    }

    pub fn is_empty(&self) -> bool {
        self.v.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Sentence> {
        self.v.iter()
    }

    pub fn max_length(&self) -> usize {
        self.v.iter().map(|x| x.len()).max().unwrap_or_default()
    }

    pub fn total_items(&self) -> usize {
        self.v.iter().map(|x| x.len()).sum()
    }
}

impl TryFrom<File> for Dataset {
    type Error = std::io::Error;

    fn try_from(file: File) -> Result<Self, Self::Error> {
        Self::from_reader(file)
    }
}
