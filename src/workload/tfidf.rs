//! TF-IDF over a corpus of labelled reviews.
//!
//! Every input file holds one review as `<label>\t<text>`; the review id is
//! the file name up to its first `.`. The map side computes term frequencies
//! per review, the reduce side weighs them by the inverse document frequency
//! of the word. Output lines are `review_id\tword\ttfidf`.
//!
//! The reducer needs `--total-docs <N>`, which the standalone runner appends
//! to the workload arguments. There is no combiner: the document frequency of
//! a word is only known once every review has been mapped.

use std::path::Path;

use anyhow::{anyhow, ensure, Result};
use bytes::{BufMut, Bytes, BytesMut};
use clap::Parser;
use itertools::Itertools;

use crate::utils::{args_from_aux, read_u64, string_from_bytes};
use crate::*;

/// Characters that separate words.
pub const DELIMITERS: &[char] = &[
    ';', ',', ' ', '.', '-', '!', '\t', '"', '&', '(', ')', '*', '<', '>', '/', ':', '\'',
];

#[derive(Parser, Debug)]
#[clap(no_binary_name = true)]
struct Args {
    /// Number of reviews in the corpus.
    #[clap(long, value_parser)]
    total_docs: u64,
}

/// The count of one word in one review.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Posting {
    pub review_id: String,
    /// Occurrences of the word in the review.
    pub tf: u64,
    /// Number of fields the review text splits into, empty ones included.
    pub total: u64,
}

impl Posting {
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(16 + self.review_id.len());
        buf.put_u64(self.tf);
        buf.put_u64(self.total);
        buf.put(self.review_id.as_bytes());
        buf.freeze()
    }

    pub fn decode(mut buf: Bytes) -> Result<Self> {
        let tf = read_u64(&mut buf)?;
        let total = read_u64(&mut buf)?;
        ensure!(total > 0, "posting with an empty review");
        let review_id = string_from_bytes(buf)?;
        Ok(Self {
            review_id,
            tf,
            total,
        })
    }
}

/// `reviews/10_7.txt` is review `10_7`.
pub fn review_id(path: &str) -> &str {
    let name = Path::new(path)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(path);
    name.split('.').next().unwrap_or(name)
}

/// The review text of a file: the second tab-separated field of the trimmed
/// content. Later fields are ignored and the field itself is not trimmed.
pub fn review_text(content: &str) -> Option<&str> {
    content.trim().split('\t').nth(1)
}

/// Splits `text` into lowercase words and counts them.
///
/// Returns the distinct non-empty words with their counts, sorted by word,
/// and the total number of fields the text split into.
pub fn term_counts(text: &str) -> (Vec<(String, u64)>, u64) {
    let lowered = text.to_lowercase();
    let fields = lowered.split(DELIMITERS).collect::<Vec<_>>();
    let total = fields.len() as u64;
    let counts = fields
        .into_iter()
        .filter(|word| !word.is_empty())
        .counts()
        .into_iter()
        .map(|(word, count)| (word.to_string(), count as u64))
        .sorted()
        .collect();
    (counts, total)
}

/// `(tf / total) * ln(total_docs / doc_freq)`.
pub fn tf_idf(tf: u64, total: u64, total_docs: u64, doc_freq: u64) -> f64 {
    let idf = (total_docs as f64 / doc_freq as f64).ln();
    (tf as f64 / total as f64) * idf
}

pub fn map(kv: &ByteKeyValue, _aux: &Bytes) -> MapOutput<Bytes, Bytes> {
    let path = string_from_bytes(kv.key())?;
    let content = string_from_bytes(kv.value())?;
    let text = review_text(&content)
        .ok_or_else(|| anyhow!("{}: expected `<label>\\t<review>`", path))?;
    let review_id = review_id(&path).to_string();
    let (counts, total) = term_counts(text);

    let iter = counts.into_iter().map(move |(word, tf)| {
        let posting = Posting {
            review_id: review_id.clone(),
            tf,
            total,
        };
        Ok(KeyValue::new(Bytes::from(word), posting.encode()))
    });
    Ok(Box::new(iter))
}

pub fn reduce(key: &Bytes, values: Values<'_, Bytes>, aux: &Bytes) -> Result<Vec<ByteKeyValue>> {
    let args = Args::try_parse_from(args_from_aux(aux)?)?;
    let word = string_from_bytes(key.clone())?;
    let postings = values
        .map(|value| Posting::decode(value.clone()))
        .collect::<Result<Vec<_>>>()?;
    let doc_freq = postings.len() as u64;

    Ok(postings
        .into_iter()
        .map(|posting| {
            let score = tf_idf(posting.tf, posting.total, args.total_docs, doc_freq);
            let line = format!("{}\t{}\t{}\n", posting.review_id, word, score);
            KeyValue::new(Bytes::from(posting.review_id), Bytes::from(line))
        })
        .collect())
}
