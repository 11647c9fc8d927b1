//! A MapReduce-compatible implementation of word count.
//!
//! Values are big-endian `u64` counts, so the same function serves as
//! combiner and as the first half of the reducer.

use anyhow::Result;
use bytes::{BufMut, Bytes, BytesMut};

use crate::utils::read_u64;
use crate::*;

pub fn map(kv: &ByteKeyValue, _aux: &Bytes) -> MapOutput<Bytes, Bytes> {
    let s = String::from_utf8(kv.value.as_ref().into())?;
    let words = s
        .split(|c: char| !c.is_alphabetic())
        .filter(|s| !s.is_empty())
        .map(|word| word.to_lowercase())
        .collect::<Vec<_>>();

    let mut key_buf = BytesMut::new();
    let mut value_buf = BytesMut::with_capacity(words.len() * 8);

    let iter = words.into_iter().map(move |word| {
        key_buf.put_slice(word.as_bytes());
        value_buf.put_u64(1);

        let key = key_buf.split().freeze();
        let value = value_buf.split().freeze();

        Ok(KeyValue { key, value })
    });
    Ok(Box::new(iter))
}

/// Folds one split's counts for a word into a single count.
pub fn combine(key: &Bytes, values: Values<'_, Bytes>, _aux: &Bytes) -> Result<Vec<ByteKeyValue>> {
    let count = total(values)?;
    let mut value = BytesMut::with_capacity(8);
    value.put_u64(count);
    Ok(vec![KeyValue::new(key.clone(), value.freeze())])
}

pub fn reduce(key: &Bytes, values: Values<'_, Bytes>, _aux: &Bytes) -> Result<Vec<ByteKeyValue>> {
    let count = total(values)?;
    let word = String::from_utf8(key.to_vec())?;
    let line = Bytes::from(format!("{} {}\n", word, count));
    Ok(vec![KeyValue::new(key.clone(), line)])
}

fn total(values: Values<'_, Bytes>) -> Result<u64> {
    values.map(|value| read_u64(&mut value.clone())).sum()
}
