//! A MapReduce-compatible implementation of `grep`.
//!
//! Takes `--term <text>` as a workload argument. Output is one
//! `file:line:: text` line per match, in line order within each file.

use anyhow::Result;
use bytes::{BufMut, Bytes, BytesMut};
use clap::Parser;

use crate::utils::{args_from_aux, read_u64, string_from_bytes};
use crate::*;

#[derive(Parser, Debug)]
#[clap(no_binary_name = true)]
struct Args {
    #[clap(short, long, value_parser)]
    term: String,
}

#[allow(clippy::needless_collect)]
pub fn map(kv: &ByteKeyValue, aux: &Bytes) -> MapOutput<Bytes, Bytes> {
    let args = Args::try_parse_from(args_from_aux(aux)?)?;
    let term = args.term;

    let s = String::from_utf8(kv.value.as_ref().into())?;
    let lines = s
        .lines()
        .enumerate()
        .filter(|(_, s)| s.contains(&term))
        .map(|(i, s)| (i + 1, s.to_string()))
        .collect::<Vec<_>>();

    let filename = kv.key();
    let mut value_buf = BytesMut::new();

    let iter = lines.into_iter().map(move |(line_num, line)| {
        value_buf.put_u64(line_num as u64);
        value_buf.put(line.as_bytes());

        let value = value_buf.split().freeze();

        Ok(KeyValue {
            key: filename.clone(),
            value,
        })
    });
    Ok(Box::new(iter))
}

pub fn reduce(key: &Bytes, values: Values<'_, Bytes>, _aux: &Bytes) -> Result<Vec<ByteKeyValue>> {
    let filename = string_from_bytes(key.clone())?;
    let mut matches = values
        .map(|value| -> Result<(u64, Bytes)> {
            let mut value = value.clone();
            let line_no = read_u64(&mut value)?;
            Ok((line_no, value))
        })
        .collect::<Result<Vec<_>>>()?;
    matches.sort_by_key(|(line_no, _)| *line_no);

    matches
        .into_iter()
        .map(|(line_no, line)| -> Result<ByteKeyValue> {
            let line = string_from_bytes(line)?;
            let out = format!("{}:{}:: {}\n", filename, line_no, line);
            Ok(KeyValue::new(key.clone(), Bytes::from(out)))
        })
        .collect()
}
