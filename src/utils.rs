//! Helpers shared by the bundled workloads and the standalone runner.

use anyhow::{ensure, Result};
use bytes::{Buf, Bytes};

/// Read an entire [`Bytes`] slice into a [`String`].
///
/// Returns an error if the slice contains invalid UTF-8.
pub fn string_from_bytes(buf: Bytes) -> Result<String> {
    Ok(String::from_utf8(buf.as_ref().into())?)
}

/// Convert a [`String`] to [`Bytes`].
#[inline]
pub fn string_to_bytes(s: String) -> Bytes {
    Bytes::from(s)
}

/// Decode the workload arguments carried in a job's auxiliary bytes.
///
/// The runner serializes them as a JSON array of strings. Empty bytes mean
/// no arguments.
pub fn args_from_aux(aux: &Bytes) -> Result<Vec<String>> {
    if aux.is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_slice(aux)?)
}

/// Encode workload arguments into auxiliary bytes.
pub fn args_to_aux(args: &[String]) -> Result<Bytes> {
    Ok(Bytes::from(serde_json::to_vec(args)?))
}

/// Read a big-endian `u64` off the front of `buf`, failing instead of
/// panicking when fewer than 8 bytes are left.
pub fn read_u64(buf: &mut Bytes) -> Result<u64> {
    ensure!(
        buf.remaining() >= 8,
        "expected 8 bytes for a u64, found {}",
        buf.remaining()
    );
    Ok(buf.get_u64())
}
