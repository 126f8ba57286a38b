//! Pipeline document codec.
//!
//! The wire form and the local artifact share one encoding: pretty-printed
//! JSON with a trailing newline. Unknown fields travel in [`Pipeline::extra`]
//! so `decode(encode(decode(bytes)))` equals `decode(bytes)`.

use std::path::Path;

use serde::de::DeserializeOwned;

use crate::error::CodecError;
use crate::types::Pipeline;

/// Decode a pipeline document. Rejects documents whose `name` is empty.
pub fn decode(bytes: &[u8]) -> Result<Pipeline, CodecError> {
    let pipeline: Pipeline = serde_json::from_slice(bytes)?;
    validate(pipeline)
}

/// Encode a pipeline document to its wire / on-disk form.
pub fn encode(pipeline: &Pipeline) -> Result<Vec<u8>, CodecError> {
    let mut bytes = serde_json::to_vec_pretty(pipeline)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Encode to a `String`, for diffs and logs.
pub fn encode_string(pipeline: &Pipeline) -> Result<String, CodecError> {
    let mut text = serde_json::to_string_pretty(pipeline)?;
    text.push('\n');
    Ok(text)
}

/// Decode any registry payload (environment list, run history, ...).
pub fn decode_json<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Read and decode the local artifact at `path`.
///
/// Returns `CodecError::Io` if unreadable, `CodecError::Parse` (with path)
/// if malformed.
pub fn load_at(path: &Path) -> Result<Pipeline, CodecError> {
    let bytes = std::fs::read(path).map_err(|source| CodecError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let pipeline: Pipeline = serde_json::from_slice(&bytes).map_err(|source| CodecError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    validate(pipeline)
}

fn validate(pipeline: Pipeline) -> Result<Pipeline, CodecError> {
    if pipeline.name.0.trim().is_empty() {
        return Err(CodecError::MissingName);
    }
    Ok(pipeline)
}
