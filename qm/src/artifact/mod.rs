//! Artifact decoding
//!
//! Turns a model's textual response into structured artifacts. Models are
//! asked for a single JSON object but often wrap it in prose or code fences,
//! so decoding is tolerant: strict parse first, then the substring between
//! the first `{` and the last `}`, then an explicit failure.

mod parser;

pub use parser::{ArtifactResponse, DecodeError, decode, decode_response};
