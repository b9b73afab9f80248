//! Tolerant JSON decoder for model responses

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::{ArtifactPair, RepairProposal};

/// Errors from decoding a model response
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("no JSON object found in response ({len} chars)")]
    NoObject { len: usize },

    #[error("malformed JSON object in response: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Fields a model response may carry
///
/// Every field is optional: generation responses carry only `domain` and
/// `problem`, repair responses add `explanation`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ArtifactResponse {
    pub domain: Option<String>,
    pub problem: Option<String>,
    pub explanation: Option<String>,
}

impl ArtifactResponse {
    /// Artifacts from this response, missing documents left empty
    pub fn into_artifacts(self) -> ArtifactPair {
        ArtifactPair::new(self.domain.unwrap_or_default(), self.problem.unwrap_or_default())
    }

    /// A proposal from this response, missing fields taken from `fallback`
    pub fn into_proposal(self, fallback: &ArtifactPair, fallback_explanation: &str) -> RepairProposal {
        debug!(
            has_domain = self.domain.is_some(),
            has_problem = self.problem.is_some(),
            has_explanation = self.explanation.is_some(),
            "ArtifactResponse::into_proposal: called"
        );
        let artifacts = ArtifactPair::new(
            self.domain.unwrap_or_else(|| fallback.domain.clone()),
            self.problem.unwrap_or_else(|| fallback.problem.clone()),
        );
        let explanation = self
            .explanation
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| fallback_explanation.to_string());
        RepairProposal::new(artifacts, explanation)
    }
}

/// Parse `text` as a JSON object carrying artifact fields
///
/// Arrays and scalars are rejected even though serde would map a sequence
/// onto the struct positionally.
fn parse_object(text: &str) -> Result<ArtifactResponse, serde_json::Error> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    if !value.is_object() {
        return Err(<serde_json::Error as serde::de::Error>::custom("expected a JSON object"));
    }
    serde_json::from_value(value)
}

/// Decode a model response into its raw fields
///
/// Never guesses beyond the outermost braces: if neither the full text nor
/// the `{ ... }` slice parses, the second parse error is returned.
pub fn decode_response(raw: &str) -> Result<ArtifactResponse, DecodeError> {
    let text = raw.trim();
    debug!(len = text.len(), "decode_response: called");

    let first_error = match parse_object(text) {
        Ok(response) => {
            debug!("decode_response: strict parse succeeded");
            return Ok(response);
        }
        Err(e) => e,
    };
    debug!(error = %first_error, "decode_response: strict parse failed, scanning for object");

    let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) else {
        warn!("decode_response: no braces in response");
        return Err(DecodeError::NoObject { len: text.len() });
    };
    if end < start {
        warn!(start, end, "decode_response: braces out of order");
        return Err(DecodeError::NoObject { len: text.len() });
    }

    match parse_object(&text[start..=end]) {
        Ok(response) => {
            debug!(start, end, "decode_response: extracted object parsed");
            Ok(response)
        }
        Err(e) => {
            warn!(error = %e, "decode_response: extracted object still malformed");
            Err(DecodeError::Malformed(e))
        }
    }
}

/// Decode a model response into an artifact pair
pub fn decode(raw: &str) -> Result<ArtifactPair, DecodeError> {
    decode_response(raw).map(ArtifactResponse::into_artifacts)
}
