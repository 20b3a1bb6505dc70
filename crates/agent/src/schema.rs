//! Schema-constrained completions with a validate-or-repair loop.
//!
//! Every structured call site declares its expected shape as a serde type.
//! The raw completion is searched for a JSON object (models wrap replies in
//! code fences and prose), deserialized, and on failure the model is
//! re-prompted with its own validation error, up to a hard attempt bound.
//! Invalid structured data never passes through to a caller.

use barista_core::GatewayError;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::gateway::ModelGateway;

impl ModelGateway {
    /// Completion that must parse as `T`. Repair attempts quote the previous
    /// reply and the validation error; exhaustion is `MalformedOutput`.
    pub async fn complete_structured<T: DeserializeOwned>(
        &self,
        prompt: &str,
    ) -> Result<T, GatewayError> {
        let mut last_error = String::new();
        let mut next_prompt = prompt.to_string();

        for attempt in 0..self.max_repair_attempts {
            let raw = self.complete(&next_prompt).await?;
            match parse_structured::<T>(&raw) {
                Ok(value) => return Ok(value),
                Err(error) => {
                    debug!(
                        event_name = "gateway.schema.repair",
                        attempt,
                        error = %error,
                        "structured output failed validation"
                    );
                    last_error = error;
                    next_prompt = repair_prompt(prompt, &raw, &last_error);
                }
            }
        }

        Err(GatewayError::MalformedOutput {
            attempts: self.max_repair_attempts,
            last_error,
        })
    }
}

fn parse_structured<T: DeserializeOwned>(raw: &str) -> Result<T, String> {
    let candidate = extract_json_object(raw)
        .ok_or_else(|| "reply contains no JSON object".to_string())?;
    serde_json::from_str::<T>(candidate).map_err(|error| error.to_string())
}

/// Slice from the first `{` to its matching `}`, tolerating code fences and
/// surrounding prose. String-aware so braces inside values do not confuse
/// the depth count.
pub(crate) fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in raw[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&raw[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

fn repair_prompt(original: &str, previous_reply: &str, error: &str) -> String {
    format!(
        "{original}\n\nYour previous reply could not be used.\n\
         Reply:\n{previous_reply}\n\nValidation error: {error}\n\
         Respond again with ONLY a corrected JSON object matching the requested shape, \
         with no code fences and no commentary."
    )
}
