use std::path::PathBuf;

use thiserror::Error;

/// Failures talking to the hosted model, embedding, or retrieval endpoints.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("model output failed schema validation after {attempts} attempts: {last_error}")]
    MalformedOutput { attempts: u32, last_error: String },
    #[error("upstream service unavailable: {message}")]
    Unavailable { message: String },
}

/// Failures loading the static data files (menu, recommendation tables).
#[derive(Debug, Error)]
pub enum DataError {
    #[error("could not read data file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse data file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: serde_json::Error },
    #[error("data file `{path}` is empty")]
    EmptyFile { path: PathBuf },
}

/// Anything that can stop the pipeline from producing a routed answer.
/// The controller converts every variant into a user-safe reply.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("conversation contains no user turn")]
    EmptyConversation,
}

impl PipelineError {
    /// Natural-language reply sent instead of the internal error. Nothing in
    /// the taxonomy may ever reach the conversational surface verbatim.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Gateway(_) => {
                "Sorry, I ran into a problem on my end. Could you try that again in a moment?"
            }
            Self::EmptyConversation => "I didn't catch a message there. What can I get for you?",
        }
    }
}
