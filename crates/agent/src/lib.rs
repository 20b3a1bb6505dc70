//! Model-facing side of the Barista assistant: the provider gateway with
//! schema-constrained calls, the vector retriever client, and the turn
//! pipeline (guard, intent routing, responders). The deterministic domain
//! rules it enforces live in `barista-core`.

pub mod classify;
pub mod gateway;
pub mod guard;
pub mod pipeline;
pub mod responders;
pub mod retrieval;
pub mod schema;

#[cfg(test)]
pub(crate) mod testing;

pub use gateway::{ModelClient, ModelGateway};
pub use pipeline::{PipelineController, PipelineReply, DECLINE_TEXT};
pub use retrieval::{HttpRetriever, Retriever};
