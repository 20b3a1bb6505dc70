//! Domain core for the Barista storefront assistant: conversation and
//! memory types, the menu catalog with its tiered matcher, the order state
//! machine, precomputed recommendation tables, configuration, and the error
//! taxonomy. Everything here is deterministic and free of network I/O; the
//! model-facing plumbing lives in `barista-agent`.

pub mod catalog;
pub mod config;
pub mod domain;
pub mod errors;
pub mod orders;
pub mod recommend;

pub use catalog::{MenuCatalog, MenuMatch};
pub use domain::{
    latest_user_turn, transcript_tail, AgentTag, ConversationTurn, Memory, MenuItem, OrderLine,
    RetrievedPassage, Role,
};
pub use errors::{DataError, GatewayError, PipelineError};
pub use orders::{
    derive_state, detects_affirmation, detects_completion, merge_line, order_total, summarize,
    OrderState,
};
pub use recommend::{AssociationRule, PopularityEntry, RecommendationTables};
