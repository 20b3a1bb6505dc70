//! The three responders the classifier can route to.

pub mod details;
pub mod order_taking;
pub mod recommend;

pub use details::DetailsResponder;
pub use order_taking::{OrderOutcome, OrderTakingResponder};
pub use recommend::{RecommendationOutcome, RecommendationResponder};
