//! Order lifecycle for the order-taking responder.
//!
//! There is no server-side session: the state is reconstructed every turn
//! from the client-carried memory plus two deterministic phrase detectors
//! over the raw user text. A model signal alone never finalizes an order.

use serde::{Deserialize, Serialize};

use crate::domain::{MenuItem, OrderLine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderState {
    Empty,
    Building,
    AwaitingConfirmation,
    HandedOff,
}

/// Reconstruct the current state from client-carried facts.
pub fn derive_state(
    order_is_empty: bool,
    pending_confirmation: bool,
    confirmed_now: bool,
) -> OrderState {
    if order_is_empty {
        return OrderState::Empty;
    }
    if pending_confirmation && confirmed_now {
        return OrderState::HandedOff;
    }
    if pending_confirmation {
        return OrderState::AwaitingConfirmation;
    }
    OrderState::Building
}

const COMPLETION_PHRASES: &[&str] = &[
    "that's all",
    "that is all",
    "that'll be all",
    "that will be all",
    "that's it",
    "that is it",
    "nothing else",
    "i'm done",
    "im done",
    "ready to check out",
    "ready to checkout",
    "i'll check out",
    "checkout please",
    "complete my order",
    "finish my order",
    "place my order",
];

/// Keyword backstop for "the customer wants to finish". Runs on the raw user
/// text, independent of the extraction call, so a hallucinated finish signal
/// cannot move the order toward checkout on its own.
pub fn detects_completion(text: &str) -> bool {
    let normalized = text.to_lowercase();
    COMPLETION_PHRASES.iter().any(|phrase| normalized.contains(phrase))
}

const AFFIRMATION_PHRASES: &[&str] = &[
    "yes",
    "yep",
    "yeah",
    "sure",
    "correct",
    "confirm",
    "go ahead",
    "place it",
    "that's right",
    "sounds good",
    "looks good",
];

/// Whether a turn answers the final "shall I place this order?" question.
pub fn detects_affirmation(text: &str) -> bool {
    let normalized = text.to_lowercase();
    let normalized = normalized.trim().trim_end_matches(['.', '!']);
    AFFIRMATION_PHRASES
        .iter()
        .any(|phrase| normalized == *phrase || normalized.starts_with(&format!("{phrase} ")))
}

/// Merge a validated line into the order, keyed by item identity: an item
/// already present grows its quantity, never duplicates as a second line.
pub fn merge_line(order: &mut Vec<OrderLine>, item: &MenuItem, quantity: u32) {
    let quantity = quantity.max(1);
    match order.iter_mut().find(|line| line.item == item.name) {
        Some(existing) => existing.quantity += quantity,
        None => order.push(OrderLine {
            item: item.name.clone(),
            price: item.price,
            quantity,
        }),
    }
}

pub fn order_total(order: &[OrderLine]) -> f64 {
    order.iter().map(|line| line.price * f64::from(line.quantity)).sum()
}

/// One line per item, used in the confirmation summary.
pub fn summarize(order: &[OrderLine]) -> String {
    order
        .iter()
        .map(|line| format!("{} x{} (${:.2})", line.item, line.quantity, line.price))
        .collect::<Vec<_>>()
        .join(", ")
}
