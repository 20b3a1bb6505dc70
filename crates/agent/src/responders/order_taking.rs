//! Stateful order-taking. A structured extraction call pulls item mentions
//! out of the latest turn; everything that changes the order is deterministic
//! from there: the tiered catalog matcher validates every mention, lines
//! merge by item identity, and checkout movement requires the phrase
//! detectors over the raw text, never the model signal alone.

use std::sync::Arc;

use barista_core::orders::{
    derive_state, detects_affirmation, detects_completion, merge_line, order_total, summarize,
    OrderState,
};
use barista_core::{
    transcript_tail, AgentTag, ConversationTurn, GatewayError, Memory, MenuCatalog, MenuMatch,
    PipelineError, Role,
};
use serde::Deserialize;
use tracing::debug;

use crate::gateway::ModelGateway;

#[derive(Debug, Default, Deserialize)]
struct OrderExtraction {
    #[serde(default)]
    items: Vec<MentionedItem>,
    #[serde(default)]
    wants_to_finish: bool,
}

#[derive(Debug, Deserialize)]
struct MentionedItem {
    item: String,
    #[serde(default)]
    quantity: Option<i64>,
}

pub struct OrderOutcome {
    pub message: String,
    pub memory: Memory,
    pub state: OrderState,
}

pub struct OrderTakingResponder {
    gateway: Arc<ModelGateway>,
    catalog: Arc<MenuCatalog>,
}

impl OrderTakingResponder {
    pub fn new(gateway: Arc<ModelGateway>, catalog: Arc<MenuCatalog>) -> Self {
        Self { gateway, catalog }
    }

    pub async fn take_order(
        &self,
        turns: &[ConversationTurn],
        memory: &Memory,
    ) -> Result<OrderOutcome, PipelineError> {
        let mut next = memory.clone();
        next.agent = AgentTag::OrderTaking;

        // A transcript that does not end with a fresh user turn carries no
        // new content; re-processing it must not touch the order.
        let Some(last) = turns.last().filter(|turn| turn.role == Role::User) else {
            let state = derive_state(next.order_is_empty(), next.pending_confirmation, false);
            return Ok(OrderOutcome {
                message: "Is there anything else I can add to your order?".to_string(),
                memory: next,
                state,
            });
        };
        let user_text = last.content.as_str();

        // Checkout handoff: only the deterministic affirmation detector can
        // complete an order that is awaiting confirmation.
        if next.pending_confirmation && detects_affirmation(user_text) {
            let state = derive_state(next.order_is_empty(), true, true);
            if state == OrderState::HandedOff {
                let message = format!(
                    "Wonderful! Your order is on its way to checkout: {}. Total ${:.2}.",
                    summarize(&next.order),
                    order_total(&next.order)
                );
                next.pending_confirmation = false;
                return Ok(OrderOutcome { message, memory: next, state });
            }
        }

        let extraction = self.extract(turns).await?;

        let mut added: Vec<(String, u32)> = Vec::new();
        let mut ambiguous: Vec<(String, Vec<String>)> = Vec::new();
        let mut unknown: Vec<String> = Vec::new();

        for mention in &extraction.items {
            let quantity = normalize_quantity(mention.quantity);
            match self.catalog.resolve(&mention.item) {
                MenuMatch::Unique(menu_item) => {
                    merge_line(&mut next.order, menu_item, quantity);
                    added.push((menu_item.name.clone(), quantity));
                }
                MenuMatch::Ambiguous(candidates) => ambiguous.push((
                    mention.item.clone(),
                    candidates.iter().map(|item| item.name.clone()).collect(),
                )),
                MenuMatch::NoMatch => unknown.push(mention.item.clone()),
            }
        }

        // The model's finish signal and the keyword detector each may open
        // the confirmation step; neither can finalize on its own.
        let wants_to_finish = extraction.wants_to_finish || detects_completion(user_text);
        if wants_to_finish && !next.order.is_empty() {
            next.pending_confirmation = true;
        } else if !added.is_empty() {
            next.pending_confirmation = false;
        }

        let state =
            derive_state(next.order_is_empty(), next.pending_confirmation, false);
        let message = self.compose_reply(&next, &added, &ambiguous, &unknown, state);
        Ok(OrderOutcome { message, memory: next, state })
    }

    async fn extract(&self, turns: &[ConversationTurn]) -> Result<OrderExtraction, PipelineError> {
        let prompt = extraction_prompt(turns, &self.catalog.item_names());
        match self.gateway.complete_structured::<OrderExtraction>(&prompt).await {
            Ok(extraction) => Ok(extraction),
            // Safe fallback: an unparseable extraction behaves like "nothing
            // was understood", which flows into the clarification path below.
            Err(GatewayError::MalformedOutput { .. }) => {
                debug!(
                    event_name = "pipeline.order.extraction_fallback",
                    "extraction output unusable, asking the customer to restate"
                );
                Ok(OrderExtraction::default())
            }
            Err(error) => Err(error.into()),
        }
    }

    fn compose_reply(
        &self,
        memory: &Memory,
        added: &[(String, u32)],
        ambiguous: &[(String, Vec<String>)],
        unknown: &[String],
        state: OrderState,
    ) -> String {
        let mut parts: Vec<String> = Vec::new();

        if !added.is_empty() {
            let listed = added
                .iter()
                .map(|(name, quantity)| format!("{quantity} x {name}"))
                .collect::<Vec<_>>()
                .join(", ");
            parts.push(format!("I've added {listed} to your order."));
        }

        for (mention, candidates) in ambiguous {
            parts.push(format!(
                "For \"{mention}\", did you mean {}?",
                candidates.join(" or ")
            ));
        }

        for mention in unknown {
            parts.push(format!(
                "I couldn't find \"{mention}\" on our menu. Could you pick something else?"
            ));
        }

        match state {
            OrderState::AwaitingConfirmation => {
                parts.push(format!(
                    "Here's your order so far: {}. Total ${:.2}. Shall I place it?",
                    summarize(&memory.order),
                    order_total(&memory.order)
                ));
            }
            OrderState::Empty if parts.is_empty() => {
                parts.push("What would you like to order today?".to_string());
            }
            OrderState::Empty => {}
            OrderState::Building => {
                if parts.is_empty() {
                    parts.push(
                        "I didn't catch any new items. Could you tell me again what you'd like?"
                            .to_string(),
                    );
                } else if ambiguous.is_empty() && unknown.is_empty() {
                    parts.push("Anything else for you?".to_string());
                }
            }
            OrderState::HandedOff => {}
        }

        parts.join(" ")
    }
}

fn normalize_quantity(quantity: Option<i64>) -> u32 {
    match quantity {
        Some(value) if value > 0 => u32::try_from(value).unwrap_or(1),
        _ => 1,
    }
}

fn extraction_prompt(turns: &[ConversationTurn], menu_names: &[&str]) -> String {
    format!(
        "You take coffee shop orders. From the latest customer message, extract \
         every mentioned menu item with its quantity, and whether the customer \
         wants to finish the order. Use only these menu names as vocabulary when \
         the mention clearly maps to one; otherwise repeat the customer's own words.\n\n\
         Menu: {}\n\nConversation:\n{}\n\n\
         Respond with ONLY a JSON object: \
         {{\"items\": [{{\"item\": <string>, \"quantity\": <integer>}}], \
         \"wants_to_finish\": <bool>}}. \
         An empty items list is valid when no item is mentioned.",
        menu_names.join(", "),
        transcript_tail(turns, 6)
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use barista_core::orders::OrderState;
    use barista_core::{AgentTag, ConversationTurn, Memory, MenuCatalog, MenuItem, OrderLine};

    use super::OrderTakingResponder;
    use crate::gateway::ModelGateway;
    use crate::testing::ScriptedModel;

    fn catalog() -> Arc<MenuCatalog> {
        Arc::new(MenuCatalog::new(vec![
            item("Latte", 4.75),
            item("Cappuccino", 4.50),
            item("Croissant", 3.25),
            item("Chocolate Croissant", 3.75),
            item("Blueberry Muffin", 3.00),
        ]))
    }

    fn item(name: &str, price: f64) -> MenuItem {
        MenuItem {
            name: name.to_string(),
            price,
            category: "menu".to_string(),
            description: String::new(),
        }
    }

    fn responder(replies: Vec<&str>) -> (OrderTakingResponder, Arc<ScriptedModel>) {
        let model = Arc::new(ScriptedModel::new(
            replies.into_iter().map(|reply| Ok(reply.to_string())).collect(),
        ));
        let gateway = Arc::new(
            ModelGateway::new(model.clone(), 0, 3).with_backoff(Duration::from_millis(1)),
        );
        (OrderTakingResponder::new(gateway, catalog()), model)
    }

    #[tokio::test]
    async fn two_lattes_land_in_an_empty_order() {
        let (responder, _) = responder(vec![
            r#"{"items": [{"item": "latte", "quantity": 2}], "wants_to_finish": false}"#,
        ]);

        let outcome = responder
            .take_order(&[ConversationTurn::user("I'd like 2 lattes")], &Memory::default())
            .await
            .expect("order should succeed");

        assert_eq!(
            outcome.memory.order,
            vec![OrderLine { item: "Latte".to_string(), price: 4.75, quantity: 2 }]
        );
        assert_eq!(outcome.memory.agent, AgentTag::OrderTaking);
        assert_eq!(outcome.state, OrderState::Building);
        assert!(outcome.message.contains("2 x Latte"));
    }

    #[tokio::test]
    async fn unknown_item_changes_nothing_and_asks_for_clarification() {
        let (responder, _) = responder(vec![
            r#"{"items": [{"item": "dragonfruit elixir", "quantity": 2}], "wants_to_finish": false}"#,
        ]);

        let outcome = responder
            .take_order(
                &[ConversationTurn::user("I'd like 2 dragonfruit elixirs")],
                &Memory::default(),
            )
            .await
            .expect("turn should succeed");

        assert!(outcome.memory.order_is_empty());
        assert!(outcome.message.contains("dragonfruit elixir"));
        assert!(outcome.message.contains("couldn't find"));
    }

    #[tokio::test]
    async fn ambiguous_mention_is_never_guessed() {
        let (responder, _) = responder(vec![
            r#"{"items": [{"item": "chocolate muffin", "quantity": 1}], "wants_to_finish": false}"#,
        ]);

        let outcome = responder
            .take_order(&[ConversationTurn::user("a chocolate muffin please")], &Memory::default())
            .await
            .expect("turn should succeed");

        assert!(outcome.memory.order_is_empty());
        assert!(outcome.message.contains("did you mean"));
        assert!(outcome.message.contains("Chocolate Croissant"));
        assert!(outcome.message.contains("Blueberry Muffin"));
    }

    #[tokio::test]
    async fn repeated_item_merges_instead_of_duplicating() {
        let (responder, _) = responder(vec![
            r#"{"items": [{"item": "latte", "quantity": 1}], "wants_to_finish": false}"#,
        ]);
        let memory = Memory {
            agent: AgentTag::OrderTaking,
            order: vec![OrderLine { item: "Latte".to_string(), price: 4.75, quantity: 2 }],
            pending_confirmation: false,
        };

        let outcome = responder
            .take_order(
                &[
                    ConversationTurn::user("2 lattes"),
                    ConversationTurn::assistant("Added."),
                    ConversationTurn::user("one more latte"),
                ],
                &memory,
            )
            .await
            .expect("turn should succeed");

        assert_eq!(outcome.memory.order.len(), 1);
        assert_eq!(outcome.memory.order[0].quantity, 3);
    }

    #[tokio::test]
    async fn identical_resubmission_yields_an_identical_order() {
        // A timed-out client retries with the exact same transcript and
        // memory; the second pass must not double the lines.
        let reply = r#"{"items": [{"item": "latte", "quantity": 2}], "wants_to_finish": false}"#;
        let (responder, _) = responder(vec![reply, reply]);
        let turns = vec![ConversationTurn::user("I'd like 2 lattes")];
        let memory = Memory::default();

        let first = responder.take_order(&turns, &memory).await.expect("first pass");
        let second = responder.take_order(&turns, &memory).await.expect("second pass");

        assert_eq!(first.memory.order, second.memory.order);
        assert_eq!(second.memory.order.len(), 1);
        assert_eq!(second.memory.order[0].quantity, 2);
    }

    #[tokio::test]
    async fn thats_all_moves_to_awaiting_confirmation() {
        let (responder, _) =
            responder(vec![r#"{"items": [], "wants_to_finish": true}"#]);
        let memory = Memory {
            agent: AgentTag::OrderTaking,
            order: vec![OrderLine { item: "Latte".to_string(), price: 4.75, quantity: 1 }],
            pending_confirmation: false,
        };

        let outcome = responder
            .take_order(
                &[
                    ConversationTurn::user("a latte please"),
                    ConversationTurn::assistant("Added."),
                    ConversationTurn::user("that's all"),
                ],
                &memory,
            )
            .await
            .expect("turn should succeed");

        assert_eq!(outcome.state, OrderState::AwaitingConfirmation);
        assert!(outcome.memory.pending_confirmation);
        assert_eq!(outcome.memory.order, memory.order);
        assert!(outcome.message.contains("Latte x1"));
        assert!(outcome.message.contains("Shall I place it?"));
    }

    #[tokio::test]
    async fn affirmation_after_summary_hands_off_without_a_model_call() {
        let (responder, model) = responder(vec![]);
        let memory = Memory {
            agent: AgentTag::OrderTaking,
            order: vec![OrderLine { item: "Latte".to_string(), price: 4.75, quantity: 1 }],
            pending_confirmation: true,
        };

        let outcome = responder
            .take_order(
                &[
                    ConversationTurn::user("that's all"),
                    ConversationTurn::assistant("Shall I place it?"),
                    ConversationTurn::user("yes please"),
                ],
                &memory,
            )
            .await
            .expect("turn should succeed");

        assert_eq!(outcome.state, OrderState::HandedOff);
        assert_eq!(outcome.memory.order, memory.order);
        assert_eq!(model.completion_calls(), 0);
        assert!(outcome.message.contains("checkout"));
    }

    #[tokio::test]
    async fn stale_transcript_with_no_new_user_turn_is_a_no_op() {
        let (responder, model) = responder(vec![]);
        let memory = Memory {
            agent: AgentTag::OrderTaking,
            order: vec![OrderLine { item: "Latte".to_string(), price: 4.75, quantity: 2 }],
            pending_confirmation: false,
        };

        let outcome = responder
            .take_order(
                &[
                    ConversationTurn::user("2 lattes"),
                    ConversationTurn::assistant("I've added 2 x Latte to your order."),
                ],
                &memory,
            )
            .await
            .expect("turn should succeed");

        assert_eq!(outcome.memory.order, memory.order);
        assert_eq!(model.completion_calls(), 0);
    }

    #[tokio::test]
    async fn extraction_repair_exhaustion_asks_to_restate() {
        let (responder, _) = responder(vec!["latte I guess", "no json", "still none"]);

        let outcome = responder
            .take_order(&[ConversationTurn::user("uh, the usual")], &Memory::default())
            .await
            .expect("fallback should succeed");

        assert!(outcome.memory.order_is_empty());
        assert!(outcome.message.contains("What would you like to order"));
    }

    #[tokio::test]
    async fn empty_turn_with_empty_order_asks_open_question() {
        let (responder, _) =
            responder(vec![r#"{"items": [], "wants_to_finish": false}"#]);

        let outcome = responder
            .take_order(&[ConversationTurn::user("hi there")], &Memory::default())
            .await
            .expect("turn should succeed");

        assert_eq!(outcome.state, OrderState::Empty);
        assert!(outcome.message.contains("What would you like to order"));
    }
}
