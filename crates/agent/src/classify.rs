//! Intent routing. One structured call chooses the responder; the label set
//! is closed. Order-taking stays sticky while an order is in progress so a
//! short follow-up ("and a croissant too") cannot drop the order context.

use barista_core::{transcript_tail, AgentTag, ConversationTurn, GatewayError, Memory};
use serde::Deserialize;
use tracing::debug;

use crate::gateway::ModelGateway;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentLabel {
    Details,
    OrderTaking,
    Recommendation,
}

#[derive(Debug, Deserialize)]
struct ClassifiedIntent {
    intent: IntentLabel,
    /// Set when the message unambiguously starts a new topic, which releases
    /// the sticky order-taking route.
    #[serde(default)]
    new_topic: bool,
}

pub struct IntentClassifier<'a> {
    gateway: &'a ModelGateway,
}

impl<'a> IntentClassifier<'a> {
    pub fn new(gateway: &'a ModelGateway) -> Self {
        Self { gateway }
    }

    /// Never fails on malformed output: repair exhaustion falls back to
    /// `Details`, the only label that cannot mutate order state. Transport
    /// outages still propagate so the controller can apologize.
    pub async fn classify(
        &self,
        turns: &[ConversationTurn],
        memory: &Memory,
    ) -> Result<IntentLabel, GatewayError> {
        let prompt = classification_prompt(turns);
        let classified = match self.gateway.complete_structured::<ClassifiedIntent>(&prompt).await
        {
            Ok(classified) => classified,
            Err(GatewayError::MalformedOutput { .. }) => {
                debug!(
                    event_name = "pipeline.classify.fallback",
                    "no valid intent label, defaulting to details"
                );
                ClassifiedIntent { intent: IntentLabel::Details, new_topic: false }
            }
            Err(error) => return Err(error),
        };

        let order_in_progress =
            memory.agent == AgentTag::OrderTaking && !memory.order_is_empty();
        if order_in_progress && !classified.new_topic {
            return Ok(IntentLabel::OrderTaking);
        }

        Ok(classified.intent)
    }
}

fn classification_prompt(turns: &[ConversationTurn]) -> String {
    format!(
        "Classify the latest customer message of a coffee shop conversation into \
         exactly one intent:\n\
         - \"details\": a question about products, ingredients, hours, or the shop\n\
         - \"order_taking\": adding, changing, or finishing an order\n\
         - \"recommendation\": asking what to get or what goes well together\n\n\
         Conversation:\n{}\n\n\
         Respond with ONLY a JSON object: \
         {{\"intent\": \"details\"|\"order_taking\"|\"recommendation\", \"new_topic\": <bool>}}. \
         Set \"new_topic\" to true only when the message clearly abandons the current subject.",
        transcript_tail(turns, 6)
    )
}
