use serde::{Deserialize, Serialize};

/// Responder that produced the previous assistant turn. Round-tripped by the
/// client so routing can stay sticky across turns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentTag {
    #[default]
    None,
    Details,
    OrderTaking,
    Recommendation,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub item: String,
    pub price: f64,
    pub quantity: u32,
}

/// Client-carried conversational state. The pipeline is stateless; whatever
/// the next turn needs must live here and come back unmodified.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    #[serde(default)]
    pub agent: AgentTag,
    #[serde(default)]
    pub order: Vec<OrderLine>,
    /// Set once the customer signaled completion and the assistant asked for
    /// a final confirmation. Absent in payloads from older clients.
    #[serde(default)]
    pub pending_confirmation: bool,
}

impl Memory {
    pub fn with_agent(mut self, agent: AgentTag) -> Self {
        self.agent = agent;
        self
    }

    pub fn order_is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn order_item_names(&self) -> Vec<&str> {
        self.order.iter().map(|line| line.item.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{AgentTag, Memory};

    #[test]
    fn legacy_payload_without_new_fields_deserializes() {
        let memory: Memory = serde_json::from_str(r#"{"agent":"order_taking","order":[]}"#)
            .expect("legacy memory should parse");
        assert_eq!(memory.agent, AgentTag::OrderTaking);
        assert!(!memory.pending_confirmation);
    }

    #[test]
    fn empty_object_defaults_to_no_agent() {
        let memory: Memory = serde_json::from_str("{}").expect("empty memory should parse");
        assert_eq!(memory.agent, AgentTag::None);
        assert!(memory.order_is_empty());
    }
}
