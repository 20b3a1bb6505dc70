//! Safety and topicality gate. Runs before anything else and fails closed:
//! a guard that cannot produce a valid decision blocks the turn instead of
//! widening the allowed surface.

use barista_core::{transcript_tail, ConversationTurn};
use serde::Deserialize;
use tracing::warn;

use crate::gateway::ModelGateway;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct GuardDecision {
    pub allowed: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

pub struct GuardStage<'a> {
    gateway: &'a ModelGateway,
}

impl<'a> GuardStage<'a> {
    pub fn new(gateway: &'a ModelGateway) -> Self {
        Self { gateway }
    }

    pub async fn check(&self, turns: &[ConversationTurn]) -> GuardDecision {
        let prompt = guard_prompt(turns);
        match self.gateway.complete_structured::<GuardDecision>(&prompt).await {
            Ok(decision) => decision,
            Err(error) => {
                warn!(
                    event_name = "pipeline.guard.fail_closed",
                    error = %error,
                    "guard classification failed, blocking the turn"
                );
                GuardDecision { allowed: false, reason: Some("guard_unavailable".to_string()) }
            }
        }
    }
}

fn guard_prompt(turns: &[ConversationTurn]) -> String {
    format!(
        "You are the safety gate of a coffee shop assistant. Decide whether the \
         latest customer message is appropriate to answer: it must relate to the \
         shop, its products, orders, or recommendations, and must not request \
         anything harmful or offensive.\n\nConversation:\n{}\n\n\
         Respond with ONLY a JSON object: {{\"allowed\": <bool>, \"reason\": <string or null>}}.",
        transcript_tail(turns, 6)
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use barista_core::{ConversationTurn, GatewayError};

    use super::GuardStage;
    use crate::gateway::ModelGateway;
    use crate::testing::ScriptedModel;

    fn turns() -> Vec<ConversationTurn> {
        vec![ConversationTurn::user("what pastries do you have?")]
    }

    #[tokio::test]
    async fn valid_allow_decision_passes_through() {
        let model = Arc::new(ScriptedModel::new(vec![Ok(
            r#"{"allowed": true, "reason": null}"#.to_string()
        )]));
        let gateway = ModelGateway::new(model, 0, 3).with_backoff(Duration::from_millis(1));

        let decision = GuardStage::new(&gateway).check(&turns()).await;
        assert!(decision.allowed);
    }

    #[tokio::test]
    async fn repair_exhaustion_fails_closed() {
        let model = Arc::new(ScriptedModel::new(vec![
            Ok("sure, that seems fine".to_string()),
            Ok("fine".to_string()),
            Ok("ok".to_string()),
        ]));
        let gateway = ModelGateway::new(model, 0, 3).with_backoff(Duration::from_millis(1));

        let decision = GuardStage::new(&gateway).check(&turns()).await;
        assert!(!decision.allowed);
        assert_eq!(decision.reason.as_deref(), Some("guard_unavailable"));
    }

    #[tokio::test]
    async fn upstream_outage_fails_closed() {
        let model = Arc::new(ScriptedModel::new(vec![Err(GatewayError::Unavailable {
            message: "down".to_string(),
        })]));
        let gateway = ModelGateway::new(model, 0, 3).with_backoff(Duration::from_millis(1));

        let decision = GuardStage::new(&gateway).check(&turns()).await;
        assert!(!decision.allowed);
    }
}
