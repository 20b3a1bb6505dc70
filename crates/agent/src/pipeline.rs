//! Turn orchestration. One entry point takes the transcript plus the
//! client-carried memory and always comes back with a reply and the memory to
//! round-trip, no matter what failed underneath: the guard blocks, internal
//! errors apologize, and exactly one responder runs on the happy path.

use std::sync::Arc;

use barista_core::{
    latest_user_turn, AgentTag, ConversationTurn, Memory, MenuCatalog, PipelineError,
    RecommendationTables,
};
use tracing::{error, info};
use uuid::Uuid;

use crate::classify::{IntentClassifier, IntentLabel};
use crate::gateway::ModelGateway;
use crate::guard::GuardStage;
use crate::responders::{DetailsResponder, OrderTakingResponder, RecommendationResponder};
use crate::retrieval::Retriever;

/// Fixed reply for blocked turns. Deliberately free of any echo of the
/// blocked content.
pub const DECLINE_TEXT: &str =
    "I'm sorry, I can only help with our menu, orders, and recommendations. \
     Is there something from the shop I can get you?";

#[derive(Clone, Debug, PartialEq)]
pub struct PipelineReply {
    pub message: String,
    pub memory: Memory,
}

pub struct PipelineController {
    gateway: Arc<ModelGateway>,
    details: DetailsResponder,
    order_taking: OrderTakingResponder,
    recommendation: RecommendationResponder,
}

impl PipelineController {
    pub fn new(
        gateway: Arc<ModelGateway>,
        retriever: Arc<dyn Retriever>,
        catalog: Arc<MenuCatalog>,
        tables: Arc<RecommendationTables>,
        top_k: usize,
    ) -> Self {
        Self {
            details: DetailsResponder::new(gateway.clone(), retriever, top_k),
            order_taking: OrderTakingResponder::new(gateway.clone(), catalog),
            recommendation: RecommendationResponder::new(gateway.clone(), tables),
            gateway,
        }
    }

    /// Process one turn. Infallible by contract: every internal failure is
    /// converted into a safe conversational reply before it leaves here.
    pub async fn process(&self, turns: &[ConversationTurn], memory: &Memory) -> PipelineReply {
        let correlation_id = Uuid::new_v4();

        if latest_user_turn(turns).is_none() {
            return PipelineReply {
                message: PipelineError::EmptyConversation.user_message().to_string(),
                memory: memory.clone(),
            };
        }

        let decision = GuardStage::new(&self.gateway).check(turns).await;
        if !decision.allowed {
            info!(
                event_name = "pipeline.turn.blocked",
                %correlation_id,
                reason = decision.reason.as_deref().unwrap_or("unspecified"),
                "guard blocked the turn"
            );
            // The guard is not a responder; a blocked turn leaves the memory
            // envelope exactly as the client sent it.
            return PipelineReply { message: DECLINE_TEXT.to_string(), memory: memory.clone() };
        }

        let intent = match IntentClassifier::new(&self.gateway).classify(turns, memory).await {
            Ok(intent) => intent,
            Err(error) => {
                return self.apologize(correlation_id, "classify", error.into(), memory);
            }
        };

        info!(
            event_name = "pipeline.turn.routed",
            %correlation_id,
            intent = ?intent,
            "dispatching to responder"
        );

        match intent {
            IntentLabel::Details => match self.details.answer(turns).await {
                Ok(message) => PipelineReply {
                    message,
                    memory: memory.clone().with_agent(AgentTag::Details),
                },
                Err(error) => self.apologize(correlation_id, "details", error, memory),
            },
            IntentLabel::OrderTaking => match self.order_taking.take_order(turns, memory).await {
                Ok(outcome) => {
                    info!(
                        event_name = "pipeline.order.state",
                        %correlation_id,
                        state = ?outcome.state,
                        "order turn completed"
                    );
                    PipelineReply { message: outcome.message, memory: outcome.memory }
                }
                Err(error) => self.apologize(correlation_id, "order_taking", error, memory),
            },
            IntentLabel::Recommendation => {
                match self.recommendation.recommend(turns, memory).await {
                    Ok(outcome) => {
                        PipelineReply { message: outcome.message, memory: outcome.memory }
                    }
                    Err(error) => self.apologize(correlation_id, "recommendation", error, memory),
                }
            }
        }
    }

    fn apologize(
        &self,
        correlation_id: Uuid,
        stage: &str,
        error: PipelineError,
        memory: &Memory,
    ) -> PipelineReply {
        error!(
            event_name = "pipeline.turn.failed",
            %correlation_id,
            stage,
            error = %error,
            "responding with a safe apology"
        );
        PipelineReply { message: error.user_message().to_string(), memory: memory.clone() }
    }
}
