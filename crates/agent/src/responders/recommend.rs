//! Recommendation responder. The model only picks which table to consult;
//! the recommended items themselves always come from the precomputed tables,
//! never from free-form generation.

use std::sync::Arc;

use barista_core::{
    latest_user_turn, transcript_tail, AgentTag, ConversationTurn, GatewayError, Memory,
    PipelineError, RecommendationTables,
};
use serde::Deserialize;
use tracing::debug;

use crate::gateway::ModelGateway;

const TOP_N: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum RecommendationMode {
    Apriori,
    Popular,
    PopularInCategory,
}

#[derive(Debug, Deserialize)]
struct RecommendationQuery {
    mode: RecommendationMode,
    #[serde(default)]
    category: Option<String>,
}

pub struct RecommendationOutcome {
    pub message: String,
    pub memory: Memory,
}

pub struct RecommendationResponder {
    gateway: Arc<ModelGateway>,
    tables: Arc<RecommendationTables>,
}

impl RecommendationResponder {
    pub fn new(gateway: Arc<ModelGateway>, tables: Arc<RecommendationTables>) -> Self {
        Self { gateway, tables }
    }

    pub async fn recommend(
        &self,
        turns: &[ConversationTurn],
        memory: &Memory,
    ) -> Result<RecommendationOutcome, PipelineError> {
        latest_user_turn(turns).ok_or(PipelineError::EmptyConversation)?;

        let query = self.classify_request(turns, memory).await?;

        let ordered = memory.order_item_names();

        // Whichever mode was asked for, an empty result falls through to the
        // overall best-sellers list so the customer always gets an answer.
        let (items, paired) = match query.mode {
            RecommendationMode::Apriori => {
                let from_rules = self.tables.co_purchases(&ordered, TOP_N);
                if from_rules.is_empty() {
                    (self.tables.popular(None, TOP_N), false)
                } else {
                    (from_rules, true)
                }
            }
            RecommendationMode::Popular => (self.tables.popular(None, TOP_N), false),
            RecommendationMode::PopularInCategory => {
                let filtered = self.tables.popular(query.category.as_deref(), TOP_N);
                if filtered.is_empty() {
                    (self.tables.popular(None, TOP_N), false)
                } else {
                    (filtered, false)
                }
            }
        };

        let message = render_recommendations(&items, paired);
        let memory = memory.clone().with_agent(AgentTag::Recommendation);
        Ok(RecommendationOutcome { message, memory })
    }

    async fn classify_request(
        &self,
        turns: &[ConversationTurn],
        memory: &Memory,
    ) -> Result<RecommendationQuery, PipelineError> {
        let prompt = mode_prompt(turns);
        match self.gateway.complete_structured::<RecommendationQuery>(&prompt).await {
            Ok(query) => Ok(query),
            Err(GatewayError::MalformedOutput { .. }) => {
                debug!(
                    event_name = "pipeline.recommend.mode_fallback",
                    "no usable mode, choosing from the order contents"
                );
                let mode = if memory.order_is_empty() {
                    RecommendationMode::Popular
                } else {
                    RecommendationMode::Apriori
                };
                Ok(RecommendationQuery { mode, category: None })
            }
            Err(error) => Err(error.into()),
        }
    }
}

fn render_recommendations(items: &[String], paired: bool) -> String {
    if items.is_empty() {
        return "I don't have a good suggestion right now, but our baristas love the seasonal \
                specials on the board."
            .to_string();
    }
    let listed = items.join(", ");
    if paired {
        format!("These go really well with your order: {listed}.")
    } else {
        format!("Our most popular picks are: {listed}.")
    }
}

fn mode_prompt(turns: &[ConversationTurn]) -> String {
    format!(
        "A coffee shop customer is asking for a recommendation. Choose how to \
         answer:\n\
         - \"apriori\": they want something that pairs with what they ordered\n\
         - \"popular\": they want the overall best sellers\n\
         - \"popular_in_category\": they want best sellers of one category \
         (then also set \"category\")\n\n\
         Conversation:\n{}\n\n\
         Respond with ONLY a JSON object: \
         {{\"mode\": \"apriori\"|\"popular\"|\"popular_in_category\", \
         \"category\": <string or null>}}.",
        transcript_tail(turns, 6)
    )
}
