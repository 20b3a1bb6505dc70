//! Retrieval-grounded Q&A. The model answers only from the supplied
//! passages; an empty retrieval still produces a reply, with an explicit
//! instruction to admit the gap rather than fabricate.

use std::sync::Arc;

use barista_core::{latest_user_turn, transcript_tail, ConversationTurn, PipelineError, RetrievedPassage};

use crate::gateway::ModelGateway;
use crate::retrieval::Retriever;

pub struct DetailsResponder {
    gateway: Arc<ModelGateway>,
    retriever: Arc<dyn Retriever>,
    top_k: usize,
}

impl DetailsResponder {
    pub fn new(gateway: Arc<ModelGateway>, retriever: Arc<dyn Retriever>, top_k: usize) -> Self {
        Self { gateway, retriever, top_k }
    }

    pub async fn answer(&self, turns: &[ConversationTurn]) -> Result<String, PipelineError> {
        let query = latest_user_turn(turns)
            .map(|turn| turn.content.clone())
            .ok_or(PipelineError::EmptyConversation)?;

        let vector = self.gateway.embed(&query).await?;
        let passages = self.retriever.search(&vector, self.top_k).await?;

        let prompt = grounded_prompt(turns, &passages);
        let answer = self.gateway.complete(&prompt).await?;
        Ok(answer.trim().to_string())
    }
}

fn grounded_prompt(turns: &[ConversationTurn], passages: &[RetrievedPassage]) -> String {
    let context = if passages.is_empty() {
        "(no matching passages were found)".to_string()
    } else {
        passages
            .iter()
            .enumerate()
            .map(|(index, passage)| format!("[{}] {}", index + 1, passage.text))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "You are a friendly coffee shop assistant. Answer the customer's latest \
         question using ONLY the context passages below. If the context does not \
         contain the answer, say you don't have that information and offer to help \
         another way. Never invent menu items, prices, or policies.\n\n\
         Context:\n{context}\n\nConversation:\n{}\n\nAnswer:",
        transcript_tail(turns, 6)
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use barista_core::{ConversationTurn, RetrievedPassage};

    use super::DetailsResponder;
    use crate::gateway::ModelGateway;
    use crate::testing::{ScriptedModel, ScriptedRetriever};

    #[tokio::test]
    async fn passages_are_injected_into_the_prompt() {
        let model = Arc::new(ScriptedModel::new(vec![Ok(
            "Our latte uses double-shot espresso.".to_string()
        )]));
        let gateway = Arc::new(
            ModelGateway::new(model.clone(), 0, 3).with_backoff(Duration::from_millis(1)),
        );
        let retriever = Arc::new(ScriptedRetriever::new(vec![RetrievedPassage {
            text: "Latte: double shot espresso with steamed milk.".to_string(),
            score: 0.91,
        }]));

        let responder = DetailsResponder::new(gateway, retriever.clone(), 4);
        let answer = responder
            .answer(&[ConversationTurn::user("what's in a latte?")])
            .await
            .expect("answer should succeed");

        assert_eq!(answer, "Our latte uses double-shot espresso.");
        assert_eq!(retriever.search_calls(), 1);
        assert_eq!(model.embed_calls(), 1);
        let prompts = model.prompts();
        assert!(prompts[0].contains("double shot espresso"));
    }

    #[tokio::test]
    async fn empty_retrieval_still_answers_with_no_context_note() {
        let model = Arc::new(ScriptedModel::new(vec![Ok(
            "I'm sorry, I don't have that information.".to_string(),
        )]));
        let gateway = Arc::new(
            ModelGateway::new(model.clone(), 0, 3).with_backoff(Duration::from_millis(1)),
        );
        let responder = DetailsResponder::new(gateway, Arc::new(ScriptedRetriever::empty()), 4);

        let answer = responder
            .answer(&[ConversationTurn::user("do you serve ramen?")])
            .await
            .expect("answer should succeed");

        assert!(answer.starts_with("I'm sorry"));
        assert!(model.prompts()[0].contains("no matching passages"));
    }
}
