pub mod conversation;
pub mod memory;
pub mod menu;

pub use conversation::{latest_user_turn, transcript_tail, ConversationTurn, Role};
pub use memory::{AgentTag, Memory, OrderLine};
pub use menu::{MenuItem, RetrievedPassage};
