pub mod intents;
pub mod messages;
pub mod state;
pub mod wizard;

pub use state::{ContextStore, ConversationContext, Question};
