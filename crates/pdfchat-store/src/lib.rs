pub mod models;
pub mod error;
pub mod store;

pub use models::{Message, MessageRole, Thread, ThreadId};
pub use error::StoreError;
pub use store::ConversationStore;
