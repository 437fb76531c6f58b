pub mod types;
pub mod traits;
pub mod streaming;
pub mod openai;
pub mod config;

pub use traits::{
    ChatClient,
    ChatRequest, ChatResponse, ChatOptions,
    EventStream,
    TokenUsage,
};

pub use streaming::StreamEvent;
pub use openai::OpenAIClient;
pub use config::{ClientFactory, ProviderConfig, GEMINI_OPENAI_BASE};
pub use types::Message;
