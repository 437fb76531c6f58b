pub mod config;
pub mod error;
pub mod extract;
pub mod orchestrator;
pub mod sanitize;
pub mod session;
pub mod templates;

pub use config::OrchestratorConfig;
pub use error::SessionError;
pub use extract::{PdfExtractor, TextExtractor};
pub use orchestrator::{excerpt, FragmentStream, TurnOrchestrator};
pub use sanitize::clean;
pub use session::{SessionContext, SessionController, SessionState, TurnOutcome};
pub use templates::NOT_FOUND;
