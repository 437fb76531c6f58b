use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use pdfchat_graph::SessionController;
use crate::config::Config;
use crate::error::{ApiError, ApiResult};

/// Shared application state passed to all handlers
///
/// The server hosts a single user session. Its controller sits behind an
/// async mutex: reads wait for it, inputs that would start work while a
/// question is in flight are refused.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub session: Arc<Mutex<SessionController>>,
}

impl AppState {
    pub fn new(config: Config, session: SessionController) -> Self {
        Self {
            config: Arc::new(config),
            session: Arc::new(Mutex::new(session)),
        }
    }

    /// Exclusive access for user input; `Busy` while a turn is running
    pub fn try_session(&self) -> ApiResult<OwnedMutexGuard<SessionController>> {
        Arc::clone(&self.session)
            .try_lock_owned()
            .map_err(|_| ApiError::Busy)
    }
}
