use std::path::PathBuf;
use std::sync::Arc;

use crate::config::RelayConfig;
use crate::gateway::dispatcher::Dispatcher;
use crate::persistence::GestureStore;

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub store: Arc<dyn GestureStore>,
    pub config: Arc<RelayConfig>,
    pub static_dir: PathBuf,
}

impl AppState {
    pub fn new(config: RelayConfig, store: Arc<dyn GestureStore>, static_dir: PathBuf) -> Self {
        Self {
            dispatcher: Arc::new(Dispatcher::new()),
            store,
            config: Arc::new(config),
            static_dir,
        }
    }
}
