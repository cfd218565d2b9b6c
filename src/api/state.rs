use crate::chat::ChatGateway;
use crate::core::AppConfig;
use crate::kv::SharedKvStore;

pub struct AppState {
    pub gateway: ChatGateway,
}

impl AppState {
    pub fn new(store: SharedKvStore, config: &AppConfig) -> Self {
        Self {
            gateway: ChatGateway::from_config(config, store),
        }
    }
}
