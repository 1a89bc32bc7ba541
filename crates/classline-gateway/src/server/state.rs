//! Gateway application state

use crate::connection::SessionRegistry;
use classline_common::AppConfig;
use classline_service::ServiceContext;
use std::sync::Arc;

/// Shared state for the gateway server
#[derive(Clone)]
pub struct GatewayState {
    context: Arc<ServiceContext>,
    registry: Arc<SessionRegistry>,
    config: Arc<AppConfig>,
}

impl GatewayState {
    pub fn new(context: ServiceContext, registry: Arc<SessionRegistry>, config: AppConfig) -> Self {
        Self {
            context: Arc::new(context),
            registry,
            config: Arc::new(config),
        }
    }

    pub fn context(&self) -> &ServiceContext {
        &self.context
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

impl std::fmt::Debug for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayState")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
