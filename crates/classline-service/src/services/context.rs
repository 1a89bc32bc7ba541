//! Service context - dependency container for services
//!
//! Holds the repositories, presence state, and shared services every
//! service needs.

use std::sync::Arc;
use std::time::Duration;

use classline_common::auth::JwtService;
use classline_core::traits::{ChannelRepository, MessageRepository, UserRepository};
use classline_core::SnowflakeGenerator;
use classline_store::{PresenceStore, ReadStateStore, TypingTracker};

/// Service context containing all dependencies
#[derive(Clone)]
pub struct ServiceContext {
    // Repositories
    user_repo: Arc<dyn UserRepository>,
    channel_repo: Arc<dyn ChannelRepository>,
    message_repo: Arc<dyn MessageRepository>,

    // Presence state
    presence_store: Arc<PresenceStore>,
    typing_tracker: Arc<TypingTracker>,
    read_state: Arc<ReadStateStore>,

    // Services
    jwt_service: Arc<JwtService>,
    snowflake_generator: Arc<SnowflakeGenerator>,

    // Typing indicator lifetime
    typing_ttl: Duration,
}

impl ServiceContext {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        channel_repo: Arc<dyn ChannelRepository>,
        message_repo: Arc<dyn MessageRepository>,
        jwt_service: Arc<JwtService>,
        snowflake_generator: Arc<SnowflakeGenerator>,
        typing_ttl: Duration,
    ) -> Self {
        Self {
            user_repo,
            channel_repo,
            message_repo,
            presence_store: Arc::new(PresenceStore::new()),
            typing_tracker: Arc::new(TypingTracker::new()),
            read_state: Arc::new(ReadStateStore::new()),
            jwt_service,
            snowflake_generator,
            typing_ttl,
        }
    }

    // === Repositories ===

    pub fn user_repo(&self) -> &dyn UserRepository {
        self.user_repo.as_ref()
    }

    pub fn channel_repo(&self) -> &dyn ChannelRepository {
        self.channel_repo.as_ref()
    }

    pub fn message_repo(&self) -> &dyn MessageRepository {
        self.message_repo.as_ref()
    }

    // === Presence state ===

    pub fn presence_store(&self) -> &PresenceStore {
        &self.presence_store
    }

    pub fn typing_tracker(&self) -> &TypingTracker {
        &self.typing_tracker
    }

    pub fn read_state(&self) -> &ReadStateStore {
        &self.read_state
    }

    // === Services ===

    pub fn jwt_service(&self) -> &JwtService {
        self.jwt_service.as_ref()
    }

    pub fn snowflake_generator(&self) -> &SnowflakeGenerator {
        self.snowflake_generator.as_ref()
    }

    /// Generate a new Snowflake ID
    pub fn generate_id(&self) -> classline_core::Snowflake {
        self.snowflake_generator.generate()
    }

    pub fn typing_ttl(&self) -> Duration {
        self.typing_ttl
    }
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("typing_ttl", &self.typing_ttl)
            .finish_non_exhaustive()
    }
}

/// Builder for creating ServiceContext with custom configuration
#[derive(Default)]
pub struct ServiceContextBuilder {
    user_repo: Option<Arc<dyn UserRepository>>,
    channel_repo: Option<Arc<dyn ChannelRepository>>,
    message_repo: Option<Arc<dyn MessageRepository>>,
    jwt_service: Option<Arc<JwtService>>,
    snowflake_generator: Option<Arc<SnowflakeGenerator>>,
    typing_ttl: Option<Duration>,
}

impl ServiceContextBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn user_repo(mut self, repo: Arc<dyn UserRepository>) -> Self {
        self.user_repo = Some(repo);
        self
    }

    #[must_use]
    pub fn channel_repo(mut self, repo: Arc<dyn ChannelRepository>) -> Self {
        self.channel_repo = Some(repo);
        self
    }

    #[must_use]
    pub fn message_repo(mut self, repo: Arc<dyn MessageRepository>) -> Self {
        self.message_repo = Some(repo);
        self
    }

    #[must_use]
    pub fn jwt_service(mut self, service: Arc<JwtService>) -> Self {
        self.jwt_service = Some(service);
        self
    }

    #[must_use]
    pub fn snowflake_generator(mut self, generator: Arc<SnowflakeGenerator>) -> Self {
        self.snowflake_generator = Some(generator);
        self
    }

    #[must_use]
    pub fn typing_ttl(mut self, ttl: Duration) -> Self {
        self.typing_ttl = Some(ttl);
        self
    }

    /// Build the ServiceContext
    ///
    /// # Errors
    /// Returns `ServiceError::Validation` if any required dependency is missing
    pub fn build(self) -> super::error::ServiceResult<ServiceContext> {
        use super::error::ServiceError;

        Ok(ServiceContext::new(
            self.user_repo
                .ok_or_else(|| ServiceError::validation("user_repo is required"))?,
            self.channel_repo
                .ok_or_else(|| ServiceError::validation("channel_repo is required"))?,
            self.message_repo
                .ok_or_else(|| ServiceError::validation("message_repo is required"))?,
            self.jwt_service
                .ok_or_else(|| ServiceError::validation("jwt_service is required"))?,
            self.snowflake_generator
                .ok_or_else(|| ServiceError::validation("snowflake_generator is required"))?,
            self.typing_ttl.unwrap_or(Duration::from_millis(5_000)),
        ))
    }
}
