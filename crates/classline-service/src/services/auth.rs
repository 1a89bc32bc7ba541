//! Authentication service
//!
//! Handles user registration, login, and token refresh. Tokens carry a
//! per-login session id so multiple devices stay distinguishable.

use classline_common::auth::{hash_password, validate_password_strength, TokenPair};
use classline_common::AppError;
use classline_core::entities::{User, UserRole};
use serde::Deserialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};

/// User registration request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 2, max = 64, message = "Display name must be 2-64 characters"))]
    pub display_name: String,

    #[validate(length(min = 8, max = 72, message = "Password must be 8-72 characters"))]
    pub password: String,

    #[serde(default)]
    pub role: UserRole,
}

/// User login request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    pub password: String,
}

/// An authenticated session: the user plus freshly issued tokens
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: User,
    pub tokens: TokenPair,
    pub session_id: String,
}

/// Authentication service
pub struct AuthService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> AuthService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Register a new user
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register(&self, request: RegisterRequest) -> ServiceResult<AuthSession> {
        request
            .validate()
            .map_err(|e| ServiceError::validation(e.to_string()))?;
        validate_password_strength(&request.password).map_err(ServiceError::from)?;

        if self.ctx.user_repo().email_exists(&request.email).await? {
            return Err(ServiceError::conflict("Email already registered"));
        }

        let password_hash =
            hash_password(&request.password).map_err(|e| ServiceError::internal(e.to_string()))?;

        let user = User::new(
            self.ctx.generate_id(),
            request.email,
            request.display_name,
            request.role,
        );

        self.ctx.user_repo().create(&user, &password_hash).await?;

        info!(user_id = %user.id, role = user.role.as_str(), "User registered");

        self.issue_session(user)
    }

    /// Login with email and password
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn login(&self, request: LoginRequest) -> ServiceResult<AuthSession> {
        request
            .validate()
            .map_err(|e| ServiceError::validation(e.to_string()))?;

        let user = self
            .ctx
            .user_repo()
            .find_by_email(&request.email)
            .await?
            .ok_or_else(|| {
                warn!("Login failed: unknown email");
                ServiceError::App(AppError::InvalidCredentials)
            })?;

        let password_hash = self
            .ctx
            .user_repo()
            .get_password_hash(user.id)
            .await?
            .ok_or_else(|| {
                warn!(user_id = %user.id, "Login failed: no password hash");
                ServiceError::App(AppError::InvalidCredentials)
            })?;

        classline_common::auth::PasswordService::new()
            .verify_or_error(&request.password, &password_hash)
            .map_err(ServiceError::from)?;

        info!(user_id = %user.id, "User logged in");

        self.issue_session(user)
    }

    /// Mint a fresh token pair from a refresh token
    #[instrument(skip(self, refresh_token))]
    pub async fn refresh(&self, refresh_token: &str) -> ServiceResult<TokenPair> {
        let claims = self
            .ctx
            .jwt_service()
            .validate_refresh_token(refresh_token)
            .map_err(ServiceError::from)?;

        let user_id = claims.user_id().map_err(ServiceError::from)?;

        // A deleted user's refresh token must stop working.
        self.ctx
            .user_repo()
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ServiceError::App(AppError::InvalidToken))?;

        self.ctx
            .jwt_service()
            .refresh_tokens(refresh_token)
            .map_err(ServiceError::from)
    }

    /// Validate an access token and load the user it belongs to
    #[instrument(skip(self, access_token))]
    pub async fn authenticate(&self, access_token: &str) -> ServiceResult<User> {
        let claims = self
            .ctx
            .jwt_service()
            .validate_access_token(access_token)
            .map_err(ServiceError::from)?;

        let user_id = claims.user_id().map_err(ServiceError::from)?;

        self.ctx
            .user_repo()
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ServiceError::App(AppError::InvalidToken))
    }

    fn issue_session(&self, user: User) -> ServiceResult<AuthSession> {
        let session_id = Uuid::new_v4().to_string();
        let tokens = self
            .ctx
            .jwt_service()
            .issue_pair(user.id, Some(session_id.clone()))
            .map_err(|e| ServiceError::internal(e.to_string()))?;

        Ok(AuthSession {
            user,
            tokens,
            session_id,
        })
    }
}
