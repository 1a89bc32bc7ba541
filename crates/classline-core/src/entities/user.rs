//! User entity - represents an account in the classroom messaging system

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::Snowflake;

/// Account role, decides channel-creation privileges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[default]
    Student,
    Educator,
}

impl UserRole {
    /// Only educators may create named group channels
    #[inline]
    #[must_use]
    pub fn can_create_groups(self) -> bool {
        matches!(self, Self::Educator)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Educator => "educator",
        }
    }
}

/// User entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Snowflake,
    pub email: String,
    pub display_name: String,
    pub avatar: Option<String>,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    #[must_use]
    pub fn new(id: Snowflake, email: String, display_name: String, role: UserRole) -> Self {
        let now = Utc::now();
        Self {
            id,
            email,
            display_name,
            avatar: None,
            role,
            created_at: now,
            updated_at: now,
        }
    }

    /// Avatar URL, falling back to a deterministic default
    #[must_use]
    pub fn avatar_url(&self) -> String {
        match &self.avatar {
            Some(hash) => format!("/avatars/{}/{}.png", self.id, hash),
            None => format!("/avatars/default/{}.png", self.default_avatar_index()),
        }
    }

    fn default_avatar_index(&self) -> u8 {
        (self.id.into_inner().unsigned_abs() % 5) as u8
    }

    #[inline]
    #[must_use]
    pub fn is_educator(&self) -> bool {
        matches!(self.role, UserRole::Educator)
    }

    pub fn set_display_name(&mut self, display_name: String) {
        self.display_name = display_name;
        self.updated_at = Utc::now();
    }

    pub fn set_avatar(&mut self, avatar: Option<String>) {
        self.avatar = avatar;
        self.updated_at = Utc::now();
    }
}
