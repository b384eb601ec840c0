//! User model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A known participant, mirrored from the identity layer for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(display_name: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            display_name,
            created_at: Utc::now(),
        }
    }

    pub fn with_id(id: Uuid, display_name: String) -> Self {
        Self {
            id,
            display_name,
            created_at: Utc::now(),
        }
    }
}
