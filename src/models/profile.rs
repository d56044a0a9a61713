use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Profile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OrganiserProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub website_url: Option<String>,
    pub contact_email: Option<String>,
    pub profile_image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrganiserProfile {
    /// An organiser may create events only once the essential fields are
    /// filled in.
    pub fn is_complete(&self) -> bool {
        !self.name.trim().is_empty()
            && self
                .description
                .as_deref()
                .is_some_and(|d| !d.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn profile(name: &str, description: Option<&str>) -> OrganiserProfile {
        OrganiserProfile {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: name.to_string(),
            slug: String::new(),
            description: description.map(str::to_string),
            website_url: None,
            contact_email: None,
            profile_image_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn complete_requires_name_and_description() {
        assert!(profile("Makers Guild", Some("We run maker meetups")).is_complete());
        assert!(!profile("Makers Guild", None).is_complete());
        assert!(!profile("Makers Guild", Some("   ")).is_complete());
        assert!(!profile("", Some("We run maker meetups")).is_complete());
    }
}
