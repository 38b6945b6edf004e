use crate::audit::RecordStatus;
use crate::orm::users;
use sea_orm::{entity::*, DatabaseConnection};

/// Base URL fragment for resource.
pub static RESOURCE_URL: &str = "members";

/// The slice of a user record needed on every request.
#[derive(Clone, Debug)]
pub struct Profile {
    pub id: i32,
    pub username: String,
    pub full_name: String,
    pub is_admin: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
}

impl From<users::Model> for Profile {
    fn from(user: users::Model) -> Self {
        Self {
            full_name: user.full_name(),
            id: user.id,
            username: user.username,
            is_admin: user.is_admin,
            is_staff: user.is_staff,
            is_superuser: user.is_superuser,
        }
    }
}

impl Profile {
    /// Returns the profile of an active, non-deleted user.
    pub async fn get_by_id(
        db: &DatabaseConnection,
        id: i32,
    ) -> Result<Option<Self>, sea_orm::DbErr> {
        let user = users::Entity::find_by_id(id).one(db).await?;
        Ok(user
            .filter(|u| u.is_active && u.record_status != RecordStatus::Deleted)
            .map(Profile::from))
    }

    /// Name shown in page headers: full name when known.
    pub fn display_name(&self) -> &str {
        if self.full_name.is_empty() {
            &self.username
        } else {
            &self.full_name
        }
    }

    pub fn is_moderator(&self) -> bool {
        self.is_admin || self.is_staff || self.is_superuser
    }

    pub fn get_url(&self) -> String {
        format!("/{}/{}/", RESOURCE_URL, self.id)
    }
}
