//! Configurable dropdown values.

use crate::audit::{self, AuditTrail, RecordStatus};
use crate::error::ServiceError;
use crate::orm::lookups::{self, LookUpCategory};
use sea_orm::{entity::*, query::*, DatabaseConnection, DbErr};

pub const NAME_MAX_LENGTH: usize = 255;

pub async fn create_lookup(
    db: &DatabaseConnection,
    name: &str,
    category: Option<LookUpCategory>,
    actor: Option<i32>,
) -> Result<lookups::Model, ServiceError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ServiceError::Invalid("Name is required".to_owned()));
    }
    if name.chars().count() > NAME_MAX_LENGTH {
        return Err(ServiceError::Invalid(format!(
            "Name must be at most {} characters",
            NAME_MAX_LENGTH
        )));
    }

    let mut lookup = lookups::ActiveModel {
        name: Set(name.to_owned()),
        category: Set(category),
        ..Default::default()
    };
    lookup.set_actor(actor, true);
    let lookup = lookup.insert(db).await?;

    log::info!("LookUp created: {} ({:?})", lookup.name, lookup.category);
    Ok(lookup)
}

/// Live lookups ordered by creation then name, optionally for one category.
pub async fn list_lookups(
    db: &DatabaseConnection,
    category: Option<LookUpCategory>,
) -> Result<Vec<lookups::Model>, DbErr> {
    let mut query = lookups::Entity::find()
        .filter(lookups::Column::RecordStatus.ne(RecordStatus::Deleted));

    if let Some(category) = category {
        query = query.filter(lookups::Column::Category.eq(category));
    }

    query
        .order_by_asc(lookups::Column::CreatedOn)
        .order_by_asc(lookups::Column::Name)
        .all(db)
        .await
}

pub async fn delete_lookup(
    db: &DatabaseConnection,
    id: i32,
    actor: Option<i32>,
) -> Result<lookups::Model, ServiceError> {
    let lookup = lookups::Entity::find_by_id(id)
        .one(db)
        .await?
        .filter(|l| l.record_status.is_visible())
        .ok_or(ServiceError::NotFound)?;
    audit::ensure_mutable(lookup.record_status)?;

    let mut active: lookups::ActiveModel = lookup.into();
    active.set_record_status(RecordStatus::Deleted);
    active.set_actor(actor, false);
    Ok(active.update(db).await?)
}
