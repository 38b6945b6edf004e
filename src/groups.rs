//! Groups of users and their memberships.

use crate::audit::{self, AuditTrail, RecordStatus};
use crate::error::ServiceError;
use crate::orm::{group_members, groups, users};
use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::sea_query::Expr;
use sea_orm::{entity::*, query::*, DatabaseConnection, DbErr, FromQueryResult};
use std::collections::HashMap;
use unicode_normalization::UnicodeNormalization;

pub const NAME_MAX_LENGTH: usize = 250;

static STRIP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s-]").unwrap());
static DASH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[-\s]+").unwrap());

/// Converts a group name into its URL slug.
///
/// Folds to ASCII (NFKD, then drops what is left outside ASCII), lowercases,
/// drops anything that is not a word character, whitespace or a hyphen, then
/// collapses whitespace and hyphen runs into single hyphens.
pub fn slugify(value: &str) -> String {
    let ascii: String = value.nfkd().filter(char::is_ascii).collect();
    let lowered = ascii.to_lowercase();
    let stripped = STRIP_RE.replace_all(&lowered, "");
    let dashed = DASH_RE.replace_all(&stripped, "-");
    dashed.trim_matches(|c| c == '-' || c == '_').to_owned()
}

/// A group with its member count, for listings.
#[derive(Clone, Debug)]
pub struct GroupSummary {
    pub group: groups::Model,
    pub member_count: usize,
}

pub async fn create_group(
    db: &DatabaseConnection,
    name: &str,
    description: &str,
    actor: Option<i32>,
) -> Result<groups::Model, ServiceError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ServiceError::Invalid("Group name is required".to_owned()));
    }
    if name.chars().count() > NAME_MAX_LENGTH {
        return Err(ServiceError::Invalid(format!(
            "Group name must be at most {} characters",
            NAME_MAX_LENGTH
        )));
    }

    let slug = slugify(name);
    if slug.is_empty() {
        return Err(ServiceError::Invalid(
            "Group name must contain letters or numbers".to_owned(),
        ));
    }

    // Uniqueness spans deleted rows too; the columns are unique in the table.
    let clash = groups::Entity::find()
        .filter(
            Condition::any()
                .add(groups::Column::Name.eq(name.to_owned()))
                .add(groups::Column::Slug.eq(slug.clone())),
        )
        .one(db)
        .await?;
    if clash.is_some() {
        return Err(ServiceError::Invalid(
            "A group with that name already exists".to_owned(),
        ));
    }

    let mut group = groups::ActiveModel {
        name: Set(name.to_owned()),
        slug: Set(slug),
        description: Set(description.trim().to_owned()),
        ..Default::default()
    };
    group.set_actor(actor, true);
    let group = group.insert(db).await?;

    log::info!("Group created: {} (group_id: {})", group.slug, group.id);
    Ok(group)
}

#[derive(Debug, FromQueryResult)]
struct MemberCount {
    group_id: i32,
    members: i64,
}

pub async fn list_groups(db: &DatabaseConnection) -> Result<Vec<GroupSummary>, DbErr> {
    let groups = groups::Entity::find()
        .filter(groups::Column::RecordStatus.ne(RecordStatus::Deleted))
        .order_by_asc(groups::Column::Name)
        .all(db)
        .await?;

    let counts: HashMap<i32, i64> = group_members::Entity::find()
        .select_only()
        .column(group_members::Column::GroupId)
        .column_as(Expr::col(group_members::Column::UserId).count(), "members")
        .group_by(group_members::Column::GroupId)
        .into_model::<MemberCount>()
        .all(db)
        .await?
        .into_iter()
        .map(|c| (c.group_id, c.members))
        .collect();

    Ok(groups
        .into_iter()
        .map(|group| {
            let member_count = counts.get(&group.id).copied().unwrap_or(0) as usize;
            GroupSummary {
                group,
                member_count,
            }
        })
        .collect())
}

pub async fn get_group_by_slug(
    db: &DatabaseConnection,
    slug: &str,
) -> Result<groups::Model, ServiceError> {
    groups::Entity::find()
        .filter(groups::Column::Slug.eq(slug.to_owned()))
        .one(db)
        .await?
        .filter(|g| g.record_status.is_visible())
        .ok_or(ServiceError::NotFound)
}

pub async fn delete_group(
    db: &DatabaseConnection,
    slug: &str,
    actor: Option<i32>,
) -> Result<groups::Model, ServiceError> {
    let group = get_group_by_slug(db, slug).await?;
    audit::ensure_mutable(group.record_status)?;

    let mut active: groups::ActiveModel = group.into();
    active.set_record_status(RecordStatus::Deleted);
    active.set_actor(actor, false);
    let group = active.update(db).await?;

    log::info!("Group soft deleted: {} by {:?}", group.slug, actor);
    Ok(group)
}

pub async fn is_member(db: &DatabaseConnection, group_id: i32, user_id: i32) -> Result<bool, DbErr> {
    Ok(group_members::Entity::find_by_id((group_id, user_id))
        .one(db)
        .await?
        .is_some())
}

/// Adds the user to the group. A user joins a group at most once.
pub async fn join_group(
    db: &DatabaseConnection,
    group: &groups::Model,
    user_id: i32,
) -> Result<group_members::Model, ServiceError> {
    audit::ensure_mutable(group.record_status)?;

    if is_member(db, group.id, user_id).await? {
        return Err(ServiceError::Invalid(
            "You are already a member of this group".to_owned(),
        ));
    }

    let mut membership = group_members::ActiveModel {
        group_id: Set(group.id),
        user_id: Set(user_id),
        ..Default::default()
    };
    membership.set_actor(Some(user_id), true);
    let membership = membership.insert(db).await?;

    log::debug!("user_id={} joined group_id={}", user_id, group.id);
    Ok(membership)
}

/// Removes the membership row.
pub async fn leave_group(
    db: &DatabaseConnection,
    group: &groups::Model,
    user_id: i32,
) -> Result<(), ServiceError> {
    let res = group_members::Entity::delete_many()
        .filter(group_members::Column::GroupId.eq(group.id))
        .filter(group_members::Column::UserId.eq(user_id))
        .exec(db)
        .await?;

    if res.rows_affected == 0 {
        return Err(ServiceError::Invalid(
            "You are not a member of this group".to_owned(),
        ));
    }

    log::debug!("user_id={} left group_id={}", user_id, group.id);
    Ok(())
}

pub async fn members_of(db: &DatabaseConnection, group_id: i32) -> Result<Vec<users::Model>, DbErr> {
    users::Entity::find()
        .inner_join(group_members::Entity)
        .filter(group_members::Column::GroupId.eq(group_id))
        .filter(users::Column::RecordStatus.ne(RecordStatus::Deleted))
        .order_by_asc(users::Column::Username)
        .all(db)
        .await
}

pub async fn groups_of_user(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<Vec<groups::Model>, DbErr> {
    groups::Entity::find()
        .inner_join(group_members::Entity)
        .filter(group_members::Column::UserId.eq(user_id))
        .filter(groups::Column::RecordStatus.ne(RecordStatus::Deleted))
        .order_by_asc(groups::Column::Name)
        .all(db)
        .await
}
