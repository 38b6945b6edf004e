//! Comments left on tickets. New comments wait for staff approval.

use crate::audit::{self, AuditTrail, RecordStatus};
use crate::error::ServiceError;
use crate::orm::comments;
use crate::tickets::get_ticket;
use sea_orm::{entity::*, query::*, DatabaseConnection, DbErr};

pub const AUTHOR_MAX_LENGTH: usize = 200;

pub async fn create_comment(
    db: &DatabaseConnection,
    ticket_id: i32,
    author: &str,
    text: &str,
    actor: Option<i32>,
) -> Result<comments::Model, ServiceError> {
    let author = author.trim();
    if author.is_empty() {
        return Err(ServiceError::Invalid("Author is required".to_owned()));
    }
    if author.chars().count() > AUTHOR_MAX_LENGTH {
        return Err(ServiceError::Invalid(format!(
            "Author must be at most {} characters",
            AUTHOR_MAX_LENGTH
        )));
    }
    if text.trim().is_empty() {
        return Err(ServiceError::Invalid("Comment text is required".to_owned()));
    }

    let ticket = get_ticket(db, ticket_id).await?;
    audit::ensure_mutable(ticket.record_status)?;

    let mut comment = comments::ActiveModel {
        ticket_id: Set(ticket.id),
        author: Set(author.to_owned()),
        text: Set(text.trim().to_owned()),
        created_date: Set(audit::now()),
        approved_comment: Set(false),
        ..Default::default()
    };
    comment.set_actor(actor, true);
    let comment = comment.insert(db).await?;

    log::info!(
        "Comment created: comment_id={} ticket_id={} by {:?}",
        comment.id,
        ticket.id,
        actor
    );
    Ok(comment)
}

/// Comments a viewer may see on a ticket, oldest first.
///
/// Moderators see everything; others see approved comments plus their own.
pub async fn list_for_ticket(
    db: &DatabaseConnection,
    ticket_id: i32,
    viewer: Option<i32>,
    is_moderator: bool,
) -> Result<Vec<comments::Model>, DbErr> {
    let mut query = comments::Entity::find()
        .filter(comments::Column::TicketId.eq(ticket_id))
        .filter(comments::Column::RecordStatus.ne(RecordStatus::Deleted));

    if !is_moderator {
        let mut visible = Condition::any().add(comments::Column::ApprovedComment.eq(true));
        if let Some(user_id) = viewer {
            visible = visible.add(comments::Column::CreatedBy.eq(user_id));
        }
        query = query.filter(visible);
    }

    query
        .order_by_asc(comments::Column::CreatedDate)
        .order_by_asc(comments::Column::Id)
        .all(db)
        .await
}

pub async fn get_comment(db: &DatabaseConnection, id: i32) -> Result<comments::Model, ServiceError> {
    comments::Entity::find_by_id(id)
        .one(db)
        .await?
        .filter(|c| c.record_status.is_visible())
        .ok_or(ServiceError::NotFound)
}

/// Marks a comment approved and saves it.
pub async fn approve(
    db: &DatabaseConnection,
    id: i32,
    actor: Option<i32>,
) -> Result<comments::Model, ServiceError> {
    let comment = get_comment(db, id).await?;
    audit::ensure_mutable(comment.record_status)?;
    if comment.approved_comment {
        return Ok(comment);
    }

    let mut active: comments::ActiveModel = comment.into();
    active.approved_comment = Set(true);
    active.set_actor(actor, false);
    let comment = active.update(db).await?;

    log::info!("Comment approved: comment_id={} by {:?}", comment.id, actor);
    Ok(comment)
}

pub async fn delete_comment(
    db: &DatabaseConnection,
    id: i32,
    actor: Option<i32>,
) -> Result<comments::Model, ServiceError> {
    let comment = get_comment(db, id).await?;
    audit::ensure_mutable(comment.record_status)?;

    let mut active: comments::ActiveModel = comment.into();
    active.set_record_status(RecordStatus::Deleted);
    active.set_actor(actor, false);
    let comment = active.update(db).await?;

    log::info!("Comment soft deleted: comment_id={} by {:?}", comment.id, actor);
    Ok(comment)
}
