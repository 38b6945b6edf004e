//! Support tickets.

use crate::audit::{self, AuditTrail, RecordStatus};
use crate::error::ServiceError;
use crate::orm::tickets::{self, TicketStatus};
use crate::orm::groups;
use crate::render::render_description;
use sea_orm::{entity::*, query::*, DatabaseConnection, DbErr, PaginatorTrait};

pub const SUMMARY_MAX_LENGTH: usize = 100;
pub const AUTHOR_NAME_MAX_LENGTH: usize = 100;

/// Fields accepted when opening a ticket.
#[derive(Clone, Debug, Default)]
pub struct NewTicket<'a> {
    pub summary: &'a str,
    pub description: &'a str,
    pub author_name: &'a str,
    pub group_id: Option<i32>,
}

impl NewTicket<'_> {
    pub fn validate(&self) -> Result<(), ServiceError> {
        let summary = self.summary.trim();
        if summary.is_empty() {
            return Err(ServiceError::Invalid("Summary is required".to_owned()));
        }
        if summary.chars().count() > SUMMARY_MAX_LENGTH {
            return Err(ServiceError::Invalid(format!(
                "Summary must be at most {} characters",
                SUMMARY_MAX_LENGTH
            )));
        }
        let author_name = self.author_name.trim();
        if author_name.is_empty() {
            return Err(ServiceError::Invalid("Author name is required".to_owned()));
        }
        if author_name.chars().count() > AUTHOR_NAME_MAX_LENGTH {
            return Err(ServiceError::Invalid(format!(
                "Author name must be at most {} characters",
                AUTHOR_NAME_MAX_LENGTH
            )));
        }
        if self.description.trim().is_empty() {
            return Err(ServiceError::Invalid("Description is required".to_owned()));
        }
        Ok(())
    }
}

/// One page of tickets.
#[derive(Debug)]
pub struct TicketPage {
    pub tickets: Vec<tickets::Model>,
    /// 1-based
    pub page: u64,
    pub page_count: u64,
}

pub async fn create_ticket(
    db: &DatabaseConnection,
    new_ticket: &NewTicket<'_>,
    actor: Option<i32>,
) -> Result<tickets::Model, ServiceError> {
    new_ticket.validate()?;

    if let Some(group_id) = new_ticket.group_id {
        let group = groups::Entity::find_by_id(group_id).one(db).await?;
        if !group.map_or(false, |g| g.record_status.is_visible()) {
            return Err(ServiceError::Invalid("Unknown group".to_owned()));
        }
    }

    let mut ticket = tickets::ActiveModel {
        summary: Set(new_ticket.summary.trim().to_owned()),
        author_name: Set(new_ticket.author_name.trim().to_owned()),
        status: Set(TicketStatus::New),
        description: Set(new_ticket.description.to_owned()),
        description_html: Set(render_description(new_ticket.description)),
        group_id: Set(new_ticket.group_id),
        ..Default::default()
    };
    ticket.set_actor(actor, true);
    let ticket = ticket.insert(db).await?;

    log::info!("Ticket created: ticket_id={} by {:?}", ticket.id, actor);
    Ok(ticket)
}

/// Lists live tickets, newest first.
pub async fn list_tickets(
    db: &DatabaseConnection,
    group_id: Option<i32>,
    page: u64,
    per_page: u64,
) -> Result<TicketPage, DbErr> {
    let mut query = tickets::Entity::find()
        .filter(tickets::Column::RecordStatus.ne(RecordStatus::Deleted))
        .order_by_desc(tickets::Column::CreatedOn)
        .order_by_desc(tickets::Column::Id);

    if let Some(group_id) = group_id {
        query = query.filter(tickets::Column::GroupId.eq(group_id));
    }

    let paginator = query.paginate(db, per_page.max(1) as usize);
    let page_count = (paginator.num_pages().await? as u64).max(1);
    let page = page.clamp(1, page_count);
    let tickets = paginator.fetch_page((page - 1) as usize).await?;

    Ok(TicketPage {
        tickets,
        page,
        page_count,
    })
}

pub async fn get_ticket(db: &DatabaseConnection, id: i32) -> Result<tickets::Model, ServiceError> {
    tickets::Entity::find_by_id(id)
        .one(db)
        .await?
        .filter(|t| t.record_status.is_visible())
        .ok_or(ServiceError::NotFound)
}

pub async fn delete_ticket(
    db: &DatabaseConnection,
    id: i32,
    actor: Option<i32>,
) -> Result<tickets::Model, ServiceError> {
    let ticket = get_ticket(db, id).await?;
    audit::ensure_mutable(ticket.record_status)?;

    let mut active: tickets::ActiveModel = ticket.into();
    active.set_record_status(RecordStatus::Deleted);
    active.set_actor(actor, false);
    let ticket = active.update(db).await?;

    log::info!("Ticket soft deleted: ticket_id={} by {:?}", ticket.id, actor);
    Ok(ticket)
}

pub async fn set_status(
    db: &DatabaseConnection,
    id: i32,
    status: TicketStatus,
    actor: Option<i32>,
) -> Result<tickets::Model, ServiceError> {
    let ticket = get_ticket(db, id).await?;
    audit::ensure_mutable(ticket.record_status)?;

    let mut active: tickets::ActiveModel = ticket.into();
    active.status = Set(status);
    active.set_actor(actor, false);
    Ok(active.update(db).await?)
}

/// Locks or unlocks a ticket. Locked tickets refuse every other change.
pub async fn set_locked(
    db: &DatabaseConnection,
    id: i32,
    locked: bool,
    actor: Option<i32>,
) -> Result<tickets::Model, ServiceError> {
    let ticket = get_ticket(db, id).await?;
    let status = if locked {
        RecordStatus::ActiveLocked
    } else {
        RecordStatus::Active
    };

    if ticket.record_status == status {
        return Ok(ticket);
    }

    let mut active: tickets::ActiveModel = ticket.into();
    active.set_record_status(status);
    active.set_actor(actor, false);
    let ticket = active.update(db).await?;

    log::info!(
        "Ticket {}: ticket_id={} by {:?}",
        if locked { "locked" } else { "unlocked" },
        ticket.id,
        actor
    );
    Ok(ticket)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticket<'a>(summary: &'a str, author: &'a str, description: &'a str) -> NewTicket<'a> {
        NewTicket {
            summary,
            description,
            author_name: author,
            group_id: None,
        }
    }

    #[test]
    fn test_valid_ticket() {
        assert!(ticket("Printer on fire", "Ann", "Smoke everywhere")
            .validate()
            .is_ok());
    }

    #[test]
    fn test_summary_required() {
        assert!(matches!(
            ticket("  ", "Ann", "x").validate(),
            Err(ServiceError::Invalid(_))
        ));
    }

    #[test]
    fn test_summary_length_limit() {
        let long = "s".repeat(SUMMARY_MAX_LENGTH + 1);
        assert!(ticket(&long, "Ann", "x").validate().is_err());
        let max = "s".repeat(SUMMARY_MAX_LENGTH);
        assert!(ticket(&max, "Ann", "x").validate().is_ok());
    }

    #[test]
    fn test_author_and_description_required() {
        assert!(ticket("Summary", "", "x").validate().is_err());
        assert!(ticket("Summary", "Ann", "").validate().is_err());
    }
}
