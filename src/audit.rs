//! Audit trail shared by every table.
//!
//! Each entity carries the same five columns:
//! - created_on / created_by
//! - changed_on / changed_by
//! - record_status
//!
//! `impl_audit_trail!` wires an entity's `ActiveModel` into [`AuditTrail`]
//! and stamps timestamps in `before_save`, so any `.insert()` or `.update()`
//! keeps the trail current without the caller touching it.

use crate::error::ServiceError;
use chrono::{NaiveDateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Label used by list templates for the per-row edit link.
pub const VIEW_EDIT_LABEL: &str = "View/Edit";

/// Lifecycle marker of a record. New records are `Active`.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, Default,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(255))")]
pub enum RecordStatus {
    #[sea_orm(string_value = "ACTIVE")]
    #[default]
    Active,
    #[sea_orm(string_value = "DELETED")]
    Deleted,
    #[sea_orm(string_value = "ACTIVE_LOCKED")]
    ActiveLocked,
}

impl RecordStatus {
    /// Human readable label.
    pub fn label(&self) -> &'static str {
        match self {
            RecordStatus::Active => "Active",
            RecordStatus::Deleted => "Delete",
            RecordStatus::ActiveLocked => "Active Locked",
        }
    }

    pub fn is_visible(&self) -> bool {
        *self != RecordStatus::Deleted
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Rejects changes to deleted or locked records.
pub fn ensure_mutable(status: RecordStatus) -> Result<(), ServiceError> {
    match status {
        RecordStatus::Active => Ok(()),
        RecordStatus::Deleted => Err(ServiceError::NotFound),
        RecordStatus::ActiveLocked => Err(ServiceError::Locked),
    }
}

/// Access to the audit columns of an `ActiveModel`.
pub trait AuditTrail {
    /// Fills timestamps and the default status. Called from `before_save`.
    fn stamp(&mut self, insert: bool, now: NaiveDateTime);

    /// Records the acting user as creator (on insert) and last modifier.
    fn set_actor(&mut self, actor: Option<i32>, insert: bool);

    fn set_record_status(&mut self, status: RecordStatus);
}

/// Current time in the naive UTC form stored by every table.
pub fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// Implements [`AuditTrail`] and `ActiveModelBehavior` for an entity's
/// `ActiveModel`. The model must declare the five audit columns.
macro_rules! impl_audit_trail {
    ($active:ty) => {
        impl $crate::audit::AuditTrail for $active {
            fn stamp(&mut self, insert: bool, now: ::chrono::NaiveDateTime) {
                use ::sea_orm::ActiveValue::{NotSet, Set};
                if insert {
                    if let NotSet = self.created_on {
                        self.created_on = Set(now);
                    }
                    if let NotSet = self.record_status {
                        self.record_status = Set($crate::audit::RecordStatus::Active);
                    }
                }
                self.changed_on = Set(now);
            }

            fn set_actor(&mut self, actor: Option<i32>, insert: bool) {
                use ::sea_orm::ActiveValue::Set;
                if insert {
                    self.created_by = Set(actor);
                }
                self.changed_by = Set(actor);
            }

            fn set_record_status(&mut self, status: $crate::audit::RecordStatus) {
                self.record_status = ::sea_orm::ActiveValue::Set(status);
            }
        }

        impl ::sea_orm::ActiveModelBehavior for $active {
            fn before_save(mut self, insert: bool) -> Result<Self, ::sea_orm::DbErr> {
                $crate::audit::AuditTrail::stamp(&mut self, insert, $crate::audit::now());
                Ok(self)
            }
        }
    };
}

pub(crate) use impl_audit_trail;
