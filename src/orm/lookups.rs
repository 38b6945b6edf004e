//! SeaORM Entity for log_lookups table
//!
//! Lookups are configurable values shown in dropdowns, grouped by category.

use crate::audit::{impl_audit_trail, RecordStatus};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(255))")]
pub enum LookUpCategory {
    #[sea_orm(string_value = "GENDER")]
    Gender,
}

impl LookUpCategory {
    pub const ALL: [LookUpCategory; 1] = [LookUpCategory::Gender];

    /// Stored name, also used in URLs.
    pub fn as_str(&self) -> &'static str {
        match self {
            LookUpCategory::Gender => "GENDER",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LookUpCategory::Gender => "Gender",
        }
    }

    /// Accepts the stored name or the label in any case.
    pub fn from_form(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL.into_iter().find(|c| {
            c.as_str().eq_ignore_ascii_case(value) || c.label().eq_ignore_ascii_case(value)
        })
    }
}

impl fmt::Display for LookUpCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Debug, DeriveEntityModel)]
#[sea_orm(table_name = "log_lookups")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub category: Option<LookUpCategory>,
    pub created_on: DateTime,
    pub created_by: Option<i32>,
    pub changed_on: DateTime,
    pub changed_by: Option<i32>,
    pub record_status: RecordStatus,
}

/// Two lookups are the same value when they are the same row.
impl PartialEq for Model {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::CreatedBy",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    Creator,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::ChangedBy",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    Modifier,
}

impl_audit_trail!(ActiveModel);
