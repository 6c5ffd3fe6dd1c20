//! Leave allowance entity - A user's yearly day budget for one absence type.
//!
//! One row per (tenant, user, absence type, year). `used_days` only ever moves
//! through signed increments; see `core::allowance::add_used_days`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Leave allowance database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "hr_leave_allowances")]
pub struct Model {
    /// UUID primary key
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Owning tenant
    #[sea_orm(indexed)]
    pub tenant_id: u32,
    /// Employee the allowance belongs to
    pub user_id: u32,
    /// Denormalized employee name
    pub user_name: Option<String>,
    /// Absence type this budget applies to
    pub absence_type_id: String,
    /// Calendar year
    pub year: i32,
    /// Days granted for the year
    pub total_days: f64,
    /// Days consumed by approved requests
    pub used_days: f64,
    /// Days carried over from the previous year
    pub carried_over: f64,
    /// Administrative notes
    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,
    /// Creation time
    pub created_at: DateTimeUtc,
    /// Last modification time
    pub updated_at: DateTimeUtc,
}

impl Model {
    /// Days still available: `total + carried_over - used`.
    #[must_use]
    pub fn remaining(&self) -> f64 {
        self.total_days + self.carried_over - self.used_days
    }
}

/// Defines relationships between `LeaveAllowance` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each allowance belongs to one absence type
    #[sea_orm(
        belongs_to = "super::absence_type::Entity",
        from = "Column::AbsenceTypeId",
        to = "super::absence_type::Column::Id"
    )]
    AbsenceType,
}

impl Related<super::absence_type::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AbsenceType.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
