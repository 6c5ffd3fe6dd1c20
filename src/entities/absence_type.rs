//! Absence type entity - Tenant-configured category of leave.
//!
//! The boolean policy flags (`deducts_from_allowance`, `requires_approval`,
//! `requires_signing`) are read at decision points by the leave request
//! workflow. Names are unique per tenant.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Absence type database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "hr_absence_types")]
pub struct Model {
    /// UUID primary key
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Owning tenant
    #[sea_orm(indexed)]
    pub tenant_id: u32,
    /// Display name, unique within the tenant (e.g. "Vacation", "Sick leave")
    pub name: String,
    /// Free-text description
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    /// Hex color for calendar display
    pub color: Option<String>,
    /// Icon name used by the UI
    pub icon: Option<String>,
    /// Whether approved requests consume allowance days
    pub deducts_from_allowance: bool,
    /// Whether requests need a reviewer decision
    pub requires_approval: bool,
    /// Whether approval goes through the signing gateway
    pub requires_signing: bool,
    /// Template used by the signing gateway
    pub signing_template_id: Option<String>,
    /// Inactive types cannot be used for new requests
    pub is_active: bool,
    /// Display ordering
    pub sort_order: i32,
    /// Free-form metadata
    pub metadata: Option<Json>,
    /// Creation time
    pub created_at: DateTimeUtc,
    /// Last modification time
    pub updated_at: DateTimeUtc,
}

impl Model {
    /// Signing template to use, if this type requires signing and has one configured.
    #[must_use]
    pub fn signing_template(&self) -> Option<&str> {
        if !self.requires_signing {
            return None;
        }
        self.signing_template_id
            .as_deref()
            .filter(|template| !template.is_empty())
    }
}

/// Defines relationships between `AbsenceType` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One absence type has many allowances
    #[sea_orm(has_many = "super::leave_allowance::Entity")]
    LeaveAllowances,
    /// One absence type has many leave requests
    #[sea_orm(has_many = "super::leave_request::Entity")]
    LeaveRequests,
}

impl Related<super::leave_allowance::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LeaveAllowances.def()
    }
}

impl Related<super::leave_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LeaveRequests.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
