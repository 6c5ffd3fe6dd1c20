//! Leave request entity - The central workflow record.
//!
//! A request references its absence type by id only. Reviewer fields are
//! stamped when a decision is initiated, `signing_request_id` links the
//! request to an external signing workflow.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status. Stored as its lowercase string value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum LeaveStatus {
    /// Waiting for a reviewer decision
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Approved; allowance consumed if the type deducts
    #[sea_orm(string_value = "approved")]
    Approved,
    /// Rejected by a reviewer
    #[sea_orm(string_value = "rejected")]
    Rejected,
    /// Withdrawn by the requester or an admin
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
    /// Approval initiated, waiting for the signing workflow to complete
    #[sea_orm(string_value = "awaiting_signing")]
    AwaitingSigning,
}

impl LeaveStatus {
    /// Statuses that block overlapping requests and can still be cancelled.
    pub const ACTIVE: [Self; 3] = [Self::Pending, Self::Approved, Self::AwaitingSigning];

    /// Lowercase wire/storage name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
            Self::AwaitingSigning => "awaiting_signing",
        }
    }

    /// Whether the request still occupies its date range.
    #[must_use]
    pub fn is_active(self) -> bool {
        Self::ACTIVE.contains(&self)
    }
}

impl fmt::Display for LeaveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Leave request database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "hr_leave_requests")]
pub struct Model {
    /// UUID primary key
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Owning tenant
    #[sea_orm(indexed)]
    pub tenant_id: u32,
    /// Requesting employee
    #[sea_orm(indexed)]
    pub user_id: u32,
    /// Employee name captured at creation
    pub user_name: Option<String>,
    /// Org unit name captured at creation
    pub org_unit_name: Option<String>,
    /// Referenced absence type
    pub absence_type_id: String,
    /// First day of absence
    pub start_date: Date,
    /// Last day of absence (inclusive)
    pub end_date: Date,
    /// Business days consumed
    pub days: f64,
    /// Current lifecycle status
    pub status: LeaveStatus,
    /// Requester's reason
    #[sea_orm(column_type = "Text", nullable)]
    pub reason: Option<String>,
    /// Requester's notes
    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,
    /// Reviewer user id
    pub reviewed_by: Option<u32>,
    /// Reviewer display name
    pub reviewer_name: Option<String>,
    /// When the review decision was initiated
    pub reviewed_at: Option<DateTimeUtc>,
    /// Reviewer's notes
    #[sea_orm(column_type = "Text", nullable)]
    pub review_notes: Option<String>,
    /// External signing request, set while or after awaiting signing
    #[sea_orm(indexed)]
    pub signing_request_id: Option<String>,
    /// Free-form metadata
    pub metadata: Option<Json>,
    /// Creation time
    pub created_at: DateTimeUtc,
    /// Last modification time
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between `LeaveRequest` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each request references one absence type
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
