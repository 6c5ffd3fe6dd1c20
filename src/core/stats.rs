//! Tenant-level counters for dashboards.

use crate::{
    context::CallerContext,
    entities::{AbsenceType, LeaveRequest, LeaveStatus, absence_type, leave_request},
    errors::Result,
};
use sea_orm::{ConnectionTrait, PaginatorTrait, prelude::*};
use serde::Serialize;

/// Request and configuration counts of one tenant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TenantStats {
    /// Configured absence types, active or not
    pub total_absence_types: u64,
    /// All leave requests
    pub total_requests: u64,
    /// Requests waiting for a decision
    pub pending_requests: u64,
    /// Approved requests
    pub approved_requests: u64,
    /// Rejected requests
    pub rejected_requests: u64,
    /// Cancelled requests
    pub cancelled_requests: u64,
    /// Requests waiting for signatures
    pub awaiting_signing_requests: u64,
}

/// Number of requests in `status` for a tenant.
pub async fn count_by_status<C>(conn: &C, tenant_id: u32, status: LeaveStatus) -> Result<u64>
where
    C: ConnectionTrait,
{
    LeaveRequest::find()
        .filter(leave_request::Column::TenantId.eq(tenant_id))
        .filter(leave_request::Column::Status.eq(status))
        .count(conn)
        .await
        .map_err(Into::into)
}

/// Collects the dashboard counters of the caller's tenant.
pub async fn tenant_stats(db: &DatabaseConnection, caller: &CallerContext) -> Result<TenantStats> {
    let tenant_id = caller.tenant_id();

    let total_absence_types = AbsenceType::find()
        .filter(absence_type::Column::TenantId.eq(tenant_id))
        .count(db)
        .await?;
    let total_requests = LeaveRequest::find()
        .filter(leave_request::Column::TenantId.eq(tenant_id))
        .count(db)
        .await?;

    Ok(TenantStats {
        total_absence_types,
        total_requests,
        pending_requests: count_by_status(db, tenant_id, LeaveStatus::Pending).await?,
        approved_requests: count_by_status(db, tenant_id, LeaveStatus::Approved).await?,
        rejected_requests: count_by_status(db, tenant_id, LeaveStatus::Rejected).await?,
        cancelled_requests: count_by_status(db, tenant_id, LeaveStatus::Cancelled).await?,
        awaiting_signing_requests: count_by_status(db, tenant_id, LeaveStatus::AwaitingSigning)
            .await?,
    })
}
