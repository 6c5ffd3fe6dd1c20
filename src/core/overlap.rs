//! Overlap checker - guards against double-booking a user's calendar.
//!
//! Only requests in an active status (pending, approved, awaiting signing)
//! block. The comparison is half-open: an existing request overlaps the
//! candidate range when `existing.start < end AND existing.end > start`.

use crate::{
    entities::{LeaveRequest, LeaveStatus, leave_request},
    errors::Result,
};
use chrono::NaiveDate;
use sea_orm::{ConnectionTrait, PaginatorTrait, prelude::*};

/// Returns whether any active request of `user_id` intersects `[start, end)`.
///
/// `exclude_id` skips one request, for re-checking an existing request
/// against the rest of the calendar.
///
/// Run this on the same transaction as the subsequent insert so that two
/// concurrent creates cannot both pass.
pub async fn has_overlap<C>(
    conn: &C,
    tenant_id: u32,
    user_id: u32,
    start: NaiveDate,
    end: NaiveDate,
    exclude_id: Option<&str>,
) -> Result<bool>
where
    C: ConnectionTrait,
{
    let mut query = LeaveRequest::find()
        .filter(leave_request::Column::TenantId.eq(tenant_id))
        .filter(leave_request::Column::UserId.eq(user_id))
        .filter(leave_request::Column::Status.is_in(LeaveStatus::ACTIVE))
        .filter(leave_request::Column::StartDate.lt(end))
        .filter(leave_request::Column::EndDate.gt(start));

    if let Some(id) = exclude_id {
        query = query.filter(leave_request::Column::Id.ne(id));
    }

    let count = query.count(conn).await?;
    Ok(count > 0)
}
