//! Leave request business logic - the request lifecycle state machine.
//!
//! ```text
//! pending --approve--> approved
//! pending --approve (signing)--> awaiting_signing --signing completed--> approved
//!                                       |
//!                                gateway failure --> pending
//! pending --reject--> rejected
//! pending | approved | awaiting_signing --cancel--> cancelled
//! ```
//!
//! Every transition is a single `UPDATE ... WHERE id = ? AND status = ?`, so a
//! request that changed status since it was read is never overwritten.
//! Allowance changes caused by a transition run in a savepoint of the same
//! transaction and are best-effort: a failed deduction or refund is logged and
//! the transition still commits.

use crate::{
    context::CallerContext,
    core::{
        Paged, Pagination,
        absence_type::find_absence_type,
        allowance::{LedgerKey, apply_used_days_best_effort, get_balance},
        begin_serializable,
        business_days::business_days,
        overlap::has_overlap,
    },
    entities::{AbsenceType, LeaveRequest, LeaveStatus, absence_type, leave_request},
    errors::{Error, Result},
    signing::{SigningFieldValue, SigningGateway, SigningRecipient, SigningRequest},
};
use chrono::{Datelike, Months, NaiveDate};
use sea_orm::{
    ConnectionTrait, PaginatorTrait, QueryOrder, Set, TransactionTrait, prelude::*,
    sea_query::Expr,
};
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

/// Input for [`create_leave_request`].
#[derive(Debug, Clone, Default)]
pub struct NewLeaveRequest {
    /// Employee taking the leave
    pub user_id: u32,
    /// Absence type to book against
    pub absence_type_id: String,
    /// First day of absence
    pub start_date: NaiveDate,
    /// Last day of absence (inclusive)
    pub end_date: NaiveDate,
    /// Explicit day count; business days are computed when absent or not positive
    pub days: Option<f64>,
    /// Requester's reason
    pub reason: Option<String>,
    /// Requester's notes
    pub notes: Option<String>,
    /// Free-form metadata
    pub metadata: Option<Json>,
    /// Employee display name
    pub user_name: Option<String>,
    /// Org unit display name
    pub org_unit_name: Option<String>,
}

impl NewLeaveRequest {
    /// A request for `user_id` covering `start_date..=end_date`.
    pub fn new(
        user_id: u32,
        absence_type_id: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        Self {
            user_id,
            absence_type_id: absence_type_id.into(),
            start_date,
            end_date,
            ..Default::default()
        }
    }
}

/// Reviewer input for [`approve_leave_request`].
///
/// The email fields are only used when the absence type requires signing.
#[derive(Debug, Clone, Default)]
pub struct ApproveLeaveRequest {
    /// Reviewer's notes
    pub review_notes: Option<String>,
    /// Approver's email, first signer
    pub approver_email: String,
    /// Approver display name; defaults to the caller's username
    pub approver_name: Option<String>,
    /// Requester's email, second signer
    pub requester_email: String,
}

/// Partial edit of the free-text fields of a request.
#[derive(Debug, Clone, Default)]
pub struct LeaveRequestUpdate {
    /// New reason
    pub reason: Option<String>,
    /// New notes
    pub notes: Option<String>,
    /// New metadata
    pub metadata: Option<Json>,
}

/// Filters for [`list_leave_requests`].
#[derive(Debug, Clone, Default)]
pub struct LeaveRequestFilter {
    /// Only this employee
    pub user_id: Option<u32>,
    /// Only this absence type
    pub absence_type_id: Option<String>,
    /// Only this status
    pub status: Option<LeaveStatus>,
    /// Requests starting on or after this date
    pub start_from: Option<NaiveDate>,
    /// Requests ending on or before this date
    pub end_until: Option<NaiveDate>,
}

/// Range and scope of a calendar query. Unset dates default to one month
/// back and two months ahead of today.
#[derive(Debug, Clone, Default)]
pub struct CalendarQuery {
    /// Range start
    pub from: Option<NaiveDate>,
    /// Range end (exclusive)
    pub to: Option<NaiveDate>,
    /// Only requests captured with this org unit
    pub org_unit_name: Option<String>,
    /// Only this employee
    pub user_id: Option<u32>,
}

/// A non-terminal request as shown on a team calendar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarEvent {
    /// Leave request id
    pub id: String,
    /// Employee
    pub user_id: u32,
    /// Employee name captured at creation
    pub user_name: Option<String>,
    /// Org unit captured at creation
    pub org_unit_name: Option<String>,
    /// Absence type id
    pub absence_type_id: String,
    /// Absence type name, if the type still exists
    pub absence_type_name: Option<String>,
    /// Absence type color
    pub color: Option<String>,
    /// First day
    pub start_date: NaiveDate,
    /// Last day (inclusive)
    pub end_date: NaiveDate,
    /// Business days
    pub days: f64,
    /// Current status
    pub status: LeaveStatus,
}

/// Result of handling a signing completion.
#[derive(Debug, Clone, PartialEq)]
#[allow(clippy::large_enum_variant)]
pub enum SigningOutcome {
    /// The request moved from awaiting signing to approved
    Approved(leave_request::Model),
    /// No request carries the signing request id
    NoMatchingRequest,
    /// The request exists but is no longer awaiting signing
    NotAwaitingSigning(LeaveStatus),
}

/// How a transition treats the reviewer columns.
enum Review<'a> {
    /// Leave them as they are
    Keep,
    /// Attribute the decision to the caller
    Stamp {
        caller: &'a CallerContext,
        notes: Option<String>,
    },
    /// Reset all reviewer columns
    Clear,
}

/// Moves a request from `from` to `to` if it is still in `from`.
///
/// Returns the updated row, or `None` when the status guard did not match.
async fn transition<C>(
    conn: &C,
    request_id: &str,
    from: LeaveStatus,
    to: LeaveStatus,
    review: Review<'_>,
) -> Result<Option<leave_request::Model>>
where
    C: ConnectionTrait,
{
    let now = chrono::Utc::now();
    let mut change = leave_request::ActiveModel {
        status: Set(to),
        updated_at: Set(now),
        ..Default::default()
    };

    match review {
        Review::Keep => {}
        Review::Stamp { caller, notes } => {
            change.reviewed_by = Set(Some(caller.user_id()));
            change.reviewer_name = Set(Some(caller.username().to_string()));
            change.reviewed_at = Set(Some(now));
            if let Some(notes) = notes.filter(|n| !n.is_empty()) {
                change.review_notes = Set(Some(notes));
            }
        }
        Review::Clear => {
            change.reviewed_by = Set(None);
            change.reviewer_name = Set(None);
            change.reviewed_at = Set(None);
            change.review_notes = Set(None);
        }
    }

    let result = LeaveRequest::update_many()
        .set(change)
        .filter(leave_request::Column::Id.eq(request_id))
        .filter(leave_request::Column::Status.eq(from))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        return Ok(None);
    }

    debug!(leave_request_id = request_id, %from, %to, "Leave request transitioned");
    LeaveRequest::find_by_id(request_id)
        .one(conn)
        .await
        .map_err(Into::into)
}

fn not_found(id: &str) -> Error {
    Error::NotFound {
        entity: "leave request",
        id: id.to_string(),
    }
}

fn ledger_key(request: &leave_request::Model) -> LedgerKey<'_> {
    LedgerKey {
        tenant_id: request.tenant_id,
        user_id: request.user_id,
        absence_type_id: &request.absence_type_id,
        year: request.start_date.year(),
    }
}

async fn load_request<C>(conn: &C, tenant_id: u32, id: &str) -> Result<leave_request::Model>
where
    C: ConnectionTrait,
{
    LeaveRequest::find_by_id(id)
        .filter(leave_request::Column::TenantId.eq(tenant_id))
        .one(conn)
        .await?
        .ok_or_else(|| not_found(id))
}

fn ensure_pending(request: &leave_request::Model, action: &str) -> Result<()> {
    if request.status == LeaveStatus::Pending {
        Ok(())
    } else {
        Err(Error::bad_request(format!(
            "only pending requests can be {action} (status is {})",
            request.status
        )))
    }
}

/// Creates a leave request.
///
/// The overlap check, balance check, insert and any immediate deduction
/// share one transaction so concurrent creates for the same user cannot both
/// pass the overlap check.
///
/// # Errors
/// - `NotFound` if the absence type does not exist in the tenant or is inactive
/// - `InvalidDateRange` if `end_date < start_date`
/// - `OverlapExists` if another non-terminal request intersects the range
/// - `NoAllowance` / `InsufficientAllowance` for deducting types
#[instrument(skip(db, caller, input), fields(tenant_id = caller.tenant_id(), user_id = input.user_id))]
pub async fn create_leave_request(
    db: &DatabaseConnection,
    caller: &CallerContext,
    input: NewLeaveRequest,
) -> Result<leave_request::Model> {
    let tenant_id = caller.tenant_id();
    let absence = find_absence_type(db, tenant_id, &input.absence_type_id)
        .await?
        .filter(|t| t.is_active)
        .ok_or_else(|| Error::NotFound {
            entity: "absence type",
            id: input.absence_type_id.clone(),
        })?;

    if input.end_date < input.start_date {
        return Err(Error::InvalidDateRange);
    }

    let days = input
        .days
        .filter(|d| d.is_finite() && *d > 0.0)
        .unwrap_or_else(|| business_days(input.start_date, input.end_date));

    let txn = begin_serializable(db).await?;

    if has_overlap(
        &txn,
        tenant_id,
        input.user_id,
        input.start_date,
        input.end_date,
        None,
    )
    .await?
    {
        return Err(Error::OverlapExists);
    }

    if absence.deducts_from_allowance {
        let balance = get_balance(
            &txn,
            tenant_id,
            input.user_id,
            &absence.id,
            input.start_date.year(),
        )
        .await?
        .ok_or(Error::NoAllowance)?;

        let remaining = balance.remaining();
        if days > remaining {
            return Err(Error::InsufficientAllowance {
                requested: days,
                remaining,
            });
        }
    }

    let status = if absence.requires_approval {
        LeaveStatus::Pending
    } else {
        LeaveStatus::Approved
    };

    let now = chrono::Utc::now();
    let request = leave_request::ActiveModel {
        id: Set(uuid::Uuid::new_v4().to_string()),
        tenant_id: Set(tenant_id),
        user_id: Set(input.user_id),
        user_name: Set(input.user_name),
        org_unit_name: Set(input.org_unit_name),
        absence_type_id: Set(absence.id.clone()),
        start_date: Set(input.start_date),
        end_date: Set(input.end_date),
        days: Set(days),
        status: Set(status),
        reason: Set(input.reason),
        notes: Set(input.notes),
        reviewed_by: Set(None),
        reviewer_name: Set(None),
        reviewed_at: Set(None),
        review_notes: Set(None),
        signing_request_id: Set(None),
        metadata: Set(input.metadata),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&txn)
    .await?;

    if status == LeaveStatus::Approved && absence.deducts_from_allowance {
        apply_used_days_best_effort(&txn, ledger_key(&request), days, &request.id).await;
    }

    txn.commit().await?;

    info!(
        leave_request_id = %request.id,
        %status,
        days,
        "Created leave request"
    );
    Ok(request)
}

/// Approves a pending request.
///
/// For absence types that require signing and have a template, the request
/// moves to `awaiting_signing` and a signing request is created through
/// `gateway`; the final approval arrives later via [`complete_signing`]. If the
/// gateway call fails the request is moved back to `pending` and an
/// `Internal` error is returned.
///
/// The reviewer is attributed when approval is initiated.
#[instrument(skip(db, gateway, caller, input), fields(tenant_id = caller.tenant_id()))]
pub async fn approve_leave_request(
    db: &DatabaseConnection,
    gateway: &dyn SigningGateway,
    caller: &CallerContext,
    leave_request_id: &str,
    input: ApproveLeaveRequest,
) -> Result<leave_request::Model> {
    let existing = load_request(db, caller.tenant_id(), leave_request_id).await?;
    ensure_pending(&existing, "approved")?;

    let absence = find_absence_type(db, caller.tenant_id(), &existing.absence_type_id)
        .await?
        .ok_or_else(|| Error::NotFound {
            entity: "absence type",
            id: existing.absence_type_id.clone(),
        })?;

    if let Some(template_id) = absence.signing_template() {
        return approve_with_signing(db, gateway, caller, &existing, template_id, input).await;
    }

    approve_immediately(db, caller, &existing, &absence, input.review_notes).await
}

async fn approve_immediately(
    db: &DatabaseConnection,
    caller: &CallerContext,
    existing: &leave_request::Model,
    absence: &absence_type::Model,
    review_notes: Option<String>,
) -> Result<leave_request::Model> {
    let txn = db.begin().await?;

    let approved = transition(
        &txn,
        &existing.id,
        LeaveStatus::Pending,
        LeaveStatus::Approved,
        Review::Stamp {
            caller,
            notes: review_notes,
        },
    )
    .await?
    .ok_or_else(|| Error::bad_request("only pending requests can be approved"))?;

    if absence.deducts_from_allowance {
        apply_used_days_best_effort(&txn, ledger_key(&approved), approved.days, &approved.id)
            .await;
    }

    txn.commit().await?;
    info!(leave_request_id = %approved.id, "Leave request approved");
    Ok(approved)
}

async fn approve_with_signing(
    db: &DatabaseConnection,
    gateway: &dyn SigningGateway,
    caller: &CallerContext,
    existing: &leave_request::Model,
    template_id: &str,
    input: ApproveLeaveRequest,
) -> Result<leave_request::Model> {
    let awaiting = transition(
        db,
        &existing.id,
        LeaveStatus::Pending,
        LeaveStatus::AwaitingSigning,
        Review::Stamp {
            caller,
            notes: input.review_notes,
        },
    )
    .await?
    .ok_or_else(|| Error::bad_request("only pending requests can be approved"))?;

    let request = build_signing_request(
        &awaiting,
        template_id,
        caller,
        input.approver_email,
        input.approver_name,
        input.requester_email,
    );

    let signing_request_id = match gateway.create_signing_request(request).await {
        Ok(id) if !id.is_empty() => id,
        outcome => {
            match outcome {
                Err(e) => error!(
                    leave_request_id = %awaiting.id,
                    error = %e,
                    "Failed to create signing request, rolling back to pending"
                ),
                Ok(_) => error!(
                    leave_request_id = %awaiting.id,
                    "Signing service returned an empty request id, rolling back to pending"
                ),
            }
            let rolled_back = transition(
                db,
                &awaiting.id,
                LeaveStatus::AwaitingSigning,
                LeaveStatus::Pending,
                Review::Clear,
            )
            .await?;
            if rolled_back.is_none() {
                warn!(leave_request_id = %awaiting.id, "Leave request left awaiting signing during rollback");
            }
            return Err(Error::internal("failed to create signing request"));
        }
    };

    LeaveRequest::update_many()
        .col_expr(
            leave_request::Column::SigningRequestId,
            Expr::value(signing_request_id.clone()),
        )
        .filter(leave_request::Column::Id.eq(awaiting.id.as_str()))
        .exec(db)
        .await?;

    info!(
        leave_request_id = %awaiting.id,
        signing_request_id = %signing_request_id,
        "Leave request awaiting signing"
    );
    load_request(db, awaiting.tenant_id, &awaiting.id).await
}

fn build_signing_request(
    request: &leave_request::Model,
    template_id: &str,
    caller: &CallerContext,
    approver_email: String,
    approver_name: Option<String>,
    requester_email: String,
) -> SigningRequest {
    let approver_name = approver_name
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| caller.username().to_string());
    let requester_name = request.user_name.clone().unwrap_or_default();
    let start = request.start_date.format("%Y-%m-%d").to_string();
    let end = request.end_date.format("%Y-%m-%d").to_string();

    SigningRequest {
        tenant_id: request.tenant_id,
        template_id: template_id.to_string(),
        name: format!("Leave Request - {requester_name} ({start} to {end})"),
        message: format!(
            "Please sign the absence approval for {requester_name}. Period: {start} to {end} ({:.1} days).",
            request.days
        ),
        recipients: vec![
            SigningRecipient {
                email: approver_email,
                name: approver_name,
                signing_order: 1,
            },
            SigningRecipient {
                email: requester_email,
                name: requester_name,
                signing_order: 2,
            },
        ],
        field_values: vec![
            SigningFieldValue::new("StartDate", start),
            SigningFieldValue::new("EndDate", end),
            SigningFieldValue::new("TotalDays", format!("{:.1}", request.days)),
        ],
    }
}

/// Rejects a pending request. No allowance effect.
#[instrument(skip(db, caller), fields(tenant_id = caller.tenant_id()))]
pub async fn reject_leave_request(
    db: &DatabaseConnection,
    caller: &CallerContext,
    leave_request_id: &str,
    review_notes: Option<String>,
) -> Result<leave_request::Model> {
    let existing = load_request(db, caller.tenant_id(), leave_request_id).await?;
    ensure_pending(&existing, "rejected")?;

    let rejected = transition(
        db,
        &existing.id,
        LeaveStatus::Pending,
        LeaveStatus::Rejected,
        Review::Stamp {
            caller,
            notes: review_notes,
        },
    )
    .await?
    .ok_or_else(|| Error::bad_request("only pending requests can be rejected"))?;

    info!(leave_request_id = %rejected.id, "Leave request rejected");
    Ok(rejected)
}

/// Cancels a pending, approved or awaiting-signing request.
///
/// Cancelling an approved request of a deducting type refunds its days.
/// Rejected and cancelled requests cannot be cancelled again.
#[instrument(skip(db, caller), fields(tenant_id = caller.tenant_id()))]
pub async fn cancel_leave_request(
    db: &DatabaseConnection,
    caller: &CallerContext,
    leave_request_id: &str,
) -> Result<leave_request::Model> {
    let txn = db.begin().await?;

    let existing = load_request(&txn, caller.tenant_id(), leave_request_id).await?;
    if !existing.status.is_active() {
        return Err(Error::bad_request(format!(
            "leave request is already {}",
            existing.status
        )));
    }

    let deducts = find_absence_type(&txn, existing.tenant_id, &existing.absence_type_id)
        .await?
        .is_some_and(|t| t.deducts_from_allowance);

    let cancelled = transition(
        &txn,
        &existing.id,
        existing.status,
        LeaveStatus::Cancelled,
        Review::Clear,
    )
    .await?
    .ok_or_else(|| Error::bad_request("leave request status changed, retry the cancellation"))?;

    if existing.status == LeaveStatus::Approved && deducts {
        apply_used_days_best_effort(&txn, ledger_key(&existing), -existing.days, &existing.id)
            .await;
    }

    txn.commit().await?;
    info!(
        leave_request_id = %cancelled.id,
        previous_status = %existing.status,
        "Leave request cancelled"
    );
    Ok(cancelled)
}

/// Finishes the approval of a request whose signing workflow completed.
///
/// Requests are matched on the signing request id alone. When the event
/// names a tenant, a request of another tenant is not touched.
///
/// Requests not awaiting signing are left untouched, so redelivered events
/// are harmless. Reviewer fields are not re-stamped.
#[instrument(skip(db))]
pub async fn complete_signing(
    db: &DatabaseConnection,
    event_tenant: Option<u32>,
    signing_request_id: &str,
) -> Result<SigningOutcome> {
    let txn = db.begin().await?;

    let Some(request) = LeaveRequest::find()
        .filter(leave_request::Column::SigningRequestId.eq(signing_request_id))
        .one(&txn)
        .await?
    else {
        return Ok(SigningOutcome::NoMatchingRequest);
    };

    if let Some(event_tenant) = event_tenant.filter(|tenant| *tenant != request.tenant_id) {
        warn!(
            leave_request_id = %request.id,
            event_tenant,
            request_tenant = request.tenant_id,
            "Signing event tenant does not match leave request, ignoring"
        );
        return Ok(SigningOutcome::NoMatchingRequest);
    }
    let tenant_id = request.tenant_id;

    if request.status != LeaveStatus::AwaitingSigning {
        return Ok(SigningOutcome::NotAwaitingSigning(request.status));
    }

    let deducts = find_absence_type(&txn, tenant_id, &request.absence_type_id)
        .await?
        .is_some_and(|t| t.deducts_from_allowance);

    let Some(approved) = transition(
        &txn,
        &request.id,
        LeaveStatus::AwaitingSigning,
        LeaveStatus::Approved,
        Review::Keep,
    )
    .await?
    else {
        let current = load_request(&txn, tenant_id, &request.id).await?;
        return Ok(SigningOutcome::NotAwaitingSigning(current.status));
    };

    if deducts {
        apply_used_days_best_effort(&txn, ledger_key(&approved), approved.days, &approved.id)
            .await;
    }

    txn.commit().await?;
    info!(leave_request_id = %approved.id, "Leave request approved after signing completed");
    Ok(SigningOutcome::Approved(approved))
}

/// Retrieves a request within the caller's tenant.
pub async fn get_leave_request(
    db: &DatabaseConnection,
    caller: &CallerContext,
    leave_request_id: &str,
) -> Result<leave_request::Model> {
    load_request(db, caller.tenant_id(), leave_request_id).await
}

/// Lists requests, newest first.
pub async fn list_leave_requests(
    db: &DatabaseConnection,
    caller: &CallerContext,
    filter: LeaveRequestFilter,
    pagination: Pagination,
) -> Result<Paged<leave_request::Model>> {
    let mut query =
        LeaveRequest::find().filter(leave_request::Column::TenantId.eq(caller.tenant_id()));

    if let Some(user_id) = filter.user_id {
        query = query.filter(leave_request::Column::UserId.eq(user_id));
    }
    if let Some(absence_type_id) = filter.absence_type_id {
        query = query.filter(leave_request::Column::AbsenceTypeId.eq(absence_type_id));
    }
    if let Some(status) = filter.status {
        query = query.filter(leave_request::Column::Status.eq(status));
    }
    if let Some(from) = filter.start_from {
        query = query.filter(leave_request::Column::StartDate.gte(from));
    }
    if let Some(until) = filter.end_until {
        query = query.filter(leave_request::Column::EndDate.lte(until));
    }

    let total = query.clone().count(db).await?;
    let items = pagination
        .apply(
            query
                .order_by_desc(leave_request::Column::CreatedAt)
                .order_by_desc(leave_request::Column::Id),
        )
        .all(db)
        .await?;

    Ok(Paged { items, total })
}

/// Edits reason, notes or metadata. Status and dates are not editable.
pub async fn update_leave_request(
    db: &DatabaseConnection,
    caller: &CallerContext,
    leave_request_id: &str,
    update: LeaveRequestUpdate,
) -> Result<leave_request::Model> {
    let existing = load_request(db, caller.tenant_id(), leave_request_id).await?;
    let mut active: leave_request::ActiveModel = existing.into();

    if let Some(reason) = update.reason {
        active.reason = Set(Some(reason));
    }
    if let Some(notes) = update.notes {
        active.notes = Set(Some(notes));
    }
    if let Some(metadata) = update.metadata {
        active.metadata = Set(Some(metadata));
    }
    active.updated_at = Set(chrono::Utc::now());

    active.update(db).await.map_err(Into::into)
}

/// Deletes a request. No allowance effect.
pub async fn delete_leave_request(
    db: &DatabaseConnection,
    caller: &CallerContext,
    leave_request_id: &str,
) -> Result<()> {
    let result = LeaveRequest::delete_many()
        .filter(leave_request::Column::Id.eq(leave_request_id))
        .filter(leave_request::Column::TenantId.eq(caller.tenant_id()))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(not_found(leave_request_id));
    }
    info!(leave_request_id, "Deleted leave request");
    Ok(())
}

/// Non-terminal requests intersecting `[from, to)`, ordered by start date.
pub async fn calendar_events(
    db: &DatabaseConnection,
    caller: &CallerContext,
    query: CalendarQuery,
) -> Result<Vec<CalendarEvent>> {
    let today = chrono::Utc::now().date_naive();
    let from = query
        .from
        .unwrap_or_else(|| today.checked_sub_months(Months::new(1)).unwrap_or(today));
    let to = query
        .to
        .unwrap_or_else(|| today.checked_add_months(Months::new(2)).unwrap_or(today));

    let mut select = LeaveRequest::find()
        .filter(leave_request::Column::TenantId.eq(caller.tenant_id()))
        .filter(leave_request::Column::Status.is_in(LeaveStatus::ACTIVE))
        .filter(leave_request::Column::StartDate.lt(to))
        .filter(leave_request::Column::EndDate.gt(from));

    if let Some(user_id) = query.user_id {
        select = select.filter(leave_request::Column::UserId.eq(user_id));
    }
    if let Some(org_unit) = query.org_unit_name.filter(|o| !o.is_empty()) {
        select = select.filter(leave_request::Column::OrgUnitName.eq(org_unit));
    }

    let rows = select
        .find_also_related(AbsenceType)
        .order_by_asc(leave_request::Column::StartDate)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(request, absence)| CalendarEvent {
            absence_type_name: absence.as_ref().map(|t| t.name.clone()),
            color: absence.and_then(|t| t.color),
            id: request.id,
            user_id: request.user_id,
            user_name: request.user_name,
            org_unit_name: request.org_unit_name,
            absence_type_id: request.absence_type_id,
            start_date: request.start_date,
            end_date: request.end_date,
            days: request.days,
            status: request.status,
        })
        .collect())
}
