//! Allowance ledger - yearly day budgets per (tenant, user, absence type, year).
//!
//! Used days are only ever changed through [`add_used_days`], a single
//! `UPDATE ... SET used_days = used_days + delta` statement, so concurrent
//! approvals and refunds cannot lose updates. The ledger does not enforce
//! `used_days <= total_days + carried_over`; the leave request workflow checks
//! the balance when a request is created.

use crate::{
    context::CallerContext,
    core::{Paged, Pagination},
    entities::{AbsenceType, LeaveAllowance, leave_allowance},
    errors::{Error, Result},
};
use chrono::Datelike;
use sea_orm::{
    ConnectionTrait, DatabaseTransaction, PaginatorTrait, QueryOrder, Set, SqlErr,
    TransactionTrait, prelude::*, sea_query::Expr,
};
use tracing::{debug, info, instrument, warn};

/// Snapshot of an allowance row's quantities.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Balance {
    /// Days granted for the year
    pub total: f64,
    /// Days consumed
    pub used: f64,
    /// Days carried over from the previous year
    pub carried_over: f64,
}

impl Balance {
    /// Days still available: `total + carried_over - used`.
    #[must_use]
    pub fn remaining(&self) -> f64 {
        self.total + self.carried_over - self.used
    }
}

impl From<&leave_allowance::Model> for Balance {
    fn from(model: &leave_allowance::Model) -> Self {
        Self {
            total: model.total_days,
            used: model.used_days,
            carried_over: model.carried_over,
        }
    }
}

/// Input for creating an allowance row.
#[derive(Debug, Clone, Default)]
pub struct NewAllowance {
    /// Employee
    pub user_id: u32,
    /// Denormalized employee name
    pub user_name: Option<String>,
    /// Absence type the budget applies to
    pub absence_type_id: String,
    /// Calendar year
    pub year: i32,
    /// Days granted
    pub total_days: f64,
    /// Days carried over from the previous year
    pub carried_over: f64,
    /// Administrative notes
    pub notes: Option<String>,
}

/// Partial administrative edit. `used_days` is deliberately absent.
#[derive(Debug, Clone, Default)]
pub struct AllowanceUpdate {
    /// New yearly grant
    pub total_days: Option<f64>,
    /// New carried-over amount
    pub carried_over: Option<f64>,
    /// New notes
    pub notes: Option<String>,
}

/// Filters for [`list_allowances`].
#[derive(Debug, Clone, Default)]
pub struct AllowanceFilter {
    /// Only this employee
    pub user_id: Option<u32>,
    /// Only this year
    pub year: Option<i32>,
    /// Only this absence type
    pub absence_type_id: Option<String>,
}

fn validate_quantity(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(Error::bad_request(format!(
            "{field} must be a non-negative number, got {value}"
        )));
    }
    Ok(())
}

/// Creates an allowance row. Fails with `AlreadyExists` if the tuple is taken.
#[instrument(skip(db, caller, input), fields(tenant_id = caller.tenant_id(), user_id = input.user_id))]
pub async fn create_allowance(
    db: &DatabaseConnection,
    caller: &CallerContext,
    input: NewAllowance,
) -> Result<leave_allowance::Model> {
    validate_quantity("total_days", input.total_days)?;
    validate_quantity("carried_over", input.carried_over)?;

    crate::core::absence_type::get_absence_type(db, caller, &input.absence_type_id).await?;

    if find_allowance(
        db,
        caller.tenant_id(),
        input.user_id,
        &input.absence_type_id,
        input.year,
    )
    .await?
    .is_some()
    {
        return Err(duplicate_allowance());
    }

    let now = chrono::Utc::now();
    let allowance = leave_allowance::ActiveModel {
        id: Set(uuid::Uuid::new_v4().to_string()),
        tenant_id: Set(caller.tenant_id()),
        user_id: Set(input.user_id),
        user_name: Set(input.user_name),
        absence_type_id: Set(input.absence_type_id),
        year: Set(input.year),
        total_days: Set(input.total_days),
        used_days: Set(0.0),
        carried_over: Set(input.carried_over),
        notes: Set(input.notes),
        created_at: Set(now),
        updated_at: Set(now),
    };

    let created = allowance.insert(db).await.map_err(|err| {
        if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
            duplicate_allowance()
        } else {
            Error::from(err)
        }
    })?;
    info!(allowance_id = %created.id, "Created leave allowance");
    Ok(created)
}

fn duplicate_allowance() -> Error {
    Error::AlreadyExists {
        message: "allowance already exists for this user, type, and year".to_string(),
    }
}

/// Retrieves an allowance by id within the caller's tenant.
pub async fn get_allowance(
    db: &DatabaseConnection,
    caller: &CallerContext,
    allowance_id: &str,
) -> Result<leave_allowance::Model> {
    LeaveAllowance::find_by_id(allowance_id)
        .filter(leave_allowance::Column::TenantId.eq(caller.tenant_id()))
        .one(db)
        .await?
        .ok_or_else(|| Error::NotFound {
            entity: "leave allowance",
            id: allowance_id.to_string(),
        })
}

/// Lists allowances of the caller's tenant, ordered by year.
pub async fn list_allowances(
    db: &DatabaseConnection,
    caller: &CallerContext,
    filter: AllowanceFilter,
    pagination: Pagination,
) -> Result<Paged<leave_allowance::Model>> {
    let mut query =
        LeaveAllowance::find().filter(leave_allowance::Column::TenantId.eq(caller.tenant_id()));

    if let Some(user_id) = filter.user_id {
        query = query.filter(leave_allowance::Column::UserId.eq(user_id));
    }
    if let Some(year) = filter.year {
        query = query.filter(leave_allowance::Column::Year.eq(year));
    }
    if let Some(absence_type_id) = filter.absence_type_id {
        query = query.filter(leave_allowance::Column::AbsenceTypeId.eq(absence_type_id));
    }

    let total = query.clone().count(db).await?;
    let items = pagination
        .apply(query.order_by_asc(leave_allowance::Column::Year))
        .all(db)
        .await?;

    Ok(Paged { items, total })
}

/// Balance of one absence type in a user's year, with display details.
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceEntry {
    /// Absence type the allowance belongs to
    pub absence_type_id: String,
    /// Absence type name, if the type still exists
    pub absence_type_name: Option<String>,
    /// Calendar color of the absence type
    pub color: Option<String>,
    /// Quantities of the allowance row
    pub balance: Balance,
}

impl BalanceEntry {
    /// Days still available.
    #[must_use]
    pub fn remaining_days(&self) -> f64 {
        self.balance.remaining()
    }
}

/// Per-type balances of one user. `year` defaults to the current year.
pub async fn user_balance(
    db: &DatabaseConnection,
    caller: &CallerContext,
    user_id: u32,
    year: Option<i32>,
) -> Result<Vec<BalanceEntry>> {
    let year = year.unwrap_or_else(|| chrono::Utc::now().year());
    let rows = LeaveAllowance::find()
        .find_also_related(AbsenceType)
        .filter(leave_allowance::Column::TenantId.eq(caller.tenant_id()))
        .filter(leave_allowance::Column::UserId.eq(user_id))
        .filter(leave_allowance::Column::Year.eq(year))
        .order_by_asc(leave_allowance::Column::AbsenceTypeId)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(allowance, absence)| BalanceEntry {
            balance: Balance::from(&allowance),
            absence_type_id: allowance.absence_type_id,
            absence_type_name: absence.as_ref().map(|t| t.name.clone()),
            color: absence.and_then(|t| t.color),
        })
        .collect())
}

/// Applies an administrative edit to total, carried-over or notes.
pub async fn update_allowance(
    db: &DatabaseConnection,
    caller: &CallerContext,
    allowance_id: &str,
    update: AllowanceUpdate,
) -> Result<leave_allowance::Model> {
    let existing = get_allowance(db, caller, allowance_id).await?;
    let mut active: leave_allowance::ActiveModel = existing.into();

    if let Some(total_days) = update.total_days {
        validate_quantity("total_days", total_days)?;
        active.total_days = Set(total_days);
    }
    if let Some(carried_over) = update.carried_over {
        validate_quantity("carried_over", carried_over)?;
        active.carried_over = Set(carried_over);
    }
    if let Some(notes) = update.notes {
        active.notes = Set(Some(notes));
    }
    active.updated_at = Set(chrono::Utc::now());

    active.update(db).await.map_err(Into::into)
}

/// Deletes an allowance row.
pub async fn delete_allowance(
    db: &DatabaseConnection,
    caller: &CallerContext,
    allowance_id: &str,
) -> Result<()> {
    let result = LeaveAllowance::delete_many()
        .filter(leave_allowance::Column::Id.eq(allowance_id))
        .filter(leave_allowance::Column::TenantId.eq(caller.tenant_id()))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(Error::NotFound {
            entity: "leave allowance",
            id: allowance_id.to_string(),
        });
    }
    Ok(())
}

/// Finds the allowance row for a (tenant, user, type, year) tuple.
pub async fn find_allowance<C>(
    conn: &C,
    tenant_id: u32,
    user_id: u32,
    absence_type_id: &str,
    year: i32,
) -> Result<Option<leave_allowance::Model>>
where
    C: ConnectionTrait,
{
    LeaveAllowance::find()
        .filter(leave_allowance::Column::TenantId.eq(tenant_id))
        .filter(leave_allowance::Column::UserId.eq(user_id))
        .filter(leave_allowance::Column::AbsenceTypeId.eq(absence_type_id))
        .filter(leave_allowance::Column::Year.eq(year))
        .one(conn)
        .await
        .map_err(Into::into)
}

/// Balance for a (tenant, user, type, year) tuple, `None` when no row exists.
///
/// A missing row is never synthesized.
pub async fn get_balance<C>(
    conn: &C,
    tenant_id: u32,
    user_id: u32,
    absence_type_id: &str,
    year: i32,
) -> Result<Option<Balance>>
where
    C: ConnectionTrait,
{
    Ok(find_allowance(conn, tenant_id, user_id, absence_type_id, year)
        .await?
        .as_ref()
        .map(Balance::from))
}

/// Atomically adds `delta` (negative for refunds) to an allowance's used days.
///
/// Performs a single SQL UPDATE:
/// `UPDATE hr_leave_allowances SET used_days = used_days + delta WHERE id = ?`
///
/// # Returns
/// The updated allowance, or `NotFound` if the row no longer exists
pub async fn add_used_days<C>(
    conn: &C,
    allowance_id: &str,
    delta: f64,
) -> Result<leave_allowance::Model>
where
    C: ConnectionTrait,
{
    if !delta.is_finite() {
        return Err(Error::bad_request(format!("invalid day delta: {delta}")));
    }

    let result = LeaveAllowance::update_many()
        .col_expr(
            leave_allowance::Column::UsedDays,
            Expr::col(leave_allowance::Column::UsedDays).add(delta),
        )
        .col_expr(
            leave_allowance::Column::UpdatedAt,
            Expr::value(chrono::Utc::now()),
        )
        .filter(leave_allowance::Column::Id.eq(allowance_id))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        return Err(Error::NotFound {
            entity: "leave allowance",
            id: allowance_id.to_string(),
        });
    }

    LeaveAllowance::find_by_id(allowance_id)
        .one(conn)
        .await?
        .ok_or_else(|| Error::NotFound {
            entity: "leave allowance",
            id: allowance_id.to_string(),
        })
}

/// Identifies the allowance a leave request draws from.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LedgerKey<'a> {
    pub tenant_id: u32,
    pub user_id: u32,
    pub absence_type_id: &'a str,
    pub year: i32,
}

/// Applies a used-days change as a side effect of a status transition.
///
/// Runs in a savepoint of the transition's transaction. Any failure,
/// including a missing allowance row, is logged and swallowed: the status
/// change stands on its own.
pub(crate) async fn apply_used_days_best_effort(
    txn: &DatabaseTransaction,
    key: LedgerKey<'_>,
    delta: f64,
    leave_request_id: &str,
) {
    let savepoint = match txn.begin().await {
        Ok(savepoint) => savepoint,
        Err(e) => {
            warn!(leave_request_id, error = %e, "Could not open savepoint for allowance update");
            return;
        }
    };

    let outcome = async {
        let allowance = find_allowance(
            &savepoint,
            key.tenant_id,
            key.user_id,
            key.absence_type_id,
            key.year,
        )
        .await?
        .ok_or_else(|| Error::NotFound {
            entity: "leave allowance",
            id: format!(
                "user={} type={} year={}",
                key.user_id, key.absence_type_id, key.year
            ),
        })?;
        add_used_days(&savepoint, &allowance.id, delta).await
    }
    .await;

    match outcome {
        Ok(allowance) => match savepoint.commit().await {
            Ok(()) => debug!(
                leave_request_id,
                allowance_id = %allowance.id,
                delta,
                used_days = allowance.used_days,
                "Applied allowance change"
            ),
            Err(e) => {
                warn!(leave_request_id, delta, error = %e, "Failed to commit allowance change");
            }
        },
        Err(e) => {
            warn!(leave_request_id, delta, error = %e, "Allowance change skipped");
            if let Err(e) = savepoint.rollback().await {
                warn!(leave_request_id, error = %e, "Failed to roll back allowance savepoint");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::{core::absence_type::NewAbsenceType, test_utils::*};

    #[tokio::test]
    async fn test_create_and_get_balance() -> Result<()> {
        let db = setup_test_db().await?;
        let absence = create_test_absence_type(&db, "Vacation").await?;
        let allowance = create_test_allowance(&db, &absence, TEST_USER, 2024, 20.0).await?;

        assert_eq!(allowance.used_days, 0.0);
        let balance = get_balance(&db, TEST_TENANT, TEST_USER, &absence.id, 2024)
            .await?
            .unwrap();
        assert_eq!(balance.total, 20.0);
        assert_eq!(balance.remaining(), 20.0);

        // Missing rows are reported, not synthesized
        assert!(get_balance(&db, TEST_TENANT, TEST_USER, &absence.id, 2025).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_remaining_includes_carried_over() -> Result<()> {
        let db = setup_test_db().await?;
        let absence = create_test_absence_type(&db, "Vacation").await?;
        let allowance = create_allowance(
            &db,
            &test_caller(),
            NewAllowance {
                user_id: TEST_USER,
                absence_type_id: absence.id.clone(),
                year: 2024,
                total_days: 20.0,
                carried_over: 2.5,
                ..Default::default()
            },
        )
        .await?;
        add_used_days(&db, &allowance.id, 4.5).await?;

        let balance = get_balance(&db, TEST_TENANT, TEST_USER, &absence.id, 2024)
            .await?
            .unwrap();
        assert_eq!(balance.remaining(), 18.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_allowance_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        let absence = create_test_absence_type(&db, "Vacation").await?;
        create_test_allowance(&db, &absence, TEST_USER, 2024, 20.0).await?;

        let result = create_test_allowance(&db, &absence, TEST_USER, 2024, 25.0).await;
        assert!(matches!(result, Err(Error::AlreadyExists { message: _ })));

        // Another year is fine
        create_test_allowance(&db, &absence, TEST_USER, 2025, 25.0).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_negative_quantities_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        let absence = create_test_absence_type(&db, "Vacation").await?;
        let result = create_test_allowance(&db, &absence, TEST_USER, 2024, -1.0).await;
        assert!(matches!(result, Err(Error::BadRequest { message: _ })));
        Ok(())
    }

    #[tokio::test]
    async fn test_add_used_days_increments_and_refunds() -> Result<()> {
        let db = setup_test_db().await?;
        let absence = create_test_absence_type(&db, "Vacation").await?;
        let allowance = create_test_allowance(&db, &absence, TEST_USER, 2024, 20.0).await?;

        let updated = add_used_days(&db, &allowance.id, 3.0).await?;
        assert_eq!(updated.used_days, 3.0);
        let updated = add_used_days(&db, &allowance.id, 0.5).await?;
        assert_eq!(updated.used_days, 3.5);
        let updated = add_used_days(&db, &allowance.id, -3.0).await?;
        assert_eq!(updated.used_days, 0.5);
        Ok(())
    }

    #[tokio::test]
    async fn test_add_used_days_missing_row() -> Result<()> {
        let db = setup_test_db().await?;
        let result = add_used_days(&db, "does-not-exist", 1.0).await;
        assert!(matches!(
            result,
            Err(Error::NotFound {
                entity: "leave allowance",
                id: _
            })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_allowance_keeps_used_days() -> Result<()> {
        let db = setup_test_db().await?;
        let caller = test_caller();
        let absence = create_test_absence_type(&db, "Vacation").await?;
        let allowance = create_test_allowance(&db, &absence, TEST_USER, 2024, 20.0).await?;
        add_used_days(&db, &allowance.id, 5.0).await?;

        let updated = update_allowance(
            &db,
            &caller,
            &allowance.id,
            AllowanceUpdate {
                total_days: Some(25.0),
                carried_over: Some(1.0),
                notes: Some("Seniority bonus".to_string()),
            },
        )
        .await?;
        assert_eq!(updated.total_days, 25.0);
        assert_eq!(updated.carried_over, 1.0);
        assert_eq!(updated.used_days, 5.0);
        assert_eq!(updated.notes.as_deref(), Some("Seniority bonus"));
        Ok(())
    }

    #[tokio::test]
    async fn test_list_and_filter_allowances() -> Result<()> {
        let db = setup_test_db().await?;
        let caller = test_caller();
        let vacation = create_test_absence_type(&db, "Vacation").await?;
        let sick = create_test_absence_type(&db, "Sick").await?;
        create_test_allowance(&db, &vacation, TEST_USER, 2025, 20.0).await?;
        create_test_allowance(&db, &vacation, TEST_USER, 2024, 20.0).await?;
        create_test_allowance(&db, &sick, TEST_USER, 2024, 10.0).await?;
        create_test_allowance(&db, &vacation, TEST_USER + 1, 2024, 20.0).await?;

        let all = list_allowances(&db, &caller, AllowanceFilter::default(), Pagination::all()).await?;
        assert_eq!(all.total, 4);
        assert_eq!(all.items[0].year, 2024);

        let filtered = list_allowances(
            &db,
            &caller,
            AllowanceFilter {
                user_id: Some(TEST_USER),
                year: Some(2024),
                ..Default::default()
            },
            Pagination::new(1, 1),
        )
        .await?;
        assert_eq!(filtered.total, 2);
        assert_eq!(filtered.items.len(), 1);

        let for_user = user_balance(&db, &caller, TEST_USER, Some(2024)).await?;
        assert_eq!(for_user.len(), 2);

        // Other tenants see nothing
        let other = CallerContext::new(TEST_TENANT + 1, 1, "other");
        let none = list_allowances(&db, &other, AllowanceFilter::default(), Pagination::all()).await?;
        assert_eq!(none.total, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_user_balance_joins_absence_type() -> Result<()> {
        let db = setup_test_db().await?;
        let caller = test_caller();
        let vacation = create_custom_absence_type(
            &db,
            NewAbsenceType {
                color: Some("#22c55e".to_string()),
                ..NewAbsenceType::named("Vacation")
            },
        )
        .await?;
        let allowance = create_test_allowance(&db, &vacation, TEST_USER, 2024, 20.0).await?;
        update_allowance(
            &db,
            &caller,
            &allowance.id,
            AllowanceUpdate {
                carried_over: Some(2.0),
                ..Default::default()
            },
        )
        .await?;
        add_used_days(&db, &allowance.id, 4.5).await?;
        create_test_allowance(&db, &vacation, TEST_USER + 1, 2024, 20.0).await?;

        let entries = user_balance(&db, &caller, TEST_USER, Some(2024)).await?;
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.absence_type_id, vacation.id);
        assert_eq!(entry.absence_type_name.as_deref(), Some("Vacation"));
        assert_eq!(entry.color.as_deref(), Some("#22c55e"));
        assert_eq!(entry.remaining_days(), 17.5);

        assert!(user_balance(&db, &caller, TEST_USER, Some(2025)).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_allowance() -> Result<()> {
        let db = setup_test_db().await?;
        let caller = test_caller();
        let absence = create_test_absence_type(&db, "Vacation").await?;
        let allowance = create_test_allowance(&db, &absence, TEST_USER, 2024, 20.0).await?;

        delete_allowance(&db, &caller, &allowance.id).await?;
        assert!(matches!(
            get_allowance(&db, &caller, &allowance.id).await,
            Err(Error::NotFound { .. })
        ));
        assert!(matches!(
            delete_allowance(&db, &caller, &allowance.id).await,
            Err(Error::NotFound { .. })
        ));
        Ok(())
    }
}
