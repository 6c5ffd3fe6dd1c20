//! Shared test utilities for the leave ledger.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    context::CallerContext,
    core::{
        absence_type::{self, NewAbsenceType},
        allowance::{self, NewAllowance},
    },
    entities::{self, leave_request},
    errors::Result,
    signing::{SigningError, SigningGateway, SigningRequest},
};
use async_trait::async_trait;
use chrono::NaiveDate;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use std::sync::Mutex;

pub use crate::entities::LeaveStatus;

/// Tenant used by every helper.
pub const TEST_TENANT: u32 = 1;
/// Employee used by most tests.
pub const TEST_USER: u32 = 42;
/// Reviewer used by approval tests.
pub const TEST_REVIEWER: u32 = 7;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// The requesting employee acting in the test tenant.
pub fn test_caller() -> CallerContext {
    CallerContext::new(TEST_TENANT, TEST_USER, "alice")
}

/// A manager acting in the test tenant.
pub fn reviewer_caller() -> CallerContext {
    CallerContext::new(TEST_TENANT, TEST_REVIEWER, "manager")
}

/// Shorthand for a calendar date.
///
/// # Panics
/// Panics on an invalid date.
#[allow(clippy::unwrap_used)]
pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// Creates a test absence type with sensible defaults.
///
/// # Defaults
/// * `deducts_from_allowance`: true
/// * `requires_approval`: true
/// * `requires_signing`: false
pub async fn create_test_absence_type(
    db: &DatabaseConnection,
    name: &str,
) -> Result<entities::absence_type::Model> {
    absence_type::create_absence_type(db, &test_caller(), NewAbsenceType::named(name)).await
}

/// Creates a test absence type with custom policy.
pub async fn create_custom_absence_type(
    db: &DatabaseConnection,
    input: NewAbsenceType,
) -> Result<entities::absence_type::Model> {
    absence_type::create_absence_type(db, &test_caller(), input).await
}

/// Creates an allowance with `total` days and nothing used or carried over.
pub async fn create_test_allowance(
    db: &DatabaseConnection,
    absence: &entities::absence_type::Model,
    user_id: u32,
    year: i32,
    total: f64,
) -> Result<entities::leave_allowance::Model> {
    allowance::create_allowance(
        db,
        &test_caller(),
        NewAllowance {
            user_id,
            absence_type_id: absence.id.clone(),
            year,
            total_days: total,
            ..Default::default()
        },
    )
    .await
}

/// Inserts a leave request row directly, bypassing the workflow checks.
///
/// Days are the business days of the range.
pub async fn insert_test_request(
    db: &DatabaseConnection,
    absence: &entities::absence_type::Model,
    user_id: u32,
    start: NaiveDate,
    end: NaiveDate,
    status: LeaveStatus,
) -> Result<entities::leave_request::Model> {
    let now = chrono::Utc::now();
    let model = leave_request::ActiveModel {
        id: Set(uuid::Uuid::new_v4().to_string()),
        tenant_id: Set(absence.tenant_id),
        user_id: Set(user_id),
        user_name: Set(None),
        org_unit_name: Set(None),
        absence_type_id: Set(absence.id.clone()),
        start_date: Set(start),
        end_date: Set(end),
        days: Set(crate::core::business_days::business_days(start, end)),
        status: Set(status),
        reason: Set(None),
        notes: Set(None),
        reviewed_by: Set(None),
        reviewer_name: Set(None),
        reviewed_at: Set(None),
        review_notes: Set(None),
        signing_request_id: Set(None),
        metadata: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    };
    Ok(model.insert(db).await?)
}

/// Signing gateway fake that records every request it receives.
#[derive(Debug, Default)]
pub struct RecordingGateway {
    reply: Option<String>,
    requests: Mutex<Vec<SigningRequest>>,
}

impl RecordingGateway {
    /// Accepts every request and answers with `id`.
    pub fn returning(id: &str) -> Self {
        Self {
            reply: Some(id.to_string()),
            requests: Mutex::default(),
        }
    }

    /// Fails every request.
    pub fn failing() -> Self {
        Self::default()
    }

    /// Requests received so far.
    ///
    /// # Panics
    /// Panics if the lock is poisoned.
    #[allow(clippy::unwrap_used)]
    pub fn requests(&self) -> Vec<SigningRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl SigningGateway for RecordingGateway {
    #[allow(clippy::unwrap_used)]
    async fn create_signing_request(
        &self,
        request: SigningRequest,
    ) -> std::result::Result<String, SigningError> {
        self.requests.lock().unwrap().push(request);
        self.reply
            .clone()
            .ok_or_else(|| SigningError("service unavailable".to_string()))
    }
}
