//! Signing event handler - turns feed events into state machine calls.

use crate::{
    config::settings::SIGNING_COMPLETED_EVENT,
    core::leave_request::{SigningOutcome, complete_signing},
    errors::Result,
    events::types::{SigningEvent, SigningRequestCompletedData},
};
use sea_orm::DatabaseConnection;
use tracing::{info, instrument};

/// Applies signing events to leave requests.
#[derive(Debug, Clone)]
pub struct SigningReconciler {
    db: DatabaseConnection,
}

impl SigningReconciler {
    /// Reconciler writing through `db`.
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Handles one event of `event_type`.
    ///
    /// Returns `None` for event types this service does not handle.
    #[instrument(skip(self, event), fields(event_id = %event.id))]
    pub async fn handle(
        &self,
        event_type: &str,
        event: &SigningEvent,
    ) -> Result<Option<SigningOutcome>> {
        if event_type != SIGNING_COMPLETED_EVENT {
            info!("Ignoring unknown event type: {event_type}");
            return Ok(None);
        }

        let data: SigningRequestCompletedData = event.data_as()?;
        // Zero means the publisher left the tenant out
        let tenant_id = [data.tenant_id, event.tenant_id]
            .into_iter()
            .find(|tenant| *tenant != 0);
        info!(
            signing_request_id = %data.request_id,
            ?tenant_id,
            "Handling signing completed"
        );

        let outcome = complete_signing(&self.db, tenant_id, &data.request_id).await?;
        match &outcome {
            SigningOutcome::Approved(request) => {
                info!(leave_request_id = %request.id, "Leave request auto-approved after signing completed");
            }
            SigningOutcome::NoMatchingRequest => {
                info!(signing_request_id = %data.request_id, "No leave request found for signing request, ignoring");
            }
            SigningOutcome::NotAwaitingSigning(status) => {
                info!(
                    signing_request_id = %data.request_id,
                    %status,
                    "Leave request is not awaiting signing, ignoring"
                );
            }
        }
        Ok(Some(outcome))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::{
        core::{
            absence_type::NewAbsenceType,
            allowance::get_allowance,
            leave_request::{
                ApproveLeaveRequest, NewLeaveRequest, approve_leave_request, create_leave_request,
                get_leave_request,
            },
        },
        test_utils::*,
    };

    #[tokio::test]
    async fn test_completion_without_tenant_approves() -> Result<()> {
        let db = setup_test_db().await?;
        let absence = create_custom_absence_type(
            &db,
            NewAbsenceType {
                requires_signing: true,
                signing_template_id: Some("tpl-leave".to_string()),
                ..NewAbsenceType::named("Signed leave")
            },
        )
        .await?;
        let allowance = create_test_allowance(&db, &absence, TEST_USER, 2024, 10.0).await?;
        let request = create_leave_request(
            &db,
            &test_caller(),
            NewLeaveRequest::new(TEST_USER, absence.id.clone(), date(2024, 3, 4), date(2024, 3, 5)),
        )
        .await?;
        approve_leave_request(
            &db,
            &RecordingGateway::returning("sig-1"),
            &reviewer_caller(),
            &request.id,
            ApproveLeaveRequest::default(),
        )
        .await?;

        let event = SigningEvent::parse(
            r#"{"type": "signing.request.completed", "data": {"request_id": "sig-1"}}"#,
        )?;
        let outcome = SigningReconciler::new(db.clone())
            .handle(SIGNING_COMPLETED_EVENT, &event)
            .await?;
        assert!(matches!(outcome, Some(SigningOutcome::Approved(_))));

        let current = get_leave_request(&db, &test_caller(), &request.id).await?;
        assert_eq!(current.status, LeaveStatus::Approved);
        let allowance = get_allowance(&db, &test_caller(), &allowance.id).await?;
        assert_eq!(allowance.used_days, 2.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_completion_for_other_tenant_is_ignored() -> Result<()> {
        let db = setup_test_db().await?;
        let absence = create_custom_absence_type(
            &db,
            NewAbsenceType {
                requires_signing: true,
                signing_template_id: Some("tpl-leave".to_string()),
                ..NewAbsenceType::named("Signed leave")
            },
        )
        .await?;
        create_test_allowance(&db, &absence, TEST_USER, 2024, 10.0).await?;
        let request = create_leave_request(
            &db,
            &test_caller(),
            NewLeaveRequest::new(TEST_USER, absence.id.clone(), date(2024, 3, 4), date(2024, 3, 5)),
        )
        .await?;
        approve_leave_request(
            &db,
            &RecordingGateway::returning("sig-2"),
            &reviewer_caller(),
            &request.id,
            ApproveLeaveRequest::default(),
        )
        .await?;

        let event = SigningEvent::parse(&format!(
            r#"{{"type": "signing.request.completed", "tenant_id": {}, "data": {{"request_id": "sig-2"}}}}"#,
            TEST_TENANT + 1
        ))?;
        let outcome = SigningReconciler::new(db.clone())
            .handle(SIGNING_COMPLETED_EVENT, &event)
            .await?;
        assert_eq!(outcome, Some(SigningOutcome::NoMatchingRequest));

        let current = get_leave_request(&db, &test_caller(), &request.id).await?;
        assert_eq!(current.status, LeaveStatus::AwaitingSigning);
        Ok(())
    }
}
