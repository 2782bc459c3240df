//! Request validation at a library desk, one request at a time

use std::sync::Arc;

use serde::Serialize;

use crate::{
    backend::{ActionRequest, CirculationBackend},
    error::{DeskError, DeskResult},
    models::{Item, Labelled, Operator},
};

/// Result of one validation, for the operator
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub item: Item,
    pub message: String,
}

pub struct ValidationSession {
    backend: Arc<dyn CirculationBackend>,
    operator: Operator,
    library_pid: String,
    pending_requests: Vec<Item>,
}

impl ValidationSession {
    /// Load the library's pending requests once
    pub async fn open(
        backend: Arc<dyn CirculationBackend>,
        operator: Operator,
        library_pid: impl Into<String>,
    ) -> DeskResult<Self> {
        let library_pid = library_pid.into();
        let pending_requests = backend.requested_loans(&library_pid).await?;
        tracing::info!(
            "{} pending requests to validate at library {}",
            pending_requests.len(),
            library_pid
        );

        Ok(Self {
            backend,
            operator,
            library_pid,
            pending_requests,
        })
    }

    pub fn library_pid(&self) -> &str {
        &self.library_pid
    }

    pub fn pending_requests(&self) -> &[Item] {
        &self.pending_requests
    }

    /// Validate the request of the item carrying `barcode` and splice the answer in place
    pub async fn validate(&mut self, barcode: &str) -> DeskResult<ValidationReport> {
        let barcode = barcode.trim();
        let idx = self
            .pending_requests
            .iter()
            .position(|item| item.barcode == barcode)
            .ok_or_else(|| DeskError::NoMatchingRequest(barcode.to_string()))?;

        let item = &self.pending_requests[idx];
        let request = ActionRequest {
            item_pid: item.pid.clone(),
            loan_pid: item.active_loan_pid().map(str::to_string),
            patron_pid: None,
            transaction_user_pid: Some(self.operator.user_pid.clone()),
            transaction_library_pid: Some(self.operator.library_pid.clone()),
        };

        let outcome = self.backend.validate_request(request).await?;
        let mut validated = outcome.item;
        validated.action_done = Some(outcome.action_done);

        let message = format!(
            "Item {} validated: {}",
            validated.barcode,
            validated.status.label()
        );
        tracing::info!("{}", message);

        self.pending_requests[idx] = validated.clone();
        Ok(ValidationReport {
            item: validated,
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{ActionOutcome, MockCirculationBackend};
    use crate::models::{CirculationAction, ItemStatus, Loan, LoanState};

    fn operator() -> Operator {
        Operator {
            user_pid: "u1".to_string(),
            library_pid: "lib-1".to_string(),
            organisation_pid: "org-1".to_string(),
        }
    }

    fn requested(pid: &str, barcode: &str) -> Item {
        Item {
            pid: pid.to_string(),
            barcode: barcode.to_string(),
            status: ItemStatus::OnShelf,
            title: None,
            library_pid: Some("lib-1".to_string()),
            location_pid: None,
            available: false,
            actions: vec![CirculationAction::ValidateRequest],
            loan: Some(Loan {
                loan_pid: format!("loan-{}", pid),
                state: LoanState::Pending,
                item_pid: Some(pid.to_string()),
                patron_pid: Some("p1".to_string()),
                start_date: None,
                end_date: None,
                request_expire_date: None,
            }),
            pending_loans: vec![],
            current_action: CirculationAction::No,
            action_done: None,
        }
    }

    fn backend_with_requests() -> MockCirculationBackend {
        let mut backend = MockCirculationBackend::new();
        backend.expect_requested_loans().returning(|_| {
            Ok(vec![
                requested("i1", "B1"),
                requested("i2", "B2"),
                requested("i3", "B3"),
            ])
        });
        backend
    }

    #[tokio::test]
    async fn test_unknown_barcode_leaves_list_untouched() {
        let mut backend = backend_with_requests();
        backend.expect_validate_request().times(0);

        let mut session = ValidationSession::open(Arc::new(backend), operator(), "lib-1")
            .await
            .unwrap();
        let before = session.pending_requests().to_vec();

        assert!(matches!(
            session.validate("B9").await,
            Err(DeskError::NoMatchingRequest(_))
        ));
        assert_eq!(session.pending_requests(), before.as_slice());
    }

    #[tokio::test]
    async fn test_validated_item_is_spliced_in_place() {
        let mut backend = backend_with_requests();
        backend
            .expect_validate_request()
            .withf(|request| request.item_pid == "i2" && request.loan_pid.as_deref() == Some("loan-i2"))
            .times(1)
            .returning(|_| {
                let mut item = requested("i2", "B2");
                item.status = ItemStatus::AtDesk;
                item.loan.as_mut().unwrap().state = LoanState::ItemAtDesk;
                Ok(ActionOutcome {
                    item,
                    action_done: CirculationAction::ValidateRequest,
                    loan: None,
                })
            });

        let mut session = ValidationSession::open(Arc::new(backend), operator(), "lib-1")
            .await
            .unwrap();
        let report = session.validate("B2").await.unwrap();
        assert_eq!(report.item.status, ItemStatus::AtDesk);
        assert!(report.message.contains("At desk"));

        let barcodes: Vec<_> = session.pending_requests().iter().map(|i| i.barcode.as_str()).collect();
        assert_eq!(barcodes, vec!["B1", "B2", "B3"]);
        assert_eq!(session.pending_requests()[1].status, ItemStatus::AtDesk);
        assert_eq!(
            session.pending_requests()[1].action_done,
            Some(CirculationAction::ValidateRequest)
        );
        assert_eq!(session.pending_requests()[0], requested("i1", "B1"));
    }

    #[tokio::test]
    async fn test_backend_failure_keeps_entry() {
        let mut backend = backend_with_requests();
        backend.expect_validate_request().returning(|_| {
            Err(DeskError::Backend {
                status: 400,
                message: "request already validated".to_string(),
            })
        });

        let mut session = ValidationSession::open(Arc::new(backend), operator(), "lib-1")
            .await
            .unwrap();
        assert!(session.validate("B1").await.is_err());
        assert_eq!(session.pending_requests()[0], requested("i1", "B1"));
    }
}
