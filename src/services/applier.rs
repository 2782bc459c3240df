//! Batch application of pending desk actions and reconciliation of the answers

use std::collections::HashMap;

use futures::future::join_all;
use serde::Serialize;

use crate::{
    backend::{ActionOutcome, ActionRequest, CirculationBackend},
    error::{BatchFailure, DeskError, DeskResult},
    models::{CirculationAction, Item, ItemQueue, Operator, Patron},
};

/// Summary of a successful batch
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ApplyReport {
    /// `(item_pid, action actually applied)` in submission order
    pub applied: Vec<(String, CirculationAction)>,
    /// Items dropped from the list because their circulation is finished
    pub removed: Vec<String>,
}

fn action_request(item: &Item, patron: &Patron, operator: &Operator) -> ActionRequest {
    ActionRequest {
        item_pid: item.pid.clone(),
        loan_pid: item.active_loan_pid().map(str::to_string),
        patron_pid: Some(patron.pid.clone()),
        transaction_user_pid: Some(operator.user_pid.clone()),
        transaction_library_pid: Some(operator.library_pid.clone()),
    }
}

/// Submit every pending action of `items` concurrently and wait for all of them.
///
/// The batch succeeds only if every request succeeds. On failure the error
/// lists the refused items and the items the backend did apply anyway.
/// Nothing is sent when no item carries an action.
pub async fn apply_batch(
    backend: &dyn CirculationBackend,
    patron: &Patron,
    operator: &Operator,
    items: &ItemQueue,
) -> DeskResult<Vec<ActionOutcome>> {
    let submissions: Vec<_> = items
        .pending()
        .map(|item| {
            let action = item.current_action;
            let request = action_request(item, patron, operator);
            async move {
                let result = backend.perform(action, request).await;
                (item, action, result)
            }
        })
        .collect();

    if submissions.is_empty() {
        return Ok(Vec::new());
    }

    tracing::info!(
        "Applying {} circulation actions for patron {}",
        submissions.len(),
        patron.pid
    );

    let mut outcomes = Vec::with_capacity(submissions.len());
    let mut failures = Vec::new();
    for (item, action, result) in join_all(submissions).await {
        match result {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => failures.push(BatchFailure {
                item_pid: item.pid.clone(),
                barcode: item.barcode.clone(),
                action,
                message: e.to_string(),
            }),
        }
    }

    if failures.is_empty() {
        return Ok(outcomes);
    }

    let applied: Vec<String> = outcomes.into_iter().map(|o| o.item.pid).collect();
    tracing::warn!(
        "Batch for patron {} failed on {} items; already applied server-side: {:?}",
        patron.pid,
        failures.len(),
        applied
    );
    Err(DeskError::BatchFailed { failures, applied })
}

/// Circulation still concerns the desk after an action (loaned, travelling, held)
pub fn stays_listed(item: &Item) -> bool {
    item.status.is_circulating()
        && !item
            .loan
            .as_ref()
            .map_or(false, |loan| loan.state.is_terminal())
}

/// Merge batch answers into `items` by pid.
///
/// Items with an answer are replaced by the backend's version and kept only
/// while [`stays_listed`]; items without one are left untouched. The answer
/// order has no influence on the result.
pub fn reconcile(items: &ItemQueue, outcomes: Vec<ActionOutcome>) -> (ItemQueue, ApplyReport) {
    let mut by_pid: HashMap<String, ActionOutcome> = outcomes
        .into_iter()
        .map(|outcome| (outcome.item.pid.clone(), outcome))
        .collect();

    let mut report = ApplyReport::default();
    let reconciled = items
        .iter()
        .filter_map(|item| match by_pid.remove(&item.pid) {
            None => Some(item.clone()),
            Some(outcome) => {
                report.applied.push((item.pid.clone(), outcome.action_done));
                let mut updated = outcome.item;
                updated.action_done = Some(outcome.action_done);
                updated.current_action = CirculationAction::No;
                if stays_listed(&updated) {
                    Some(updated)
                } else {
                    report.removed.push(updated.pid);
                    None
                }
            }
        })
        .collect();

    (reconciled, report)
}
