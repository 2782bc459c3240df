//! In-memory circulation backend shared by the integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use elidune_desk::{
    backend::{ActionOutcome, ActionRequest, CirculationBackend},
    config::DeskConfig,
    models::{CirculationAction, Item, ItemQueue, ItemStatus, Loan, LoanState, Operator, Patron},
    services::desk::DeskController,
    DeskError, DeskResult,
};

/// Holds a lookup until the test releases it
#[derive(Default)]
pub struct Gate {
    pub entered: Notify,
    pub release: Notify,
}

#[derive(Default)]
pub struct FakeBackend {
    patrons: Mutex<HashMap<String, Patron>>,
    items: Mutex<HashMap<String, Item>>,
    loans: Mutex<HashMap<String, Vec<Item>>>,
    automatic: Mutex<HashMap<String, ActionOutcome>>,
    answers: Mutex<HashMap<String, Result<ActionOutcome, String>>>,
    delays: Mutex<HashMap<String, Duration>>,
    requested: Mutex<Vec<Item>>,
    gates: Mutex<HashMap<String, Arc<Gate>>>,
    /// Every call, as `<operation>:<key>`
    pub calls: Mutex<Vec<String>>,
    /// Item pids in the order their action completed
    pub completed: Mutex<Vec<String>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_patron(self, patron: Patron, loans: Vec<Item>) -> Self {
        self.loans.lock().unwrap().insert(patron.pid.clone(), loans);
        self.patrons.lock().unwrap().insert(patron.barcode.clone(), patron);
        self
    }

    pub fn with_item(self, item: Item) -> Self {
        self.items.lock().unwrap().insert(item.barcode.clone(), item);
        self
    }

    pub fn with_automatic(self, barcode: &str, outcome: ActionOutcome) -> Self {
        self.automatic.lock().unwrap().insert(barcode.to_string(), outcome);
        self
    }

    pub fn with_answer(self, item_pid: &str, answer: Result<ActionOutcome, String>) -> Self {
        self.answers.lock().unwrap().insert(item_pid.to_string(), answer);
        self
    }

    /// Delay actions on `key`: an item pid, or a barcode for automatic checkin
    pub fn with_delay(self, key: &str, delay: Duration) -> Self {
        self.delays.lock().unwrap().insert(key.to_string(), delay);
        self
    }

    pub fn with_requested(self, items: Vec<Item>) -> Self {
        *self.requested.lock().unwrap() = items;
        self
    }

    pub fn with_gate(self, barcode: &str, gate: Arc<Gate>) -> Self {
        self.gates.lock().unwrap().insert(barcode.to_string(), gate);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn gate(&self, key: &str) -> Option<Arc<Gate>> {
        self.gates.lock().unwrap().get(key).cloned()
    }

    async fn answer(&self, item_pid: &str) -> DeskResult<ActionOutcome> {
        let delay = self.delays.lock().unwrap().get(item_pid).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.completed.lock().unwrap().push(item_pid.to_string());

        let answer = self.answers.lock().unwrap().get(item_pid).cloned();
        match answer {
            Some(Ok(outcome)) => Ok(outcome),
            Some(Err(message)) => Err(DeskError::Backend { status: 400, message }),
            None => Err(DeskError::Backend {
                status: 500,
                message: format!("no scripted answer for {}", item_pid),
            }),
        }
    }
}

#[async_trait]
impl CirculationBackend for FakeBackend {
    async fn find_patron(&self, barcode: &str) -> DeskResult<Option<Patron>> {
        self.record(format!("find_patron:{}", barcode));
        if let Some(gate) = self.gate(barcode) {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        let patron = self.patrons.lock().unwrap().get(barcode).cloned();
        Ok(patron)
    }

    async fn find_item(&self, barcode: &str, patron_pid: Option<String>) -> DeskResult<Option<Item>> {
        self.record(format!("find_item:{}:{}", barcode, patron_pid.unwrap_or_default()));
        let item = self.items.lock().unwrap().get(barcode).cloned();
        Ok(item)
    }

    async fn patron_loans(&self, patron_pid: &str) -> DeskResult<Vec<Item>> {
        self.record(format!("patron_loans:{}", patron_pid));
        let loans = self.loans.lock().unwrap().get(patron_pid).cloned();
        Ok(loans.unwrap_or_default())
    }

    async fn automatic_checkin(
        &self,
        item_barcode: &str,
        _transaction_user_pid: Option<String>,
        _transaction_library_pid: Option<String>,
    ) -> DeskResult<Option<ActionOutcome>> {
        self.record(format!("automatic_checkin:{}", item_barcode));
        let delay = self.delays.lock().unwrap().get(item_barcode).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let outcome = self.automatic.lock().unwrap().get(item_barcode).cloned();
        Ok(outcome)
    }

    async fn perform(&self, action: CirculationAction, request: ActionRequest) -> DeskResult<ActionOutcome> {
        self.record(format!("{}:{}", action, request.item_pid));
        self.answer(&request.item_pid).await
    }

    async fn validate_request(&self, request: ActionRequest) -> DeskResult<ActionOutcome> {
        self.record(format!("validate:{}", request.item_pid));
        self.answer(&request.item_pid).await
    }

    async fn requested_loans(&self, library_pid: &str) -> DeskResult<Vec<Item>> {
        self.record(format!("requested_loans:{}", library_pid));
        Ok(self.requested.lock().unwrap().clone())
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

pub fn operator() -> Operator {
    Operator {
        user_pid: "u1".to_string(),
        library_pid: "lib-1".to_string(),
        organisation_pid: "org-1".to_string(),
    }
}

pub fn patron(pid: &str, barcode: &str, organisation: &str) -> Patron {
    Patron {
        pid: pid.to_string(),
        barcode: barcode.to_string(),
        first_name: None,
        last_name: Some(format!("Patron {}", pid)),
        library_pid: Some("lib-1".to_string()),
        organisation_pid: organisation.to_string(),
        items: ItemQueue::new(),
    }
}

pub fn loan(pid: &str, state: LoanState, item_pid: &str, patron_pid: &str) -> Loan {
    Loan {
        loan_pid: pid.to_string(),
        state,
        item_pid: Some(item_pid.to_string()),
        patron_pid: Some(patron_pid.to_string()),
        start_date: None,
        end_date: None,
        request_expire_date: None,
    }
}

pub fn item(pid: &str, barcode: &str, status: ItemStatus, actions: Vec<CirculationAction>) -> Item {
    Item {
        pid: pid.to_string(),
        barcode: barcode.to_string(),
        status,
        title: Some(format!("Title of {}", pid)),
        library_pid: Some("lib-1".to_string()),
        location_pid: None,
        available: status == ItemStatus::OnShelf,
        actions,
        loan: None,
        pending_loans: vec![],
        current_action: CirculationAction::No,
        action_done: None,
    }
}

/// Item on loan to `patron_pid`
pub fn loaned_item(pid: &str, barcode: &str, patron_pid: &str) -> Item {
    let mut it = item(
        pid,
        barcode,
        ItemStatus::OnLoan,
        vec![CirculationAction::Checkin, CirculationAction::ExtendLoan, CirculationAction::Lose],
    );
    it.loan = Some(loan(&format!("loan-{}", pid), LoanState::ItemOnLoan, pid, patron_pid));
    it
}

pub fn outcome(mut item: Item, action_done: CirculationAction) -> ActionOutcome {
    item.action_done = Some(action_done);
    item.current_action = CirculationAction::No;
    ActionOutcome {
        loan: item.loan.clone(),
        item,
        action_done,
    }
}

pub fn desk(backend: Arc<FakeBackend>) -> DeskController {
    DeskController::new(backend, operator(), DeskConfig::default())
}
