//! Circulation backend access
//!
//! The desk engine never talks HTTP directly; it goes through
//! [`CirculationBackend`], implemented over reqwest by [`http::HttpBackend`]
//! and mocked in tests.

pub mod http;

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[cfg(test)]
use mockall::automock;

use crate::{
    error::{DeskError, DeskResult},
    models::{CirculationAction, Item, Loan, Patron},
};

pub use http::HttpBackend;

/// Body of every single-item circulation action
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionRequest {
    pub item_pid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loan_pid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patron_pid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_user_pid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_library_pid: Option<String>,
}

/// What the backend reports after applying an action
#[derive(Debug, Clone, PartialEq)]
pub struct ActionOutcome {
    /// Item state after the action, with `action_done` filled in
    pub item: Item,
    /// Action the backend actually applied (a checkin may become a receive)
    pub action_done: CirculationAction,
    pub loan: Option<Loan>,
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait CirculationBackend: Send + Sync {
    /// Patron by barcode; `None` when no patron carries it
    async fn find_patron(&self, barcode: &str) -> DeskResult<Option<Patron>>;

    /// Item by barcode, seen from the given patron's side
    async fn find_item(&self, barcode: &str, patron_pid: Option<String>) -> DeskResult<Option<Item>>;

    /// Items currently loaned to or requested by a patron
    async fn patron_loans(&self, patron_pid: &str) -> DeskResult<Vec<Item>>;

    /// Backend-inferred checkin or checkout; `None` when the barcode is unknown
    async fn automatic_checkin(
        &self,
        item_barcode: &str,
        transaction_user_pid: Option<String>,
        transaction_library_pid: Option<String>,
    ) -> DeskResult<Option<ActionOutcome>>;

    async fn perform(&self, action: CirculationAction, request: ActionRequest) -> DeskResult<ActionOutcome>;

    async fn validate_request(&self, request: ActionRequest) -> DeskResult<ActionOutcome>;

    /// Items with requests waiting to be validated at a library
    async fn requested_loans(&self, library_pid: &str) -> DeskResult<Vec<Item>>;
}

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct SearchResult<T> {
    pub hits: Hits<T>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Hits<T> {
    #[serde(default = "Vec::new")]
    pub hits: Vec<Hit<T>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Hit<T> {
    pub metadata: T,
}

impl<T> SearchResult<T> {
    pub fn into_records(self) -> Vec<T> {
        self.hits.hits.into_iter().map(|hit| hit.metadata).collect()
    }
}

/// `{item, loan?}` pair returned by item lookups
#[derive(Debug, Deserialize)]
pub(crate) struct ItemWithLoan {
    pub item: Item,
    #[serde(default)]
    pub loan: Option<Loan>,
}

impl From<ItemWithLoan> for Item {
    fn from(record: ItemWithLoan) -> Self {
        let mut item = record.item;
        if record.loan.is_some() {
            item.loan = record.loan;
        }
        item
    }
}

/// `{metadata: item, action_applied: {<action>: loan}}`
#[derive(Debug, Deserialize)]
pub(crate) struct ActionResponse {
    pub metadata: Item,
    #[serde(default)]
    pub action_applied: HashMap<CirculationAction, Option<Loan>>,
}

impl ActionResponse {
    /// `requested` stands in when the backend does not name the applied action
    pub fn into_outcome(self, requested: Option<CirculationAction>) -> DeskResult<ActionOutcome> {
        let (action_done, loan) = match self.action_applied.into_iter().next() {
            Some(applied) => applied,
            None => match requested {
                Some(action) => (action, None),
                None => {
                    return Err(DeskError::Backend {
                        status: 200,
                        message: "response does not name the applied action".to_string(),
                    })
                }
            },
        };

        let mut item = self.metadata;
        if item.loan.is_none() {
            item.loan = loan.clone().filter(|loan| loan.state.is_active());
        }
        item.action_done = Some(action_done);
        item.current_action = CirculationAction::No;

        Ok(ActionOutcome {
            item,
            action_done,
            loan,
        })
    }
}
