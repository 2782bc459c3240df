//! Loan model and due-date derivation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::LoanState;

/// Loan record as returned by the circulation backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub loan_pid: String,
    pub state: LoanState,
    pub item_pid: Option<String>,
    pub patron_pid: Option<String>,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub request_expire_date: Option<DateTime<Utc>>,
}

impl Loan {
    /// Request expiry for pending loans, loan end for loaned items, nothing otherwise
    pub fn due_date(&self) -> Option<DateTime<Utc>> {
        match self.state {
            LoanState::Pending => self.request_expire_date,
            LoanState::ItemOnLoan => self.end_date,
            _ => None,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.due_date().map_or(false, |due| due < now)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn belongs_to(&self, patron_pid: &str) -> bool {
        self.patron_pid.as_deref() == Some(patron_pid)
    }
}
