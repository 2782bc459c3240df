//! Barcode resolution: what a scanned code means in the current session

use serde::Serialize;

use crate::{
    error::{DeskError, DeskResult},
    models::{CirculationAction, Item, ItemQueue, Operator, Patron, Session},
};

/// Lookup a scan leads to
#[derive(Debug, Clone, PartialEq)]
pub enum ScanTarget {
    /// No patron yet: try the patron directory, fall back to automatic checkin
    Patron { code: String },
    /// Item lookup on behalf of the identified patron
    Item { code: String, patron_pid: String },
}

impl ScanTarget {
    pub fn code(&self) -> &str {
        match self {
            ScanTarget::Patron { code } | ScanTarget::Item { code, .. } => code,
        }
    }
}

/// What a completed scan changed in the session
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScanOutcome {
    PatronIdentified {
        patron_pid: String,
        /// Anonymous item moved into the patron's list with a checkout action
        staged_item_pid: Option<String>,
    },
    ItemAdded {
        item_pid: String,
        action: CirculationAction,
    },
    AutomaticAction {
        item_pid: String,
        action_done: CirculationAction,
    },
}

/// Decide which lookup a scan needs, rejecting barcodes already listed or still being resolved
pub fn classify(code: &str, session: &Session) -> DeskResult<ScanTarget> {
    let code = code.trim();
    if code.is_empty() {
        return Err(DeskError::BadRequest("empty scan".to_string()));
    }

    if session.active_items().contains_barcode(code) || session.scans_in_flight.contains(code) {
        return Err(DeskError::AlreadyInList(code.to_string()));
    }

    Ok(match &session.identified_patron {
        Some(patron) => ScanTarget::Item {
            code: code.to_string(),
            patron_pid: patron.pid.clone(),
        },
        None => ScanTarget::Patron {
            code: code.to_string(),
        },
    })
}

/// Cross-organisation patrons stay invisible when `hide_foreign` is set
pub fn is_visible(patron: &Patron, operator: &Operator, hide_foreign: bool) -> bool {
    !hide_foreign || patron.organisation_pid == operator.organisation_pid
}

/// First anonymous item the newly identified patron could borrow, ready for checkout
pub fn loanable_anonymous_item(anonymous: &ItemQueue, patron: &Patron) -> Option<Item> {
    anonymous
        .iter()
        .find(|item| item.can_loan_to(&patron.pid) && item.allows(CirculationAction::Checkout))
        .map(|item| Item {
            current_action: CirculationAction::Checkout,
            ..item.clone()
        })
}
