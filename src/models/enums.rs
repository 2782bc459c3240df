//! Circulation vocabulary shared by every desk component
//!
//! Values are stable machine identifiers (snake_case on the wire). Display
//! text lives in [`super::labels`].

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ItemStatus
// ---------------------------------------------------------------------------

/// Physical status of an item as reported by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    OnShelf,
    AtDesk,
    OnLoan,
    InTransit,
    Excluded,
    Missing,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::OnShelf => "on_shelf",
            ItemStatus::AtDesk => "at_desk",
            ItemStatus::OnLoan => "on_loan",
            ItemStatus::InTransit => "in_transit",
            ItemStatus::Excluded => "excluded",
            ItemStatus::Missing => "missing",
        }
    }

    /// Item is still part of an ongoing circulation (loaned, travelling or held)
    pub fn is_circulating(&self) -> bool {
        matches!(self, ItemStatus::OnLoan | ItemStatus::InTransit | ItemStatus::AtDesk)
    }
}

impl Default for ItemStatus {
    fn default() -> Self {
        ItemStatus::OnShelf
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// LoanState
// ---------------------------------------------------------------------------

/// Loan lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanState {
    Created,
    Pending,
    ItemOnLoan,
    ItemReturned,
    ItemInTransitForPickup,
    ItemInTransitToHouse,
    ItemAtDesk,
    Cancelled,
}

impl LoanState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanState::Created => "created",
            LoanState::Pending => "pending",
            LoanState::ItemOnLoan => "item_on_loan",
            LoanState::ItemReturned => "item_returned",
            LoanState::ItemInTransitForPickup => "item_in_transit_for_pickup",
            LoanState::ItemInTransitToHouse => "item_in_transit_to_house",
            LoanState::ItemAtDesk => "item_at_desk",
            LoanState::Cancelled => "cancelled",
        }
    }

    /// Loan still binds the item to a patron (requested, held, loaned or travelling)
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            LoanState::Pending
                | LoanState::ItemOnLoan
                | LoanState::ItemInTransitForPickup
                | LoanState::ItemInTransitToHouse
                | LoanState::ItemAtDesk
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, LoanState::ItemReturned | LoanState::Cancelled)
    }
}

impl std::fmt::Display for LoanState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// CirculationAction
// ---------------------------------------------------------------------------

/// Circulation action, declared in default-inference priority order.
///
/// `No` is the explicit "nothing chosen" sentinel; it is never submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CirculationAction {
    Checkout,
    Checkin,
    Request,
    Lose,
    Receive,
    ReturnMissing,
    ExtendLoan,
    #[serde(alias = "validate")]
    ValidateRequest,
    No,
}

impl CirculationAction {
    pub const ALL: [CirculationAction; 9] = [
        CirculationAction::Checkout,
        CirculationAction::Checkin,
        CirculationAction::Request,
        CirculationAction::Lose,
        CirculationAction::Receive,
        CirculationAction::ReturnMissing,
        CirculationAction::ExtendLoan,
        CirculationAction::ValidateRequest,
        CirculationAction::No,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CirculationAction::Checkout => "checkout",
            CirculationAction::Checkin => "checkin",
            CirculationAction::Request => "request",
            CirculationAction::Lose => "lose",
            CirculationAction::Receive => "receive",
            CirculationAction::ReturnMissing => "return_missing",
            CirculationAction::ExtendLoan => "extend_loan",
            CirculationAction::ValidateRequest => "validate_request",
            CirculationAction::No => "no",
        }
    }

    /// Whether this action is sent to the backend when a batch is applied
    pub fn is_submittable(&self) -> bool {
        !matches!(self, CirculationAction::No)
    }
}

impl Default for CirculationAction {
    fn default() -> Self {
        CirculationAction::No
    }
}

impl std::fmt::Display for CirculationAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CirculationAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "validate" {
            return Ok(CirculationAction::ValidateRequest);
        }
        CirculationAction::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| format!("unknown circulation action '{}'", s))
    }
}
