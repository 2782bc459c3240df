//! Display text for the circulation vocabulary, keyed by identifier

use super::enums::{CirculationAction, ItemStatus, LoanState};

/// Human readable label for a vocabulary value
pub trait Labelled {
    fn label(&self) -> &'static str;
}

impl Labelled for CirculationAction {
    fn label(&self) -> &'static str {
        match self {
            CirculationAction::Checkout => "Checkout",
            CirculationAction::Checkin => "Checkin",
            CirculationAction::Request => "Request",
            CirculationAction::Lose => "Declare lost",
            CirculationAction::Receive => "Receive",
            CirculationAction::ReturnMissing => "Return missing",
            CirculationAction::ExtendLoan => "Renew",
            CirculationAction::ValidateRequest => "Validate request",
            CirculationAction::No => "No action",
        }
    }
}

impl Labelled for ItemStatus {
    fn label(&self) -> &'static str {
        match self {
            ItemStatus::OnShelf => "On shelf",
            ItemStatus::AtDesk => "At desk",
            ItemStatus::OnLoan => "On loan",
            ItemStatus::InTransit => "In transit",
            ItemStatus::Excluded => "Excluded",
            ItemStatus::Missing => "Missing",
        }
    }
}

impl Labelled for LoanState {
    fn label(&self) -> &'static str {
        match self {
            LoanState::Created => "Created",
            LoanState::Pending => "Pending",
            LoanState::ItemOnLoan => "On loan",
            LoanState::ItemReturned => "Returned",
            LoanState::ItemInTransitForPickup => "In transit for pickup",
            LoanState::ItemInTransitToHouse => "In transit to owning library",
            LoanState::ItemAtDesk => "At desk",
            LoanState::Cancelled => "Cancelled",
        }
    }
}
