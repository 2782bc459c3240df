//! Action inference: which action the desk offers for a freshly scanned item

use crate::{
    error::{DeskError, DeskResult},
    models::{CirculationAction, Item, Patron},
};

/// Item can be handled for this patron at all
pub fn is_eligible(item: &Item, patron: &Patron) -> bool {
    item.can_loan_to(&patron.pid) || item.is_loaned_to(&patron.pid)
}

/// Default action for `item` once `patron` is identified.
///
/// Rules, in order: the item must be eligible for the patron, the backend must
/// allow something other than `no`, then `checkin` if the patron already holds
/// the item and `checkout` otherwise.
pub fn default_action(item: &Item, patron: &Patron) -> DeskResult<CirculationAction> {
    if !is_eligible(item, patron) {
        return Err(DeskError::ItemUnavailable(item.barcode.clone()));
    }

    if item.actions.iter().all(|action| !action.is_submittable()) {
        return Err(DeskError::NoActionPossible(item.barcode.clone()));
    }

    if item.is_loaned_to(&patron.pid) {
        Ok(CirculationAction::Checkin)
    } else {
        Ok(CirculationAction::Checkout)
    }
}

/// Check a desk override against the actions the backend reported
pub fn validate_override(item: &Item, action: CirculationAction) -> DeskResult<()> {
    if action == CirculationAction::No || item.allows(action) {
        Ok(())
    } else {
        Err(DeskError::ActionNotAllowed {
            item_pid: item.pid.clone(),
            action,
        })
    }
}
