//! Desk session state

use std::collections::BTreeSet;

use serde::Serialize;

use super::item::ItemQueue;
use super::patron::Patron;

/// State of one circulation desk screen.
///
/// Rebuilt from backend answers on every scan and never persisted. The
/// `generation` counter changes whenever the identified patron changes or the
/// session is cleared, so results of lookups started before that point can be
/// recognised as stale.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Session {
    pub identified_patron: Option<Patron>,
    /// Items handled by automatic checkin before any patron was identified
    pub anonymous_items: ItemQueue,
    pub last_scan_text: Option<String>,
    pub generation: u64,
    /// Codes whose lookup or automatic action has not come back yet
    #[serde(skip)]
    pub scans_in_flight: BTreeSet<String>,
}

impl Session {
    /// Item list scans are currently checked against
    pub fn active_items(&self) -> &ItemQueue {
        match &self.identified_patron {
            Some(patron) => &patron.items,
            None => &self.anonymous_items,
        }
    }

    pub fn has_pending_actions(&self) -> bool {
        self.identified_patron
            .as_ref()
            .map_or(false, |patron| patron.items.has_pending_actions())
    }

    /// Back to the initial empty state, invalidating in-flight lookups.
    /// Their codes stay claimed until they come back from the backend.
    pub fn reset(&mut self) {
        let generation = self.generation + 1;
        let scans_in_flight = std::mem::take(&mut self.scans_in_flight);
        *self = Session {
            generation,
            scans_in_flight,
            ..Session::default()
        };
    }

    pub fn identify(&mut self, patron: Patron) {
        self.identified_patron = Some(patron);
        self.anonymous_items.clear();
        self.generation += 1;
    }
}
