//! Circulation item model and the pid-unique item queue.
//!
//! An [`Item`] mirrors what the backend reports (status, active loan, request
//! queue, legal actions) plus two desk-side fields: the action chosen at the
//! desk (`current_action`) and the action the backend last applied
//! (`action_done`).

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::enums::{CirculationAction, ItemStatus};
use super::loan::Loan;

/// Physical item as seen from the circulation desk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub pid: String,
    pub barcode: String,
    #[serde(default)]
    pub status: ItemStatus,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub library_pid: Option<String>,
    #[serde(default)]
    pub location_pid: Option<String>,
    /// Globally available for loan, as decided by the backend
    #[serde(default)]
    pub available: bool,
    /// Actions the backend currently allows on this item
    #[serde(default)]
    pub actions: Vec<CirculationAction>,
    #[serde(default)]
    pub loan: Option<Loan>,
    /// Outstanding requests, oldest first
    #[serde(default)]
    pub pending_loans: Vec<Loan>,
    #[serde(default)]
    pub current_action: CirculationAction,
    #[serde(default)]
    pub action_done: Option<CirculationAction>,
}

impl Item {
    pub fn has_requests(&self) -> bool {
        !self.pending_loans.is_empty()
    }

    /// 1-based position of the patron's request in the request queue
    pub fn request_position(&self, patron_pid: &str) -> Option<usize> {
        self.pending_loans
            .iter()
            .position(|loan| loan.belongs_to(patron_pid))
            .map(|idx| idx + 1)
    }

    /// Patron owns the currently active loan on this item
    pub fn is_loaned_to(&self, patron_pid: &str) -> bool {
        self.loan
            .as_ref()
            .map_or(false, |loan| loan.state.is_active() && loan.belongs_to(patron_pid))
    }

    /// Available, or held at the desk with the patron first in line
    pub fn can_loan_to(&self, patron_pid: &str) -> bool {
        self.available || (self.status == ItemStatus::AtDesk && self.request_position(patron_pid) == Some(1))
    }

    pub fn allows(&self, action: CirculationAction) -> bool {
        self.actions.contains(&action)
    }

    pub fn is_pending(&self) -> bool {
        self.current_action.is_submittable()
    }

    /// Loan pid to send along with an action on this item
    pub fn active_loan_pid(&self) -> Option<&str> {
        self.loan
            .as_ref()
            .or_else(|| self.pending_loans.first())
            .map(|loan| loan.loan_pid.as_str())
    }
}

/// Ordered item list in which every pid appears at most once
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemQueue {
    items: IndexMap<String, Item>,
}

impl ItemQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    pub fn get(&self, pid: &str) -> Option<&Item> {
        self.items.get(pid)
    }

    pub fn get_mut(&mut self, pid: &str) -> Option<&mut Item> {
        self.items.get_mut(pid)
    }

    pub fn contains(&self, pid: &str) -> bool {
        self.items.contains_key(pid)
    }

    pub fn contains_barcode(&self, barcode: &str) -> bool {
        self.items.values().any(|item| item.barcode == barcode)
    }

    /// Insert at the head of the list; refused when the pid is already queued
    pub fn push_front(&mut self, item: Item) -> bool {
        if self.items.contains_key(&item.pid) {
            return false;
        }
        self.items.shift_insert(0, item.pid.clone(), item);
        true
    }

    /// Append at the tail of the list; refused when the pid is already queued
    pub fn push_back(&mut self, item: Item) -> bool {
        if self.items.contains_key(&item.pid) {
            return false;
        }
        self.items.insert(item.pid.clone(), item);
        true
    }

    /// Remove an entry, keeping the order of the others
    pub fn remove(&mut self, pid: &str) -> Option<Item> {
        self.items.shift_remove(pid)
    }

    pub fn has_pending_actions(&self) -> bool {
        self.items.values().any(Item::is_pending)
    }

    pub fn pending(&self) -> impl Iterator<Item = &Item> {
        self.items.values().filter(|item| item.is_pending())
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl FromIterator<Item> for ItemQueue {
    /// Later duplicates of a pid are dropped
    fn from_iter<I: IntoIterator<Item = Item>>(iter: I) -> Self {
        let mut queue = ItemQueue::new();
        for item in iter {
            queue.push_back(item);
        }
        queue
    }
}

impl IntoIterator for ItemQueue {
    type Item = Item;
    type IntoIter = indexmap::map::IntoValues<String, Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_values()
    }
}

impl Serialize for ItemQueue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.items.values())
    }
}

impl<'de> Deserialize<'de> for ItemQueue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<Item>::deserialize(deserializer).map(ItemQueue::from_iter)
    }
}
