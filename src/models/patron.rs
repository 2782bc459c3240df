//! Patron identity and desk operator

use serde::{Deserialize, Serialize};

use super::item::ItemQueue;

/// Patron identified at the desk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patron {
    pub pid: String,
    pub barcode: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    /// Owning library
    pub library_pid: Option<String>,
    pub organisation_pid: String,
    /// Items handled for this patron during the open desk session
    #[serde(default)]
    pub items: ItemQueue,
}

impl Patron {
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{} {}", first, last),
            (None, Some(last)) => last.clone(),
            (Some(first), None) => first.clone(),
            (None, None) => self.barcode.clone(),
        }
    }
}

/// Librarian running the desk; stamped on every submitted transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operator {
    pub user_pid: String,
    pub library_pid: String,
    pub organisation_pid: String,
}
