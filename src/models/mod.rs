//! Data models for the circulation desk

pub mod enums;
pub mod item;
pub mod labels;
pub mod loan;
pub mod patron;
pub mod session;

// Re-export commonly used types
pub use enums::{CirculationAction, ItemStatus, LoanState};
pub use item::{Item, ItemQueue};
pub use labels::Labelled;
pub use loan::Loan;
pub use patron::{Operator, Patron};
pub use session::Session;
