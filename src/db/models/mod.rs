pub mod contact;
pub mod run;

pub use contact::StoredContact;
pub use run::{RunRecord, RunStatus};
