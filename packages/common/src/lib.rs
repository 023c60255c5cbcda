pub mod check;
pub mod modes;
pub mod storage;

pub use check::{CheckOutcome, Verdict};
pub use modes::{ParticipationMode, RegistrationType, TasksGrouping};
