mod classifier;
mod cleaner;
mod executor;
pub mod protection;

pub use classifier::{
    Classification, ClassificationSummary, Disposition, Verdict, classify, protection_set,
};
pub use cleaner::{CleanOptions, Cleaner, RunReport, now_unix};
pub use executor::{
    DeleteCategory, DeletionExecutor, DeletionOutcome, DeletionReport, removal_targets,
};
pub use protection::{ProtectionReason, ProtectionSet};
