pub mod policy;

pub use policy::{PeriodTag, PrunePlan, PruneResult, RetentionPolicy, SnapshotLabel, SnapshotPolicy};
