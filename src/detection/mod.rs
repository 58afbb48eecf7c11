pub mod brute_force;
pub mod classifier;
pub mod rules;
pub mod stats;

pub use brute_force::{BruteForceDetector, FailureBurst};
pub use classifier::{classify_auth, classify_severity, is_auth_relevant};
