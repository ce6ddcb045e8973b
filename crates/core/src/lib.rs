pub mod duplicate_detection;
pub mod error;
pub mod hashing;
pub mod types;
