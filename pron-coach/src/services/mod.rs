//! Services built on top of the profile store

pub mod profile_service;

pub use profile_service::{LearnerLocks, ProfileService};
