pub mod catalog;
pub mod policy;
pub mod stats;
