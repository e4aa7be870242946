pub mod core;
pub mod gradebook;
