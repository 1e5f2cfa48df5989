pub mod fitness;
pub mod penalty;
