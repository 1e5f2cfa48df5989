pub mod cheapest_insertion;

pub use cheapest_insertion::CheapestInsertion;
