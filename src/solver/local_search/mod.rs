pub mod diversification;
pub mod neighborhood;
pub mod search;

pub use neighborhood::{find_neighbours, Move};
pub use search::{LocalSearch, SearchStats};
