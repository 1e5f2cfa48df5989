pub mod data_generator;

pub use data_generator::{generate_random_inputs, load_inputs_json};
