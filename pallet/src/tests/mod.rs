mod merkle;
mod utils;

pub use utils::*;
