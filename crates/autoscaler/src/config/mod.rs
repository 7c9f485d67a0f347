pub mod cli;
pub mod duration;
pub mod scaler;

pub use cli::*;
pub use duration::parse_duration;
pub use scaler::*;
