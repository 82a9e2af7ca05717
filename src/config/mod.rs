pub mod loader;
pub mod throttle;
pub mod types;

pub use loader::Config;
pub use throttle::{PriorityTools, SpeedMode, ThrottleProfile};
pub use types::*;
