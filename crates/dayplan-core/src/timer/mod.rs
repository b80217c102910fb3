mod engine;
mod session;

pub use engine::{TimerEngine, TimerProgress, TimerState};
pub use session::SessionRegistry;
