// ── Device state storage ──

mod collection;
mod state_cache;

pub use state_cache::{PollHealth, StateCache};
