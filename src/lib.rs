// Library surface for headless/integration tests and reuse.
// Keep this lean to avoid coupling to bin-only types in main.rs.
pub mod clock;
pub mod compose;
pub mod config;
pub mod error;
pub mod feedback;
pub mod input;
pub mod metrics;
pub mod runtime;
pub mod session;
pub mod text;
pub mod whitelist;

pub use session::{KeyOutcome, Phase, PracticeSession, Update};
pub use whitelist::{compute_mask, SkipMask, Whitelist};
