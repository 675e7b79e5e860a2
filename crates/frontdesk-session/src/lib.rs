//! Per-call session orchestration.
//!
//! One [`CallSession`] drives a live voice call end to end: it listens for
//! caller utterances on the transport, transcribes them, asks the language
//! model what to do, executes any requested tools against the booking
//! ledger, and speaks the reply back through TTS (and the avatar, once its
//! warm-up has finished). When the call ends — farewell tool, hangup,
//! operator cancellation, or a dead provider — a summary of the call is
//! generated and recorded exactly once.
//!
//! The [`SessionRegistry`] tracks live sessions process-wide so the control
//! surface can mint tokens for them and request orderly termination.

pub mod context;
pub mod costs;
pub mod error;
pub mod orchestrator;
pub mod registry;
pub mod summary;
pub mod timeparse;
pub mod tools;

pub use context::SessionContext;
pub use costs::{CostAccountant, CostEstimate};
pub use error::SessionError;
pub use orchestrator::{CallEnd, CallSession, SessionPhase, SessionProviders, SessionReport};
pub use registry::{SessionHandle, SessionRegistry, SessionSnapshot};
pub use summary::SummaryGenerator;
pub use tools::{tool_schemas, SpokenStart, ToolCall, ToolDispatcher, ToolError, ToolOutcome};
