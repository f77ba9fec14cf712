//! The conversational agent.
//!
//! Each user turn runs a dispatch loop: an [`ActionChooser`] picks a tool or
//! a final answer, the tool result is appended to the session transcript as
//! an observation, and the loop repeats up to the iteration cap.

mod chooser;
mod runner;
mod session;
mod transcript;

pub use chooser::{Action, ActionChooser, LlmActionChooser, FINAL_ANSWER};
pub use runner::{Agent, AgentResponse, ToolCallRecord, DEFAULT_MAX_ITERATIONS};
pub use session::{Session, SessionStore};
pub use transcript::{Role, Transcript, Turn};
