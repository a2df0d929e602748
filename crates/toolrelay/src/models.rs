//! These models represent the objects passed around by the orchestrator
//!
//! There are three formats we need to interact with:
//! - anthropic messages/tools, sent from the orchestrator to the LLM
//! - mcp tools and call results, exchanged with the remote tool server
//! - the rendered transcript shown to the operator in the cli
//!
//! We always immediately convert the wire formats into these internal structs, so the
//! orchestration loop never sees a provider or transport specific shape.
pub mod content;
pub mod message;
pub mod role;
pub mod tool;
