pub mod errors;
pub mod mcp;
pub mod models;
pub mod orchestrator;
pub mod providers;
pub mod tools;
