/// JSON-RPC tool protocol
///
/// This module handles communication with clients over stdin/stdout,
/// including JSON-RPC parsing and tool routing.

pub mod protocol;
pub mod server;

// Re-export main types
pub use server::{tool_definitions, McpServer};
