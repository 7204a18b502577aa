//! # Greenloop Agent
//!
//! An autonomous "write code until tests pass" loop.
//!
//! ## Core Concepts
//! - **Conversation**: append-only turn history, wire-shaped for the provider
//! - **Tools**: the fixed read/write/test capabilities the model may call
//! - **Sandbox**: every model-supplied path is confined to one workspace root
//! - **Runner**: launches the build+test command and captures its output
//! - **Client**: resilient Gemini HTTP client with doubling backoff
//! - **Workflow**: the orchestrator state machine driving it all

pub mod client;
pub mod conversation;
pub mod runner;
pub mod sandbox;
pub mod tool;
pub mod workflow;

pub use client::{
    ClientConfig, GeminiClient, ModelClient, ModelReply, INITIAL_BACKOFF_MS, MAX_RETRIES,
};
pub use conversation::{FunctionCall, FunctionResponse, History, Part, Role, Turn};
pub use runner::{TestRun, TestRunner, DEFAULT_COMMAND, SUCCESS_MARKER};
pub use sandbox::Sandbox;
pub use tool::{
    definitions, ParameterSchema, ParameterSpec, ToolDefinition, ToolExecutor, ToolOutcome,
    READ_FILE, RUN_MAVEN_TEST, WRITABLE_ROOT, WRITE_FILE,
};
pub use workflow::{
    Orchestrator, WorkflowConfig, WorkflowOutcome, API_ERROR_MARKER, MAX_ATTEMPTS,
};
