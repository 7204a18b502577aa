//! # Tool registry and dispatch
//!
//! The fixed set of tools the model may call, declared as typed schemas for
//! inclusion in every request, plus the executor that dispatches calls to
//! the sandbox and the test runner.
//!
//! ## Design
//! - Three tools, built once at startup, never extended at runtime
//! - `execute` never fails: the only consumer of a tool result is the model
//!   itself, so every failure mode (unknown tool, security violation, I/O
//!   failure, build failure) is carried back as natural-language text
//! - The outcome is tagged so the orchestrator can switch on what happened
//!   without sniffing the result string

use crate::runner::{TestRun, TestRunner};
use crate::sandbox::{normalize_relative, Sandbox};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The subtree the agent is allowed to write source code into
pub const WRITABLE_ROOT: &str = "src/main/java/";

/// Tool name constants - referenced by the orchestrator for termination checks
pub const WRITE_FILE: &str = "write_file";
pub const READ_FILE: &str = "read_file";
pub const RUN_MAVEN_TEST: &str = "run_maven_test";

// ============================================================================
// Schemas
// ============================================================================

/// A tool the model may invoke, with its parameter contract.
///
/// Immutable once built; serializes to the provider's function-declaration
/// wire shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: ParameterSchema,
}

/// JSON-schema-like object contract for a tool's parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    pub properties: BTreeMap<String, ParameterSpec>,
    pub required: Vec<String>,
}

/// One named parameter: its type and human description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    #[serde(rename = "type")]
    pub param_type: String,
    pub description: String,
}

impl ParameterSpec {
    fn string(description: impl Into<String>) -> Self {
        Self {
            param_type: "string".to_string(),
            description: description.into(),
        }
    }
}

impl ToolDefinition {
    fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            parameters: ParameterSchema {
                schema_type: "object".to_string(),
                properties: BTreeMap::new(),
                required: Vec::new(),
            },
        }
    }

    fn with_param(mut self, name: &str, spec: ParameterSpec, required: bool) -> Self {
        self.parameters.properties.insert(name.to_string(), spec);
        if required {
            self.parameters.required.push(name.to_string());
        }
        self
    }
}

/// Build the fixed set of three tool declarations
pub fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new(
            WRITE_FILE,
            "writes or overwrites a file with the provided content.",
        )
        .with_param(
            "filePath",
            ParameterSpec::string(
                "The full path to the file, e.g., 'src/main/java/com/example/MyService.java'",
            ),
            true,
        )
        .with_param(
            "fileContent",
            ParameterSpec::string("The entire Java code content to write to the file."),
            true,
        ),
        ToolDefinition::new(READ_FILE, "Reads the entire content of a specified file.").with_param(
            "filePath",
            ParameterSpec::string("The full path to the file, e.g., 'src/test/java/com/example/MyServiceTest.java'"),
            true,
        ),
        ToolDefinition::new(
            RUN_MAVEN_TEST,
            "Compiles all source code and runs the JUnit tests using Maven ('mvn clean test'). \
             Returns the full console output from Maven, including compile errors or test failures.",
        ),
    ]
}

// ============================================================================
// Dispatch
// ============================================================================

/// Tagged result of one tool dispatch.
///
/// Every variant carries the text fed back to the model on the next turn.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    /// The tool ran and produced a result
    Ok(String),
    /// A security rule blocked the call; nothing was mutated
    Denied(String),
    /// The tool ran into an I/O or launch failure
    Failed(String),
    /// The test runner found the success marker
    TestsPassed(String),
    /// The test runner completed without the success marker
    TestsFailed(String),
    /// The model asked for a tool that does not exist
    Unknown(String),
}

impl ToolOutcome {
    /// The natural-language result text, regardless of tag
    pub fn text(&self) -> &str {
        match self {
            ToolOutcome::Ok(text)
            | ToolOutcome::Denied(text)
            | ToolOutcome::Failed(text)
            | ToolOutcome::TestsPassed(text)
            | ToolOutcome::TestsFailed(text)
            | ToolOutcome::Unknown(text) => text,
        }
    }
}

/// Dispatches model-requested tool calls against the sandbox and runner.
#[derive(Debug, Clone)]
pub struct ToolExecutor {
    sandbox: Sandbox,
    runner: TestRunner,
    /// Relative path of the test file the agent must never write
    protected_test_file: String,
}

impl ToolExecutor {
    pub fn new(sandbox: Sandbox, runner: TestRunner, protected_test_file: impl Into<String>) -> Self {
        Self {
            sandbox,
            runner,
            protected_test_file: normalize_relative(&protected_test_file.into()),
        }
    }

    /// Execute a named tool. Never fails; all failure modes become text.
    pub async fn execute(&self, name: &str, args: &serde_json::Value) -> ToolOutcome {
        match name {
            WRITE_FILE => self.write_file(args),
            READ_FILE => self.read_file(args),
            RUN_MAVEN_TEST => self.run_maven_test().await,
            other => ToolOutcome::Unknown(format!("Unknown tool: {}", other)),
        }
    }

    fn write_file(&self, args: &serde_json::Value) -> ToolOutcome {
        let path = match required_str(args, "filePath") {
            Ok(p) => p,
            Err(text) => return ToolOutcome::Failed(text),
        };
        let content = match required_str(args, "fileContent") {
            Ok(c) => c,
            Err(text) => return ToolOutcome::Failed(text),
        };

        // Protection rules compare normalized spellings, so '.' and '..'
        // segments cannot smuggle a write past them.
        let normalized = normalize_relative(path);
        if normalized == self.protected_test_file {
            eprintln!("AGENT: BLOCKED attempt to write to test file: {}", path);
            return ToolOutcome::Denied(format!(
                "Access denied: You are NOT allowed to modify the test file at {}",
                self.protected_test_file
            ));
        }
        if !normalized.starts_with(WRITABLE_ROOT) {
            eprintln!("AGENT: BLOCKED attempt to write outside '{}': {}", WRITABLE_ROOT, path);
            return ToolOutcome::Denied(format!(
                "Access denied: You are ONLY allowed to write to files within '{}'. \
                 Your path '{}' is invalid.",
                WRITABLE_ROOT, path
            ));
        }

        let target = match self.sandbox.resolve(path) {
            Ok(target) => target,
            Err(e) => return ToolOutcome::Denied(e.message().to_string()),
        };

        if let Some(parent) = target.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                return ToolOutcome::Failed(format!("Failed to create directories: {}", e));
            }
        }
        println!("AGENT: Writing to file {}", path);
        match std::fs::write(&target, content) {
            Ok(()) => ToolOutcome::Ok(format!("File written successfully to {}", path)),
            Err(e) => ToolOutcome::Failed(format!("Failed to write {}: {}", path, e)),
        }
    }

    fn read_file(&self, args: &serde_json::Value) -> ToolOutcome {
        let path = match required_str(args, "filePath") {
            Ok(p) => p,
            Err(text) => return ToolOutcome::Failed(text),
        };

        let target = match self.sandbox.resolve(path) {
            Ok(target) => target,
            Err(e) => return ToolOutcome::Denied(e.message().to_string()),
        };

        println!("AGENT: Reading file {}", path);
        match std::fs::read_to_string(&target) {
            Ok(content) => ToolOutcome::Ok(content),
            Err(e) => ToolOutcome::Failed(format!("Failed to read {}: {}", path, e)),
        }
    }

    async fn run_maven_test(&self) -> ToolOutcome {
        println!("AGENT: Running the build+test command...");
        let TestRun { passed, output } = self.runner.run().await;

        if passed {
            ToolOutcome::TestsPassed(format!("Maven command successful.\n\n{}", output))
        } else {
            ToolOutcome::TestsFailed(format!(
                "Maven command failed. The AI must analyze the compile or test errors.\n\n{}",
                output
            ))
        }
    }
}

fn required_str<'a>(args: &'a serde_json::Value, key: &str) -> std::result::Result<&'a str, String> {
    args.get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| format!("Missing required string argument '{}'", key))
}
