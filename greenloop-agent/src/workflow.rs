//! # Workflow orchestrator
//!
//! Owns the conversation history and runs the write-until-green loop:
//! call the model, dispatch the tool it asks for, feed the result back,
//! repeat until the build passes or the attempt budget runs out.
//!
//! ## Design
//! - History is mutated only here, only by append; it is never rewound,
//!   truncated, or replayed
//! - A failed tool call is never retried by the orchestrator - the failure
//!   text goes back to the model, which is expected to write a fix
//! - Fatal upstream errors from the client propagate out of `run`; an
//!   application-level API error stops the run cleanly instead

use crate::client::{ModelClient, ModelReply};
use crate::conversation::{History, Part, Turn};
use crate::tool::{self, ToolExecutor, ToolOutcome};
use greenloop_error::Result;

/// Loop iterations before the workflow gives up
pub const MAX_ATTEMPTS: usize = 5;

/// Marker carried by the text part appended when the API degrades a
/// 200 response into an error signal
pub const API_ERROR_MARKER: &str = "API Error:";

/// Configuration for one workflow run
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    /// Relative path of the fixed test file inside the sandbox
    pub test_file: String,
    /// Attempt budget
    pub max_attempts: usize,
    /// Print model text and progress lines
    pub verbose: bool,
}

impl WorkflowConfig {
    pub fn new(test_file: impl Into<String>) -> Self {
        Self {
            test_file: test_file.into(),
            max_attempts: MAX_ATTEMPTS,
            verbose: true,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn quiet(mut self) -> Self {
        self.verbose = false;
        self
    }
}

/// Terminal state of one workflow run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowOutcome {
    /// The test runner reported the success marker
    Succeeded { attempts: usize },
    /// The attempt budget ran out without a passing build
    AbortedByBudget,
    /// The API degraded a response into an error signal; counted as failure
    StoppedOnApiError,
}

impl WorkflowOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, WorkflowOutcome::Succeeded { .. })
    }
}

/// The agent orchestrator - drives the model/tool loop to completion
pub struct Orchestrator<C> {
    client: C,
    executor: ToolExecutor,
    config: WorkflowConfig,
    history: History,
}

impl<C: ModelClient> Orchestrator<C> {
    pub fn new(client: C, executor: ToolExecutor, config: WorkflowConfig) -> Self {
        Self {
            client,
            executor,
            config,
            history: History::new(),
        }
    }

    /// Immutable view of the conversation so far
    pub fn history(&self) -> &[Turn] {
        self.history.turns()
    }

    /// Run the workflow to a terminal state.
    ///
    /// Fails only on fatal upstream errors (retries exhausted or a
    /// non-retryable HTTP status); everything else is a clean outcome.
    pub async fn run(&mut self) -> Result<WorkflowOutcome> {
        let tools = tool::definitions();
        self.history.push_user_text(self.start_prompt());

        let mut attempts = 0;
        while attempts < self.config.max_attempts {
            attempts += 1;

            match self.client.send(self.history.turns(), &tools).await? {
                ModelReply::Part(part) => {
                    self.history.push_model_part(part.clone());

                    if let Some(call) = part.as_function_call() {
                        let outcome = self.executor.execute(&call.name, &call.args).await;
                        self.history
                            .push_function_response(&call.name, outcome.text());

                        if call.name == tool::RUN_MAVEN_TEST
                            && matches!(outcome, ToolOutcome::TestsPassed(_))
                        {
                            if self.config.verbose {
                                println!("Workflow completed! Tests passed.");
                            }
                            return Ok(WorkflowOutcome::Succeeded { attempts });
                        }
                    } else if let Some(text) = part.as_text() {
                        // The model may be thinking out loud; it is expected
                        // to resume tool calls on the next turn.
                        if self.config.verbose {
                            println!("AI: {}", text);
                        }
                    }
                }
                ModelReply::ApiError(message) => {
                    let text = format!("{} {}", API_ERROR_MARKER, message);
                    eprintln!("Stopping loop due to API error: {}", message);
                    self.history.push_model_part(Part::text(text));
                    return Ok(WorkflowOutcome::StoppedOnApiError);
                }
                ModelReply::Malformed(message) => {
                    let text = format!("Error parsing response: {}", message);
                    if self.config.verbose {
                        println!("AI: {}", text);
                    }
                    self.history.push_model_part(Part::text(text));
                }
            }
        }

        eprintln!(
            "Agent failed to pass tests after {} attempts. Aborting.",
            self.config.max_attempts
        );
        Ok(WorkflowOutcome::AbortedByBudget)
    }

    fn start_prompt(&self) -> String {
        format!(
            "Your goal is to write Java code that passes the tests in '{test_file}'.\n\n\
             --- TASK ---\n\
             You will work in a strict loop. You MUST only respond with tool calls.\n\
             1. Call `read_file` to read the test file at '{test_file}'.\n\
             2. After you receive the file content, you MUST determine the source file path \
             (e.g., 'src/main/java/com/example/ClassName.java').\n\
             3. You MUST then call `write_file` to create the source code.\n\
             4. After you receive the write confirmation, you MUST call `run_maven_test`.\n\
             5. If the tests fail, analyze the error and go back to step 3. DO NOT just talk \
             about it, call `write_file` with the fix.\n\
             6. If the tests pass, the task is complete.\n\n\
             --- RULES ---\n\
             1. You MUST NOT modify the test file at '{test_file}'.\n\
             2. You MUST ONLY write source code to the '{writable}' directory.\n\
             3. ALL file paths MUST be relative (e.g., 'src/main/java/MyClass.java').\n\n\
             Start by calling `read_file`.",
            test_file = self.config.test_file,
            writable = tool::WRITABLE_ROOT,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{FunctionCall, Role};
    use crate::runner::TestRunner;
    use crate::sandbox::Sandbox;
    use crate::tool::ToolDefinition;
    use greenloop_error::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::TempDir;

    const TEST_FILE: &str = "src/test/java/com/example/MathServiceTest.java";

    /// Plays back a fixed sequence of replies; repeats the last one when
    /// the script runs out.
    struct ScriptedClient {
        replies: Mutex<Vec<ModelReply>>,
        calls: AtomicUsize,
    }

    impl ScriptedClient {
        fn new(replies: Vec<ModelReply>) -> Self {
            Self {
                replies: Mutex::new(replies),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl ModelClient for ScriptedClient {
        async fn send(&self, _history: &[Turn], _tools: &[ToolDefinition]) -> Result<ModelReply> {
            let index = self.calls.fetch_add(1, Ordering::SeqCst);
            let replies = self.replies.lock().unwrap();
            let reply = replies
                .get(index)
                .or_else(|| replies.last())
                .expect("script is empty")
                .clone();
            Ok(reply)
        }
    }

    /// A client that always fails fatally
    struct FailingClient;

    impl ModelClient for FailingClient {
        async fn send(&self, _history: &[Turn], _tools: &[ToolDefinition]) -> Result<ModelReply> {
            Err(Error::api_failed(400, "invalid request"))
        }
    }

    fn call(name: &str, args: serde_json::Value) -> ModelReply {
        ModelReply::Part(Part::FunctionCall {
            function_call: FunctionCall {
                name: name.to_string(),
                args,
            },
        })
    }

    fn workspace(build_command: &str) -> (TempDir, ToolExecutor) {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("src/main/java")).unwrap();
        std::fs::create_dir_all(dir.path().join("src/test/java/com/example")).unwrap();
        std::fs::write(dir.path().join(TEST_FILE), "class MathServiceTest {}").unwrap();

        let sandbox = Sandbox::new(dir.path()).unwrap();
        let runner = TestRunner::new(dir.path()).with_command(build_command);
        let executor = ToolExecutor::new(sandbox, runner, TEST_FILE);
        (dir, executor)
    }

    fn config() -> WorkflowConfig {
        WorkflowConfig::new(TEST_FILE).quiet()
    }

    #[tokio::test]
    async fn test_read_write_test_sequence_succeeds() {
        let (dir, executor) = workspace("echo BUILD SUCCESS");
        let client = ScriptedClient::new(vec![
            call(tool::READ_FILE, serde_json::json!({"filePath": TEST_FILE})),
            call(
                tool::WRITE_FILE,
                serde_json::json!({
                    "filePath": "src/main/java/com/example/MathService.java",
                    "fileContent": "public class MathService {}"
                }),
            ),
            call(tool::RUN_MAVEN_TEST, serde_json::json!({})),
        ]);

        let mut orchestrator = Orchestrator::new(client, executor, config());
        let outcome = orchestrator.run().await.unwrap();

        assert_eq!(outcome, WorkflowOutcome::Succeeded { attempts: 3 });

        // Seed turn + 3 model turns + 3 function-response turns.
        let history = orchestrator.history();
        assert_eq!(history.len(), 7);
        assert_eq!(history[0].role, Role::User);
        for pair in history[1..].chunks(2) {
            assert_eq!(pair[0].role, Role::Model);
            assert_eq!(pair[1].role, Role::User);
        }

        let written = dir.path().join("src/main/java/com/example/MathService.java");
        assert_eq!(
            std::fs::read_to_string(written).unwrap(),
            "public class MathService {}"
        );
    }

    #[tokio::test]
    async fn test_never_passing_build_aborts_on_budget() {
        let (_dir, executor) = workspace("echo BUILD FAILURE");
        let client = ScriptedClient::new(vec![call(tool::RUN_MAVEN_TEST, serde_json::json!({}))]);

        let mut orchestrator =
            Orchestrator::new(client, executor, config().with_max_attempts(4));
        let outcome = orchestrator.run().await.unwrap();

        assert_eq!(outcome, WorkflowOutcome::AbortedByBudget);
        // No further model calls once the budget is reached.
        assert_eq!(orchestrator.client.calls(), 4);
        assert_eq!(orchestrator.history().len(), 1 + 4 * 2);
    }

    #[tokio::test]
    async fn test_api_error_reply_stops_the_loop() {
        let (_dir, executor) = workspace("echo BUILD SUCCESS");
        let client = ScriptedClient::new(vec![ModelReply::ApiError("quota exceeded".to_string())]);

        let mut orchestrator = Orchestrator::new(client, executor, config());
        let outcome = orchestrator.run().await.unwrap();

        assert_eq!(outcome, WorkflowOutcome::StoppedOnApiError);
        assert!(!outcome.is_success());
        assert_eq!(orchestrator.client.calls(), 1);

        let last = orchestrator.history().last().unwrap();
        let text = last.parts[0].as_text().unwrap();
        assert!(text.contains(API_ERROR_MARKER));
        assert!(text.contains("quota exceeded"));
    }

    #[tokio::test]
    async fn test_plain_text_continues_the_loop() {
        let (_dir, executor) = workspace("echo BUILD SUCCESS");
        let client = ScriptedClient::new(vec![
            ModelReply::Part(Part::text("Let me think about the test file first.")),
            call(tool::RUN_MAVEN_TEST, serde_json::json!({})),
        ]);

        let mut orchestrator = Orchestrator::new(client, executor, config());
        let outcome = orchestrator.run().await.unwrap();

        assert_eq!(outcome, WorkflowOutcome::Succeeded { attempts: 2 });
        // The text turn was recorded but produced no function response.
        assert_eq!(orchestrator.history().len(), 4);
    }

    #[tokio::test]
    async fn test_malformed_reply_degrades_and_continues() {
        let (_dir, executor) = workspace("echo BUILD SUCCESS");
        let client = ScriptedClient::new(vec![
            ModelReply::Malformed("candidate carries no content parts".to_string()),
            call(tool::RUN_MAVEN_TEST, serde_json::json!({})),
        ]);

        let mut orchestrator = Orchestrator::new(client, executor, config());
        let outcome = orchestrator.run().await.unwrap();

        assert_eq!(outcome, WorkflowOutcome::Succeeded { attempts: 2 });
        let degraded = orchestrator.history()[1].parts[0].as_text().unwrap();
        assert!(degraded.starts_with("Error parsing response:"));
    }

    #[tokio::test]
    async fn test_failed_build_feeds_output_back_to_model() {
        let (_dir, executor) = workspace("echo COMPILATION ERROR: missing semicolon");
        let client = ScriptedClient::new(vec![call(tool::RUN_MAVEN_TEST, serde_json::json!({}))]);

        let mut orchestrator =
            Orchestrator::new(client, executor, config().with_max_attempts(1));
        let outcome = orchestrator.run().await.unwrap();

        assert_eq!(outcome, WorkflowOutcome::AbortedByBudget);
        let response_turn = &orchestrator.history()[2];
        let Part::FunctionResponse { function_response } = &response_turn.parts[0] else {
            panic!("expected function response turn");
        };
        assert!(function_response.response.content.contains("missing semicolon"));
    }

    #[tokio::test]
    async fn test_fatal_upstream_error_propagates() {
        let (_dir, executor) = workspace("echo BUILD SUCCESS");
        let mut orchestrator = Orchestrator::new(FailingClient, executor, config());

        let err = orchestrator.run().await.unwrap_err();
        assert_eq!(err.kind(), greenloop_error::ErrorKind::ApiFailed);
        // The seed turn was appended before the failing call.
        assert_eq!(orchestrator.history().len(), 1);
    }

    #[tokio::test]
    async fn test_seed_prompt_names_the_contract() {
        let (_dir, executor) = workspace("echo BUILD SUCCESS");
        let client = ScriptedClient::new(vec![ModelReply::ApiError("stop".to_string())]);

        let mut orchestrator = Orchestrator::new(client, executor, config());
        let _ = orchestrator.run().await.unwrap();

        let seed = orchestrator.history()[0].parts[0].as_text().unwrap();
        assert!(seed.contains(TEST_FILE));
        assert!(seed.contains(tool::WRITABLE_ROOT));
        assert!(seed.contains("read_file"));
    }
}
