//! # Greenloop CLI
//!
//! Command-line interface for running the TDD agent.
//!
//! Usage:
//!   greenloop <TEST_FILE>
//!   greenloop --sandbox my-project src/test/java/com/example/MathServiceTest.java
//!
//! The API credential is read from GEMINI_API_KEY exactly once, here, and
//! passed through configuration; nothing else touches the environment.

use clap::Parser;
use greenloop_agent::{
    ClientConfig, GeminiClient, Orchestrator, Sandbox, TestRunner, ToolExecutor, WorkflowConfig,
    WorkflowOutcome,
};

#[derive(Parser)]
#[command(name = "greenloop")]
#[command(author, version, about = "Greenloop - an autonomous write-until-green TDD agent")]
struct Cli {
    /// Relative path of the test file inside the sandbox
    /// (e.g., 'src/test/java/com/example/MathServiceTest.java')
    test_file: String,

    /// Workspace directory the agent is confined to
    #[arg(short, long, default_value = "code-sandbox")]
    sandbox: String,

    /// Maximum loop iterations before aborting
    #[arg(long, default_value_t = greenloop_agent::MAX_ATTEMPTS)]
    max_attempts: usize,

    /// Model to drive the loop with
    #[arg(short, long)]
    model: Option<String>,

    /// Quiet mode - suppress model commentary and progress lines
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let Ok(api_key) = std::env::var("GEMINI_API_KEY") else {
        eprintln!("Error: GEMINI_API_KEY environment variable is not set.");
        std::process::exit(1);
    };
    if api_key.is_empty() {
        eprintln!("Error: GEMINI_API_KEY environment variable is empty.");
        std::process::exit(1);
    }

    let mut client_config = ClientConfig::new(api_key);
    if let Some(model) = &cli.model {
        client_config = client_config.with_model(model);
    }

    let client = match GeminiClient::new(client_config) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let sandbox = match Sandbox::new(&cli.sandbox) {
        Ok(sandbox) => sandbox,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if !cli.quiet {
        println!("Starting TDD Agent with Workspace:");
        println!(" Sandbox Path: {}", sandbox.root().display());
        println!(" Task Test File: {}/{}", cli.sandbox, cli.test_file);
    }

    let runner = TestRunner::new(sandbox.root());
    let executor = ToolExecutor::new(sandbox, runner, &cli.test_file);

    let mut workflow_config =
        WorkflowConfig::new(&cli.test_file).with_max_attempts(cli.max_attempts);
    if cli.quiet {
        workflow_config = workflow_config.quiet();
    }

    let mut orchestrator = Orchestrator::new(client, executor, workflow_config);

    match orchestrator.run().await {
        Ok(WorkflowOutcome::Succeeded { attempts }) => {
            println!("Tests passed after {} attempt(s).", attempts);
        }
        Ok(WorkflowOutcome::AbortedByBudget) => {
            eprintln!("Aborted: attempt budget exhausted without a passing build.");
            std::process::exit(1);
        }
        Ok(WorkflowOutcome::StoppedOnApiError) => {
            eprintln!("Stopped: the API reported an error.");
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("An error occurred during the TDD workflow:");
            eprintln!("{:?}", e);
            std::process::exit(1);
        }
    }
}
