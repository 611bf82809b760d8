//! Instruction flow tests with a scripted model, shell and embedder.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

use aicmd_cache::{CacheConfig, CacheError, SemanticCache};
use aicmd_cli::{
    run_instruction, CommandRunner, ExecutionError, ExecutionOutcome, FlowError, FlowOptions,
    FlowOutcome,
};
use aicmd_embeddings::MockEmbedder;
use aicmd_llm::{MockProvider, ProviderEmbedder, Role};

const DIM: usize = 1024;

/// Runner that replays scripted results and records what it was asked to run.
#[derive(Default)]
struct ScriptedRunner {
    results: Mutex<VecDeque<Result<ExecutionOutcome, ExecutionError>>>,
    commands: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    fn new(results: Vec<Result<ExecutionOutcome, ExecutionError>>) -> Self {
        Self {
            results: Mutex::new(results.into()),
            commands: Mutex::new(Vec::new()),
        }
    }

    fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, command: &str) -> Result<ExecutionOutcome, ExecutionError> {
        self.commands.lock().unwrap().push(command.to_string());
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(ExecutionOutcome::Completed))
    }
}

fn options() -> FlowOptions {
    FlowOptions {
        system_prompt: "Translate to a command for linux".to_string(),
        max_attempts: 3,
    }
}

fn failed(msg: &str) -> Result<ExecutionOutcome, ExecutionError> {
    Err(ExecutionError::Failed(msg.to_string()))
}

async fn open_cache(dir: &TempDir, embedder: Arc<MockEmbedder>) -> SemanticCache<Arc<MockEmbedder>> {
    SemanticCache::open(CacheConfig::new(dir.path(), DIM), embedder)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_generated_command_is_cached_and_reused() {
    let dir = TempDir::new().unwrap();
    let mut cache = open_cache(&dir, Arc::new(MockEmbedder::new(DIM))).await;
    let provider = MockProvider::new(["<command>ls -la</command>"]);
    let runner = ScriptedRunner::default();

    let outcome = run_instruction("list all files", &provider, Some(&mut cache), &runner, &options())
        .await
        .unwrap();
    assert_eq!(
        outcome,
        FlowOutcome::Generated {
            command: "ls -la".to_string(),
            attempts: 1
        }
    );

    let outcome = run_instruction("list all files", &provider, Some(&mut cache), &runner, &options())
        .await
        .unwrap();
    assert_eq!(
        outcome,
        FlowOutcome::Cached {
            command: "ls -la".to_string()
        }
    );
    assert_eq!(provider.received().len(), 1);
    assert_eq!(runner.commands(), vec!["ls -la", "ls -la"]);
}

#[tokio::test]
async fn test_similar_instruction_hits_cache() {
    let dir = TempDir::new().unwrap();
    let mut cache = open_cache(&dir, Arc::new(MockEmbedder::new(DIM))).await;
    cache.insert("list all files", "ls -la").await.unwrap();

    let provider = MockProvider::new(Vec::<String>::new());
    let runner = ScriptedRunner::default();
    let outcome = run_instruction(
        "list every file here",
        &provider,
        Some(&mut cache),
        &runner,
        &options(),
    )
    .await
    .unwrap();

    assert_eq!(
        outcome,
        FlowOutcome::Cached {
            command: "ls -la".to_string()
        }
    );
    assert!(provider.received().is_empty());
}

#[tokio::test]
async fn test_failure_is_fed_back_to_model() {
    let provider = MockProvider::new(["<command>lss</command>", "<command>ls</command>"]);
    let runner = ScriptedRunner::new(vec![failed("sh: lss: command not found")]);

    let outcome = run_instruction::<MockEmbedder>("list files", &provider, None, &runner, &options())
        .await
        .unwrap();
    assert_eq!(
        outcome,
        FlowOutcome::Generated {
            command: "ls".to_string(),
            attempts: 2
        }
    );

    let second = &provider.received()[1];
    assert_eq!(second.len(), 4);
    assert_eq!(second[0].role, Role::System);
    assert_eq!(second[2].role, Role::Assistant);
    assert_eq!(second[2].content, "lss");
    assert_eq!(second[3].role, Role::User);
    assert_eq!(second[3].content, "sh: lss: command not found");
}

#[tokio::test]
async fn test_long_errors_truncated() {
    let provider = MockProvider::new(["<command>a</command>", "<command>b</command>"]);
    let long = "e".repeat(2000);
    let runner = ScriptedRunner::new(vec![failed(&long)]);

    run_instruction::<MockEmbedder>("do it", &provider, None, &runner, &options())
        .await
        .unwrap();
    assert_eq!(provider.received()[1][3].content.chars().count(), 500);
}

#[tokio::test]
async fn test_gives_up_after_max_attempts_and_caches_nothing() {
    let dir = TempDir::new().unwrap();
    let mut cache = open_cache(&dir, Arc::new(MockEmbedder::new(DIM))).await;
    let provider = MockProvider::new([
        "<command>one</command>",
        "<command>two</command>",
        "<command>three</command>",
    ]);
    let runner = ScriptedRunner::new(vec![failed("x"), failed("y"), failed("z")]);

    let err = run_instruction("break things", &provider, Some(&mut cache), &runner, &options())
        .await
        .unwrap_err();
    assert!(matches!(err, FlowError::AttemptsExhausted(3)));
    assert_eq!(provider.received().len(), 3);
    assert!(cache.entries().unwrap().is_empty());
}

#[tokio::test]
async fn test_failing_cached_command_is_evicted_and_regenerated() {
    let dir = TempDir::new().unwrap();
    let mut cache = open_cache(&dir, Arc::new(MockEmbedder::new(DIM))).await;
    cache.insert("show disk usage", "dfx -h").await.unwrap();

    let provider = MockProvider::new(["<command>df -h</command>"]);
    let runner = ScriptedRunner::new(vec![failed("sh: dfx: not found")]);

    let outcome = run_instruction("show disk usage", &provider, Some(&mut cache), &runner, &options())
        .await
        .unwrap();
    assert_eq!(
        outcome,
        FlowOutcome::Generated {
            command: "df -h".to_string(),
            attempts: 1
        }
    );
    assert_eq!(runner.commands(), vec!["dfx -h", "df -h"]);

    let entries = cache.entries().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].command, "df -h");
}

#[tokio::test]
async fn test_cancelled_command_not_cached() {
    let dir = TempDir::new().unwrap();
    let mut cache = open_cache(&dir, Arc::new(MockEmbedder::new(DIM))).await;
    let provider = MockProvider::new(["<command>rm -rf build</command>"]);
    let runner = ScriptedRunner::new(vec![Err(ExecutionError::Cancelled)]);

    let outcome = run_instruction("clean the build", &provider, Some(&mut cache), &runner, &options())
        .await
        .unwrap();
    assert_eq!(outcome, FlowOutcome::Cancelled);
    assert!(cache.entries().unwrap().is_empty());
}

#[tokio::test]
async fn test_cancelled_cached_command_kept() {
    let dir = TempDir::new().unwrap();
    let mut cache = open_cache(&dir, Arc::new(MockEmbedder::new(DIM))).await;
    cache.insert("show disk usage", "df -h").await.unwrap();

    let provider = MockProvider::new(Vec::<String>::new());
    let runner = ScriptedRunner::new(vec![Err(ExecutionError::Cancelled)]);

    let outcome = run_instruction("show disk usage", &provider, Some(&mut cache), &runner, &options())
        .await
        .unwrap();
    assert_eq!(outcome, FlowOutcome::Cancelled);
    assert_eq!(cache.entries().unwrap().len(), 1);
}

#[tokio::test]
async fn test_directory_change_counts_as_success() {
    let dir = TempDir::new().unwrap();
    let mut cache = open_cache(&dir, Arc::new(MockEmbedder::new(DIM))).await;
    let provider = MockProvider::new(["<command>cd /tmp</command>"]);
    let runner = ScriptedRunner::new(vec![Ok(ExecutionOutcome::DirectoryChange("/tmp".to_string()))]);

    run_instruction("go to tmp", &provider, Some(&mut cache), &runner, &options())
        .await
        .unwrap();
    assert_eq!(cache.entries().unwrap()[0].command, "cd /tmp");
}

#[tokio::test]
async fn test_reply_without_command() {
    let provider = MockProvider::new(["I cannot help with that."]);
    let runner = ScriptedRunner::default();

    let err = run_instruction::<MockEmbedder>("do something", &provider, None, &runner, &options())
        .await
        .unwrap_err();
    assert!(matches!(err, FlowError::NoCommand(raw) if raw == "I cannot help with that."));
    assert!(runner.commands().is_empty());
}

#[tokio::test]
async fn test_provider_error_surfaces() {
    let provider = MockProvider::new(Vec::<String>::new());
    let runner = ScriptedRunner::default();

    let err = run_instruction::<MockEmbedder>("anything", &provider, None, &runner, &options())
        .await
        .unwrap_err();
    assert!(matches!(err, FlowError::Provider { .. }));
}

#[tokio::test]
async fn test_embedding_outage_degrades_to_generation() {
    let dir = TempDir::new().unwrap();
    let embedder = Arc::new(MockEmbedder::new(DIM));
    let mut cache = open_cache(&dir, embedder.clone()).await;
    cache.insert("list all files", "ls -la").await.unwrap();
    embedder.set_failing(true);

    let provider = MockProvider::new(["<command>ls -la</command>"]);
    let runner = ScriptedRunner::default();
    let outcome = run_instruction("list all files", &provider, Some(&mut cache), &runner, &options())
        .await
        .unwrap();

    assert!(matches!(outcome, FlowOutcome::Generated { .. }));
    assert_eq!(provider.received().len(), 1);
}

#[tokio::test]
async fn test_empty_instruction_rejected() {
    let provider = MockProvider::new(Vec::<String>::new());
    let runner = ScriptedRunner::default();
    let err = run_instruction::<MockEmbedder>("   ", &provider, None, &runner, &options())
        .await
        .unwrap_err();
    assert!(matches!(err, FlowError::EmptyInstruction));
}

#[tokio::test]
async fn test_wrong_embedding_length_is_fatal() {
    let dir = TempDir::new().unwrap();
    let embedding_provider =
        MockProvider::new(Vec::<String>::new()).with_embedding(vec![0.5; 1024]);
    let embedder = ProviderEmbedder::new(Arc::new(embedding_provider), 1536);
    let mut cache = SemanticCache::open(CacheConfig::new(dir.path(), 1536), embedder)
        .await
        .unwrap();

    let provider = MockProvider::new(["<command>ls -la</command>"]);
    let runner = ScriptedRunner::default();
    let err = run_instruction("list files", &provider, Some(&mut cache), &runner, &options())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        FlowError::Cache(CacheError::DimensionMismatch {
            expected: 1536,
            actual: 1024
        })
    ));
    assert!(provider.received().is_empty());
    assert!(runner.commands().is_empty());
    assert!(cache.entries().unwrap().is_empty());
}
