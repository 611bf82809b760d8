//! Instruction -> command flow: cache lookup, generation, execution.
//!
//! 1. A cache hit is executed directly. If it fails it is evicted and the
//!    instruction goes on to generation.
//! 2. Otherwise the model is asked for a command, up to `max_attempts`
//!    times. Each failure is fed back to the model.
//! 3. The first command that runs successfully is cached.

use thiserror::Error;
use tracing::{debug, info, warn};

use aicmd_cache::{CacheError, SemanticCache};
use aicmd_embeddings::{Embedding, EmbeddingProvider};
use aicmd_llm::{LlmProvider, Message, ProviderError};

use crate::executor::{CommandRunner, ExecutionError};
use crate::prompt::{extract_command, truncate_chars, MAX_ERROR_CHARS};

/// Errors that end the flow.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("No instruction given")]
    EmptyInstruction,

    #[error("Error calling {provider} API: {source}")]
    Provider {
        provider: String,
        #[source]
        source: ProviderError,
    },

    #[error("Unable to extract command from LLM response\nRaw response: {0}")]
    NoCommand(String),

    #[error("Maximum attempts ({0}) reached. Unable to execute the command successfully.")]
    AttemptsExhausted(u32),

    /// The cache cannot work with the configured embedding model
    #[error("Command cache misconfigured: {0}")]
    Cache(#[source] CacheError),
}

/// How an instruction was resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowOutcome {
    /// A cached command ran successfully
    Cached { command: String },
    /// A generated command ran successfully after `attempts` tries
    Generated { command: String, attempts: u32 },
    /// The user declined to run the command
    Cancelled,
}

/// Settings for one run of the flow.
#[derive(Debug, Clone)]
pub struct FlowOptions {
    pub system_prompt: String,
    /// Generation attempts (at least one)
    pub max_attempts: u32,
}

/// Resolve `instruction` and run the resulting command.
///
/// `cache` is `None` when caching is disabled or unavailable. Cache
/// failures only cost the lookup, except a vector length that does not
/// match the configuration, which ends the flow.
pub async fn run_instruction<E: EmbeddingProvider>(
    instruction: &str,
    provider: &dyn LlmProvider,
    mut cache: Option<&mut SemanticCache<E>>,
    runner: &dyn CommandRunner,
    options: &FlowOptions,
) -> Result<FlowOutcome, FlowError> {
    let instruction = instruction.trim();
    if instruction.is_empty() {
        return Err(FlowError::EmptyInstruction);
    }

    let mut embedding: Option<Embedding> = None;
    if let Some(cache) = cache.as_deref_mut() {
        match cache.embed(instruction).await {
            Ok(e) => embedding = Some(e),
            Err(e) if e.is_configuration() => return Err(FlowError::Cache(e)),
            Err(e) => warn!(error = %e, "Cache unavailable for this instruction"),
        }

        if let Some(hit) = embedding.as_ref().and_then(|e| cache.lookup_with_embedding(e)) {
            println!("Cached command: {}", hit.command);
            debug!(distance = hit.distance, cached_for = %hit.instruction, "Using cached command");
            match runner.run(&hit.command).await {
                Ok(_) => {
                    return Ok(FlowOutcome::Cached {
                        command: hit.command,
                    })
                }
                Err(ExecutionError::Cancelled) => {
                    println!("Command execution cancelled.");
                    return Ok(FlowOutcome::Cancelled);
                }
                Err(e) => {
                    println!("Error executing cached command: {}", e);
                    cache.evict(hit.identifier);
                }
            }
        }
    }

    let max_attempts = options.max_attempts.max(1);
    let mut messages = vec![
        Message::system(options.system_prompt.as_str()),
        Message::user(instruction),
    ];

    for attempt in 1..=max_attempts {
        debug!(attempt, provider = provider.name(), "Requesting command");
        let reply = provider
            .complete(&messages)
            .await
            .map_err(|source| FlowError::Provider {
                provider: provider.name().to_string(),
                source,
            })?;

        let command = extract_command(&reply).ok_or_else(|| FlowError::NoCommand(reply.clone()))?;
        println!("Generated command: {}", command);

        match runner.run(&command).await {
            Ok(_) => {
                if let Some(cache) = cache.as_deref_mut() {
                    remember(cache, instruction, &command, embedding.as_ref()).await;
                }
                return Ok(FlowOutcome::Generated {
                    command,
                    attempts: attempt,
                });
            }
            Err(ExecutionError::Cancelled) => {
                println!("Command execution cancelled.");
                return Ok(FlowOutcome::Cancelled);
            }
            Err(e) => {
                let message = e.to_string();
                println!("Error executing command: {}", message);
                messages.push(Message::assistant(command));
                messages.push(Message::user(truncate_chars(&message, MAX_ERROR_CHARS)));
            }
        }
    }

    Err(FlowError::AttemptsExhausted(max_attempts))
}

/// Cache a command that worked. Failures are logged only.
async fn remember<E: EmbeddingProvider>(
    cache: &mut SemanticCache<E>,
    instruction: &str,
    command: &str,
    embedding: Option<&Embedding>,
) {
    let result = match embedding {
        Some(embedding) => cache.insert_with_embedding(instruction, command, embedding),
        None => cache.insert(instruction, command).await,
    };
    match result {
        Ok(identifier) => info!(identifier, "Cached successful command"),
        Err(e) => warn!(error = %e, "Failed to cache command"),
    }
}
