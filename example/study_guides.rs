//! Example: store Azure study guides in Azure AI Search and query them
//! Run with: cargo run --bin study_guides
//!
//! Reads AZURE_OPENAI_* and AZURE_AISEARCH_* settings from the environment
//! or a `.env` file.

use semantic_memory::config::Settings;
use semantic_memory::embeddings::AzureTextEmbedding;
use semantic_memory::kernel::Kernel;
use semantic_memory::llms::AzureChatCompletion;
use semantic_memory::memorystores::AzureSearchMemoryStore;
use semantic_memory::study_guides::{populate_memory, query_memory, QUERY};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let settings = Settings::from_env()?;

    let mut kernel = Kernel::new();
    kernel
        .add_chat_service(
            "chat_completion",
            AzureChatCompletion::from_settings(&settings.openai),
        )?
        .add_text_embedding_generation_service(
            "ada",
            AzureTextEmbedding::from_settings(&settings.openai),
        )?
        .register_memory_store(AzureSearchMemoryStore::from_settings(&settings.search))?;

    let memory = kernel.memory()?;
    let mut stdout = std::io::stdout();

    populate_memory(memory, &mut stdout).await?;
    query_memory(memory, QUERY, &mut stdout).await?;

    Ok(())
}
