//! Example: the study guide flow against fixed mock embeddings and an in-process store
//! Run with: cargo run --bin volatile_study_guides

use semantic_memory::kernel::Kernel;
use semantic_memory::llms::MockChatModel;
use semantic_memory::memorystores::VolatileMemoryStore;
use semantic_memory::study_guides::{offline_embeddings, populate_memory, query_memory, QUERY};
use semantic_memory::Result;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let mut kernel = Kernel::new();
    kernel
        .add_chat_service("chat_completion", MockChatModel::new())?
        .add_text_embedding_generation_service("mock", offline_embeddings())?
        .register_memory_store(VolatileMemoryStore::new())?;

    let memory = kernel.memory()?;
    let mut stdout = std::io::stdout();

    populate_memory(memory, &mut stdout).await?;
    query_memory(memory, QUERY, &mut stdout).await?;

    Ok(())
}
