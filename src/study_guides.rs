//! Azure certification study guides: populate a memory collection with them
//! and query it.

use std::io::Write;

use crate::embeddings::MockEmbeddings;
use crate::memory::SemanticTextMemory;
use crate::schema::MemoryQueryResult;
use crate::Result;

pub const COLLECTION: &str = "SKCertifications";
pub const SOURCE_NAME: &str = "Microsoft Learn";
pub const QUERY: &str = "I'm stufying for the AZ-104 certification.";
pub const SEARCH_LIMIT: usize = 5;
pub const MIN_RELEVANCE_SCORE: f32 = 0.77;

/// Study guide URLs and their titles
pub const STUDY_GUIDES: [(&str, &str); 3] = [
    (
        "https://learn.microsoft.com/en-us/credentials/certifications/resources/study-guides/az-104",
        "Study guide for Exam AZ-104: Microsoft Azure Administrator",
    ),
    (
        "https://learn.microsoft.com/en-us/credentials/certifications/resources/study-guides/az-204",
        "Study guide for Exam AZ-204: Developing Solutions for Microsoft Azure",
    ),
    (
        "https://learn.microsoft.com/en-us/credentials/certifications/resources/study-guides/az-900",
        "Study guide for Exam AZ-900: Microsoft Azure Fundamentals",
    ),
];

/// Fixed embeddings for running the flow without an embedding service.
///
/// The AZ-104 guide sits next to [`QUERY`], AZ-900 clears
/// [`MIN_RELEVANCE_SCORE`] behind it and AZ-204 falls below it.
pub fn offline_embeddings() -> MockEmbeddings {
    MockEmbeddings::new(3)
        .with_embedding(STUDY_GUIDES[0].1, vec![0.95, 0.31, 0.0])
        .with_embedding(STUDY_GUIDES[1].1, vec![0.6, 0.0, 0.8])
        .with_embedding(STUDY_GUIDES[2].1, vec![0.8, 0.6, 0.0])
        .with_embedding(QUERY, vec![1.0, 0.2, 0.0])
}

/// Save every study guide as a reference in [`COLLECTION`], reporting progress to `out`
pub async fn populate_memory(memory: &SemanticTextMemory, out: &mut impl Write) -> Result<()> {
    writeln!(
        out,
        "Adding some Azure Study guide URLs and their descriptions to a volatile Semantic Memory."
    )?;

    for (i, (url, title)) in STUDY_GUIDES.iter().enumerate() {
        memory
            .save_reference(COLLECTION, title, url, SOURCE_NAME, title)
            .await?;
        writeln!(out, "  URL {} saved", i + 1)?;
    }
    Ok(())
}

/// Search [`COLLECTION`] for `ask` and write the ranked results to `out`
pub async fn query_memory(
    memory: &SemanticTextMemory,
    ask: &str,
    out: &mut impl Write,
) -> Result<Vec<MemoryQueryResult>> {
    writeln!(out, "===========================\nQuery: {}\n", ask)?;

    let memories = memory
        .search(COLLECTION, ask, SEARCH_LIMIT, MIN_RELEVANCE_SCORE)
        .await?;
    if memories.is_empty() {
        tracing::info!(query = ask, "no memories above the relevance threshold");
    }

    for (i, result) in memories.iter().enumerate() {
        write_result(out, i + 1, result)?;
    }
    Ok(memories)
}

fn write_result(out: &mut impl Write, position: usize, result: &MemoryQueryResult) -> Result<()> {
    writeln!(out, "Result {}:", position)?;
    writeln!(out, "  URL:     : {}", result.id)?;
    writeln!(out, "  Title    : {}", result.description)?;
    writeln!(out, "  Relevance: {}", result.relevance)?;
    writeln!(out)?;
    Ok(())
}
