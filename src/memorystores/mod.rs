pub mod azure_search;
mod similarity;
pub mod volatile;

pub use azure_search::AzureSearchMemoryStore;
pub use similarity::{cosine_similarity, distance_to_similarity, dot_product, euclidean_distance};
pub use volatile::{SimilarityMetric, VolatileMemoryStore};
