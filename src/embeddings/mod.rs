pub mod azure;
pub mod mock;

pub use azure::AzureTextEmbedding;
pub use mock::MockEmbeddings;
