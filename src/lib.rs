pub mod config;
pub mod embeddings;
pub mod error;
pub mod kernel;
pub mod llms;
pub mod memory;
pub mod memorystores;
pub mod schema;
pub mod study_guides;
pub mod traits;
pub mod utils;

pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Re-exports for common types
pub mod prelude {
    pub use crate::config::Settings;
    pub use crate::error::Error;
    pub use crate::kernel::Kernel;
    pub use crate::memory::SemanticTextMemory;
    pub use crate::schema::*;
    pub use crate::traits::*;
    pub use crate::Result;
}
