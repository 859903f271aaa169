pub mod azure_chat;
pub mod mock;

pub use azure_chat::AzureChatCompletion;
pub use mock::MockChatModel;
