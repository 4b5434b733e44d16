pub mod greeting;
pub mod openai;
pub mod pipeline;
pub mod prompt;
pub mod provider;
pub mod runtime;

pub use greeting::GreetingFilter;
pub use openai::OpenAiProvider;
pub use prompt::PromptTemplate;
pub use provider::{ChatRequest, ChatResponse, LlmProvider, Message, ProviderError};
pub use runtime::AgentRuntime;
