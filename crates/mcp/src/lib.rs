pub mod config;
pub mod correction;
pub mod http;
pub mod intent;
pub mod pipeline;
pub mod reasoning;
pub mod server;
pub mod tools;
pub mod transport;

pub use intent::{ResolvedIntent, OUT_OF_CONTEXT};
pub use pipeline::ChatPipeline;
pub use reasoning::{GeminiClient, ReasoningClient, ReasoningError};
pub use tools::{list_tools, MonkeyTools, ToolCall, ToolError};
