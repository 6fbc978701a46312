pub mod answer;
pub mod attempt_log;
pub mod llm_service;
pub mod page_loader;
pub mod prompts;
pub mod submitter;

pub use answer::parse_answer;
pub use attempt_log::{AttemptLog, AttemptRecord, AttemptStats};
pub use llm_service::{ChatModel, LlmService};
pub use page_loader::{BrowserPageLoader, PageLoader};
pub use submitter::Submitter;
