pub mod page;
pub mod prompt;
pub mod quiz;

pub use page::RenderedPage;
pub use prompt::Prompt;
pub use quiz::{Answer, QuizInstructions, SubmitOutcome, SubmitPayload};
