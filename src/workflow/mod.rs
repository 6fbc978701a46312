pub mod job;
pub mod quiz_flow;

pub use job::Job;
pub use quiz_flow::{ChainReport, ChainStop, QuizFlow, QuizResult};
