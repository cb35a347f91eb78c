//! 调研层：prompt、交互会话、大纲生成、逐节编排、结果文件与顶层流程

pub mod generate;
pub mod orchestrator;
pub mod output;
pub mod pipeline;
pub mod prompts;
pub mod session;

pub use generate::generate_outline;
pub use orchestrator::{ResearchOrchestrator, RunSummary};
pub use output::{output_path, sanitize_topic, topic_from_line, RecordBody, ResearchWriter, SectionRecord};
pub use pipeline::{run_research, RunOutcome, RunReport};
pub use session::InteractionSession;
