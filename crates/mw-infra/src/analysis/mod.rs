mod openai;

pub use openai::{OpenAiAnalyzerConfig, OpenAiImageAnalyzer};
