pub mod database;
pub mod llm;
