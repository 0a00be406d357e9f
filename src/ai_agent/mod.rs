pub mod agents;
pub mod data;
pub mod llm;
pub mod session;
pub mod tools;
pub mod utils;

#[cfg(test)]
pub mod testing;
