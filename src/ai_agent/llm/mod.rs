pub mod error;
pub mod gemini;
pub mod groq;
pub mod model_provider;
pub mod models;
pub mod sse;
