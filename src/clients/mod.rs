pub mod gemini;
pub mod traits;

pub use gemini::GeminiClient;
pub use traits::{
    GenerationBackend, GenerationRequest, GenerationResponse, Part, Turn, UpstreamError,
};
