//! EchoLeaf: structured, audience-ready explanations of scientific studies.
//!
//! The pipeline lives in [`service::EchoLeaf`]; upstream access goes through
//! the [`clients::GenerationBackend`] trait and persistence through
//! [`storage::KeyValueStore`].

pub mod chat;
pub mod classifier;
pub mod clients;
pub mod config;
pub mod deserializers;
pub mod error;
pub mod error_map;
pub mod export;
pub mod input;
pub mod invoker;
pub mod library;
pub mod models;
pub mod normalizer;
pub mod options;
pub mod preferences;
pub mod prompts;
pub mod service;
pub mod storage;

pub use classifier::RequestKind;
pub use config::Config;
pub use error::{EchoLeafError, Result};
pub use models::{ChatMessage, FormData, GeneratedContent, ResearchData, SavedStudy};
pub use service::EchoLeaf;
