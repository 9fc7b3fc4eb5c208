//! DCPR Core - Domain models, metadata schema, and configuration
//!
//! This crate contains the core domain types shared by every other crate of the
//! DCPR assistant: passages, filter expressions, conversation turns, the error
//! taxonomy, and the ingestion-side text processing.

pub mod config;
pub mod error;
pub mod models;
pub mod processing;
pub mod schema;

pub use error::{DcprError, FilterRejection, GenerationStage, Result};
pub use schema::{AttributeInfo, AttributeType, MetadataSchema};
