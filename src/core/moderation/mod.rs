// Core moderation module - the content moderation pipeline.
// Metadata and preparation, severity classification, routing, orchestration.

pub mod content_analysis;
pub mod moderation_models;
pub mod moderation_service;
pub mod router;
pub mod severity_classifier;

#[allow(unused_imports)]
pub use content_analysis::*;
pub use moderation_models::*;
pub use moderation_service::*;
#[allow(unused_imports)]
pub use router::*;
pub use severity_classifier::*;
