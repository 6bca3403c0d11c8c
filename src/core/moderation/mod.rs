// Core moderation module - detectors, scoring, decisions and the pipeline.

pub mod decision;
pub mod detectors;
pub mod moderation_models;
pub mod moderation_service;
pub mod scorer;

pub use moderation_models::*;
pub use moderation_service::*;
