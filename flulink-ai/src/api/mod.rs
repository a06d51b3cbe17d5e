//! HTTP API handlers for flulink-ai

pub mod analysis;
pub mod health;
pub mod inference;
pub mod models;
pub mod vectors;

pub use analysis::analysis_routes;
pub use health::health_routes;
pub use inference::inference_routes;
pub use models::model_routes;
pub use vectors::vector_routes;
