//! Claim review service: evidence retrieval, the Assess → Plan → Act
//! pipeline and the request boundary guard.

mod error;
pub use error::ServiceError;

pub mod gateway;
pub mod guard;
pub mod pipeline;
pub mod retriever;
pub mod settings;
pub mod telemetry;

pub use gateway::{ActRequest, Gateway, PlanRequest, Route};
pub use guard::{PayloadCap, RateLimiter, redact};
pub use pipeline::Pipeline;
pub use retriever::Retriever;
pub use settings::{IndexBackend, Settings};
pub use telemetry::{RedactingMakeWriter, init_logging};

#[cfg(test)]
mod test_support;
