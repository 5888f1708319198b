pub mod artifact;
pub mod bundle;
pub mod config;
pub mod console;
pub mod environment;
pub mod error;
pub mod feature;
pub mod index;
pub mod operations;
pub mod plan;
pub mod provision;
pub mod resolve;
pub mod source;
pub mod store;
pub mod transport;
pub mod unit;
mod xml;

pub use artifact::{ArtifactKind, ArtifactRef, ArtifactRequest, VersionRequest};
pub use bundle::EclipseBundle;
pub use config::PaxConfig;
pub use environment::EclipseEnvironment;
pub use error::PaxError;
pub use feature::Feature;
pub use index::ArtifactIndex;
pub use plan::ProvisionPlan;
pub use provision::{Provisioning, ProvisioningSet, SingletonConflictResolution};
pub use unit::InstallableUnit;

pub type Result<T> = std::result::Result<T, PaxError>;
