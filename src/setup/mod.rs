//! First-run setup.
//!
//! Turns the setup form into a persisted [`RuntimeConfig`], exactly once.

pub mod builder;
pub mod pipeline;
pub mod provisioner;
pub mod runtime;

pub use builder::{build_config, SetupRequest};
pub use pipeline::ConfigService;
pub use provisioner::{artifact_file_name, ArtifactProvisioner, MirrorProvisioner, ProvisionError};
pub use runtime::{RuntimeConfig, RuntimeConfigFile};
