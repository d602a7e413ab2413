//! # dg-config
//!
//! Loads a devgate project's policy configuration from disk.
//!
//! A project keeps its configuration under `.devgate/`:
//!
//! ```text
//! devgate.toml              optional settings (see [`DevgateSettings`])
//! .devgate/components.yaml  component kinds
//! .devgate/structure.yaml   directory policies
//! .devgate/operations.yaml  operation policies
//! .devgate/phases.yaml      workflow phase vocabulary
//! ```
//!
//! [`Project::open`] reads the settings and lays out the paths;
//! [`Project::load_snapshot`] parses the YAML files and hands them to
//! `dg-policy` for validation.

pub mod error;
pub mod layout;
pub mod loader;
pub mod phases;
pub mod settings;

pub use error::LoaderError;
pub use layout::ConfigLayout;
pub use loader::{load_snapshot, load_sources, Project};
pub use phases::{PhaseEntry, PhaseFile};
pub use settings::{AuditSettings, DevgateSettings, StructureSettings, SETTINGS_FILE};
