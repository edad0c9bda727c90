//! opsclone - capture Azure IoT Operations instances as redeployable ARM
//! templates.
//!
//! The tool walks the live resource tree of one IoT Operations instance
//! (cluster extensions, custom location, instance, broker wiring, dataflows,
//! assets, secret-sync objects) and compiles a point-in-time snapshot into a
//! parameterized ARM deployment template. Captured names, ids, and
//! cross-references are rewritten into template expressions over a small set
//! of input parameters, so the output can recreate an equivalent instance on
//! a different cluster under different names.
//!
//! # Architecture
//!
//! The pipeline is a sequence of analysis phases over an immutable snapshot:
//!
//! 1. [`cloud`] queries the ARM control plane through the narrow
//!    [`cloud::CloudOps`] boundary (mockable for tests).
//! 2. [`backup::BackupManager`] runs the phases in a fixed order, wrapping
//!    each captured record in a [`backup::ResourceContainer`] or batching
//!    collections into chunked [`backup::DeploymentContainer`]s with
//!    dependency edges between them.
//! 3. [`backup::TemplateGen`] flattens the accumulated container map,
//!    parameters, variables, and metadata into one template document and
//!    writes it atomically.
//!
//! # Modules
//!
//! - [`arm`] - resource id parsing and template expression builders
//! - [`backup`] - containers, orchestration, and template assembly
//! - [`cli`] - command-line interface
//! - [`cloud`] - the Azure-facing collaborator boundary
//! - [`constants`] - API versions, extension types, policy constants
//! - [`core`] - error types and user-facing error reporting
//! - [`utils`] - atomic writes, spinners, naming helpers

pub mod arm;
pub mod backup;
pub mod cli;
pub mod cloud;
pub mod constants;
pub mod core;
pub mod utils;

pub use crate::core::{OpsCloneError, Result};
