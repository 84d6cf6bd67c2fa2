//! Local persistence for pipeline artifacts, templates and run leases.
//!
//! Artifacts are per-stage JSON documents keyed by source video id. The
//! template set is a single shared document replaced atomically. A
//! per-video advisory lease guards against two runs working on the same
//! video id.

pub mod artifact;
pub mod error;
pub mod lease;
pub mod template_store;

pub use artifact::ArtifactStore;
pub use error::{StoreError, StoreResult};
pub use lease::LeaseGuard;
pub use template_store::TemplateStore;
