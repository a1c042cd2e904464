//! Reconcile - converge a host's installed packages onto a published stack
//!
//! For every package in a [`Manifest`], the engine compares the installed
//! version with the version pinned by the target stack. Packages that differ
//! (or every package, when forced) are downloaded, removed as one batch and
//! reinstalled from the staged artifacts as a second batch.
//!
//! The engine talks to the world through four traits:
//!
//! - [`VersionSource`]: local and stack versions
//! - [`ArtifactFetcher`]: artifact names and downloads
//! - [`PackageManager`]: batched remove and install
//! - [`CompletionCallback`]: optional webhook once the host is done
//!
//! # Example
//!
//! ```ignore
//! use reconcile::{Engine, Manifest, ReconcileOptions, Target};
//!
//! let manifest = Manifest::load(path)?;
//! let target = Target::new("buildhost").with_stack("1.4.2");
//! let plan = Engine::new(&versions, &fetcher, &manager)
//!     .reconcile(&manifest, &target, &ReconcileOptions::default())?;
//! println!("updated {} packages", plan.len());
//! ```

pub mod context;
pub mod engine;
pub mod error;
pub mod executor;
pub mod manifest;
pub mod planner;
pub mod types;

pub use context::{ArtifactFetcher, CompletionCallback, NoCallback, PackageManager, VersionSource};
pub use engine::Engine;
pub use error::{Batch, Error, Result};
pub use manifest::Manifest;
pub use types::{PlannedUpdate, ReconcileOptions, StagedArtifact, Target, UpdatePlan};
