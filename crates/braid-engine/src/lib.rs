//! Background crunching and tree synchronization for braid simulations.
//!
//! This crate turns a [`Tree`](braid_tree::Tree) into a live simulation:
//!
//! - [`Cruncher`]: a thread stepping one lineage forward, pushing states
//!   onto its [`WorkQueue`] and polling an order channel.
//! - [`HistoryBrowser`]: the history a history-dependent step reads,
//!   spanning committed tree nodes and unmerged queue items.
//! - [`CrunchingManager`]: reconciles [`Job`]s with crunchers and merges
//!   their output into the tree on every [`sync`](CrunchingManager::sync).
//! - [`Project`]: the facade applications drive.
//!
//! # Locking
//!
//! The tree sits behind one [`parking_lot::RwLock`]. Merges and
//! synchronous simulation take the write lock per batch; browsers take
//! the read lock per call and then the queue lock. Crunchers never write
//! to the tree.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod browser;
pub mod config;
pub mod cruncher;
pub mod error;
pub mod job;
pub mod manager;
pub mod project;
pub mod queue;

use std::sync::Arc;

use parking_lot::RwLock;

use braid_tree::Tree;

/// The tree shared between the manager, browsers, and the application.
pub type SharedTree<S> = Arc<RwLock<Tree<S>>>;

pub use browser::HistoryBrowser;
pub use config::{CrunchingConfig, ProjectConfig};
pub use cruncher::{Cruncher, CruncherStatus};
pub use error::{ConfigError, ProjectError};
pub use job::Job;
pub use manager::CrunchingManager;
pub use project::Project;
pub use queue::{Order, WorkItem, WorkQueue};
