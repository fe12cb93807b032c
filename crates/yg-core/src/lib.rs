//! ytguard Core Library
//!
//! This crate provides the engine behind the ytguard content script: a DOM ad
//! suppressor and a segment skip controller for the watch page of a single
//! video platform.
//!
//! # Architecture
//!
//! The engine is sans-I/O. Page access goes through the [`dom::DomTree`] and
//! [`player::Player`] traits, persistence through [`store::KeyValueStore`],
//! user-facing output through [`notify::Notifier`], and time through
//! [`scheduler::Clock`]. Network fetches are split into a ticket handed to
//! the caller and a completion fed back in, so the host decides how I/O runs.
//!
//! # Modules
//!
//! - `types`: Shared type definitions
//! - `url`: URL helpers (host, media item id, channel id)
//! - `filter`: Filter rule mini-language and request blocking decision
//! - `dom`: Selector engine, DOM abstraction and an in-memory tree
//! - `selectors`: Categorized ad selectors and page landmarks
//! - `player`: Media element abstraction
//! - `scheduler`: Clock, throttle, interval gate and timer queue
//! - `store`: Key/value persistence seam
//! - `notify`: Notification and badge sink seam
//! - `context`: Per-operation engine context and persisted counters
//! - `suppressor`: DOM ad suppressor
//! - `segments`: Segment skip controller
//! - `api`: Remote segment service wire format
//! - `config`: Engine configuration

pub mod api;
pub mod config;
pub mod context;
pub mod dom;
pub mod filter;
pub mod notify;
pub mod player;
pub mod scheduler;
pub mod segments;
pub mod selectors;
pub mod store;
pub mod suppressor;
pub mod types;
pub mod url;

// Re-export commonly used types
pub use config::EngineConfig;
pub use context::{Context, Counter};
pub use dom::{Document, DomTree, NodeId, Selector};
pub use filter::{FilterRule, FilterSet, ListName};
pub use segments::{FetchTicket, LoadOutcome, SkipController};
pub use selectors::SelectorSet;
pub use suppressor::{RequestBlocked, Suppressor};
pub use types::{BlockCategory, Segment, SegmentCategory, SelectorCategory, Severity};
