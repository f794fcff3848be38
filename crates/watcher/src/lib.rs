//! Edit watching for fmstamp
//!
//! This crate provides:
//! - Per-document debouncing on tokio timers
//! - The write marker that recognises the echo of the engine's own writes
//! - Filesystem and typing-signal event sources
//! - The engine that drives the core updater from those signals

pub mod debounce;
pub mod engine;
pub mod marker;
pub mod source;

pub use debounce::DebounceScheduler;
pub use engine::Engine;
pub use marker::{MarkerState, WriteMarker, DEFAULT_ECHO_WINDOW};
pub use source::{FsEventSource, SourceKind};
