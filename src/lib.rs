//! Inkstage Core - Declarative Image Layers, Minimal Process Spawns
//!
//! # Pipeline
//! 1. Consolidate: adjacent compatible drawables share one invocation
//! 2. Stage: every group gets its temp paths before anything runs
//! 3. Render: groups run strictly in order, each reading the last one's file
//! 4. Finalize: the last artifact lands at the caller's destination

pub mod config;
pub mod consolidate;
pub mod document;
pub mod drawable;
pub mod error;
pub mod hashing;
pub mod ops;
pub mod pipeline;
pub mod render;
pub mod runner;
pub mod special;
pub mod staging;
pub mod validation;

pub use config::{RenderConfig, ToolConfig};
pub use consolidate::{group_consolidatables, ConsolidatedGroup, GroupSummary};
pub use document::LayerDocument;
pub use drawable::{Drawable, DrawableKind, Foundation, Layer, RenderOrder, Tool};
pub use error::{RenderError, RenderResult};
pub use pipeline::{FoundationSummary, LayerSummary, RenderPipeline, RenderPlan, RenderReport};
pub use render::{RenderContext, RenderOutput};
pub use runner::{CommandRunner, Invocation, SystemRunner, ToolOutput};
pub use special::Special;
pub use staging::{preprocess_drawables_for_rendering, PreprocessedItem};
pub use validation::{ValidationErrors, Violation};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
