//! Drawable Model - Capability Set, Not Hierarchy
//!
//! Every operation exposes the same small surface: its tokens, the tool it
//! needs and whether it may stand alone or merge with a neighbour. The
//! staging core only ever looks at that surface.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{RenderError, RenderResult};
use crate::special::Special;

/// External tool family a drawable is rendered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    Convert,
    Compare,
    Composite,
}

impl Tool {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tool::Convert => "convert",
            Tool::Compare => "compare",
            Tool::Composite => "composite",
        }
    }

    /// Tools that print a numeric metric on stderr as normal output.
    pub fn reports_metric(&self) -> bool {
        matches!(self, Tool::Compare)
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectKind {
    Fx,
    Mod,
    Transform,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpecialKind {
    Chain,
    Command,
    Procedure,
    Sequence,
    Stack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "subtype")]
pub enum DrawableKind {
    Canvas,
    Effect(EffectKind),
    Primitive,
    Special(SpecialKind),
}

/// Slot in a tool's argv.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderToken {
    Source,
    Args,
}

/// Where the input image goes relative to a drawable's own tokens.
///
/// Some verbs want flags before the source path, others after.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderOrder(pub Vec<OrderToken>);

impl RenderOrder {
    pub fn source_then_args() -> Self {
        Self(vec![OrderToken::Source, OrderToken::Args])
    }

    pub fn args_then_source() -> Self {
        Self(vec![OrderToken::Args, OrderToken::Source])
    }

    pub fn args_only() -> Self {
        Self(vec![OrderToken::Args])
    }

    pub fn source_only() -> Self {
        Self(vec![OrderToken::Source])
    }

    /// A bare `[source]` order means the drawable does no work on its input.
    pub fn is_pass_through(&self) -> bool {
        self.0 == [OrderToken::Source]
    }

    /// Expand the order into argv tokens.
    pub fn resolve(&self, source: Option<&Path>, args: &[String]) -> Vec<String> {
        let mut tokens = Vec::with_capacity(args.len() + 1);
        for slot in &self.0 {
            match slot {
                OrderToken::Source => {
                    if let Some(path) = source {
                        tokens.push(path.display().to_string());
                    }
                }
                OrderToken::Args => tokens.extend(args.iter().cloned()),
            }
        }
        tokens
    }
}

/// Capability set every renderable operation implements.
pub trait Drawable: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    fn kind(&self) -> DrawableKind;

    fn tool(&self) -> Tool;

    /// Ordered argv tokens, excluding input and output paths.
    fn arguments(&self) -> Vec<String>;

    /// True when the drawable produces a full image without an input.
    fn is_layer(&self) -> bool;

    /// True when the drawable may share an invocation with its neighbours.
    fn is_consolidatable(&self) -> bool;

    fn render_order(&self) -> RenderOrder {
        RenderOrder::source_then_args()
    }

    /// Existing image a canvas starts from, if any.
    fn source(&self) -> Option<&Path> {
        None
    }

    /// Number of input images, counting the pipeline input.
    fn source_count(&self) -> usize {
        1
    }

    /// Replace the secondary inputs of a multi-source drawable.
    fn rebind_sources(&mut self, sources: Vec<PathBuf>) -> RenderResult<()> {
        if sources.is_empty() {
            return Ok(());
        }
        Err(RenderError::Dispatch(format!(
            "{} takes no secondary sources, got {}",
            self.name(),
            sources.len()
        )))
    }
}

/// Base drawable of a layer.
#[derive(Debug)]
pub enum Foundation {
    Canvas(Box<dyn Drawable>),
    Special(Special),
}

impl Foundation {
    pub fn as_drawable(&self) -> &dyn Drawable {
        match self {
            Foundation::Canvas(canvas) => canvas.as_ref(),
            Foundation::Special(special) => special,
        }
    }
}

/// A foundation plus the effects applied on top of it, in order.
#[derive(Debug)]
pub struct Layer {
    pub foundation: Foundation,
    pub applied_effects: Vec<Box<dyn Drawable>>,
}

impl Layer {
    pub fn new(foundation: Foundation) -> Self {
        Self {
            foundation,
            applied_effects: vec![],
        }
    }

    pub fn canvas(canvas: impl Drawable + 'static) -> Self {
        Self::new(Foundation::Canvas(Box::new(canvas)))
    }

    pub fn special(special: Special) -> Self {
        Self::new(Foundation::Special(special))
    }

    pub fn with(mut self, effect: impl Drawable + 'static) -> Self {
        self.applied_effects.push(Box::new(effect));
        self
    }

    pub fn push(&mut self, effect: Box<dyn Drawable>) {
        self.applied_effects.push(effect);
    }

    /// Drawables in render order, optionally led by the foundation.
    pub fn drawables(&self, include_foundation: bool) -> Vec<&dyn Drawable> {
        let mut list: Vec<&dyn Drawable> = Vec::with_capacity(self.applied_effects.len() + 1);
        if include_foundation {
            list.push(self.foundation.as_drawable());
        }
        list.extend(self.applied_effects.iter().map(|d| d.as_ref()));
        list
    }
}
