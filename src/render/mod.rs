//! Renderers - Execute Staged Groups
//!
//! Each renderer runs exactly one external invocation (or a file copy)
//! against paths the staging step already assigned.

pub mod canvas;
pub mod primitives;
pub mod special;
pub mod standard;

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::config::RenderConfig;
use crate::drawable::{DrawableKind, Foundation, Layer, Tool};
use crate::error::{RenderError, RenderResult};
use crate::runner::{classify, CommandRunner, Invocation, ToolOutput};
use crate::staging::{self, preprocess_drawables_for_rendering, PreprocessedItem};

/// Result of rendering a layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "path")]
pub enum RenderOutput {
    Artifact(PathBuf),
    /// A procedure ran; there is no single file.
    Completed,
}

impl RenderOutput {
    pub fn path(&self) -> Option<&Path> {
        match self {
            RenderOutput::Artifact(path) => Some(path),
            RenderOutput::Completed => None,
        }
    }
}

/// What every renderer needs: a runner, tool names and where to stage.
pub struct RenderContext<'r> {
    pub runner: &'r dyn CommandRunner,
    pub config: &'r RenderConfig,
    pub output_dir: PathBuf,
    pub format: String,
    scratch: RefCell<Vec<PathBuf>>,
}

impl<'r> RenderContext<'r> {
    pub fn new(runner: &'r dyn CommandRunner, config: &'r RenderConfig) -> Self {
        Self {
            runner,
            config,
            output_dir: config.output_dir.clone(),
            format: config.format.clone(),
            scratch: RefCell::new(Vec::new()),
        }
    }

    pub fn program(&self, tool: Tool) -> &str {
        self.config.tools.program(tool)
    }

    /// Run `tool` with `args` and classify the result for `label`.
    pub fn invoke(&self, label: &str, tool: Tool, args: Vec<String>) -> RenderResult<ToolOutput> {
        let invocation = Invocation::argv(self.program(tool), args);
        self.execute(label, tool, &invocation)
    }

    /// Run a full command line through the configured shell.
    pub fn invoke_shell(
        &self,
        label: &str,
        tool: Tool,
        command: impl Into<String>,
    ) -> RenderResult<ToolOutput> {
        let invocation = Invocation::shell(self.config.shell.as_str(), command);
        self.execute(label, tool, &invocation)
    }

    pub fn execute(
        &self,
        label: &str,
        tool: Tool,
        invocation: &Invocation,
    ) -> RenderResult<ToolOutput> {
        let output = self
            .runner
            .run(invocation)
            .map_err(|e| e.for_drawable(label))?;
        classify(tool, label, invocation, &output)?;
        Ok(output)
    }

    /// Record an intermediate path for the retention policy.
    pub fn stage(&self, path: impl Into<PathBuf>) {
        self.scratch.borrow_mut().push(path.into());
    }

    pub fn is_scratch(&self, path: &Path) -> bool {
        self.scratch.borrow().iter().any(|p| p == path)
    }

    /// Every path recorded with [`stage`](Self::stage), oldest first.
    pub fn scratch(&self) -> Vec<PathBuf> {
        self.scratch.borrow().clone()
    }
}

/// Render one preprocessed group, reading `input` when it needs a source.
pub fn render_group(
    ctx: &RenderContext<'_>,
    item: &PreprocessedItem<'_>,
    input: Option<&Path>,
) -> RenderResult<PathBuf> {
    let dest = item.temp_file_path.as_path();
    let members = item.group.members.as_slice();
    let label = item.group.label();
    debug!(group = %label, dest = %dest.display(), "rendering group");

    if members
        .iter()
        .any(|d| matches!(d.kind(), DrawableKind::Special(_)))
    {
        return Err(RenderError::Dispatch(format!(
            "{} is a special operation and can only be a layer foundation",
            label
        )));
    }

    match (members, input) {
        ([], _) => Err(RenderError::Dispatch("empty group".to_string())),
        ([only], _) if only.is_layer() => canvas::render(ctx, *only, dest),
        (_, None) => Err(RenderError::Dispatch(format!(
            "{} has no input image to work on",
            label
        ))),
        ([only], Some(input)) => standard::apply_single_effect(ctx, input, *only, dest),
        (many, Some(input)) if many.iter().all(|d| d.kind() == DrawableKind::Primitive) => {
            primitives::render(ctx, input, many, dest)
        }
        (many, Some(input)) => standard::apply_merged(ctx, input, many, dest),
    }
}

/// Run staged items in order. `seed` feeds the first item.
pub fn run_items(
    ctx: &RenderContext<'_>,
    items: &[PreprocessedItem<'_>],
    seed: Option<&Path>,
) -> RenderResult<Option<PathBuf>> {
    let mut last = None;
    for item in items {
        ctx.stage(&item.temp_dir_path);
        ctx.stage(&item.temp_file_path);
        let input = item.previous_output_path.as_deref().or(seed);
        last = Some(render_group(ctx, item, input)?);
    }
    Ok(last)
}

/// Render a whole layer and leave its artifact at `dest`.
pub fn render_layer_to(
    ctx: &RenderContext<'_>,
    layer: &Layer,
    dest: &Path,
) -> RenderResult<RenderOutput> {
    let output = match &layer.foundation {
        Foundation::Canvas(_) => {
            let items =
                preprocess_drawables_for_rendering(layer, &ctx.output_dir, &ctx.format, true);
            match run_items(ctx, &items, None)? {
                Some(path) => RenderOutput::Artifact(path),
                None => return Err(RenderError::Dispatch("layer produced no groups".into())),
            }
        }
        Foundation::Special(_) => special::render(ctx, layer)?,
    };

    match output {
        RenderOutput::Artifact(artifact) => {
            finalize(ctx, &artifact, dest)?;
            Ok(RenderOutput::Artifact(dest.to_path_buf()))
        }
        RenderOutput::Completed => Ok(RenderOutput::Completed),
    }
}

/// Put `artifact` at `dest`: staged files move, caller-owned files copy.
fn finalize(ctx: &RenderContext<'_>, artifact: &Path, dest: &Path) -> RenderResult<()> {
    if artifact == dest {
        return Ok(());
    }
    staging::ensure_parent(dest)?;
    if ctx.is_scratch(artifact) {
        staging::move_file(artifact, dest)
    } else {
        staging::copy_file(artifact, dest)
    }
}
