//! Render Pipeline - Single Entry Point
//!
//! Validates a layer, stages it, runs the groups in order and leaves one
//! artifact at the caller's destination. Intermediates are cleaned up
//! afterwards unless the config asks to keep them.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::config::RenderConfig;
use crate::consolidate::{group_consolidatables, GroupSummary};
use crate::drawable::{DrawableKind, Foundation, Layer};
use crate::error::{RenderError, RenderResult};
use crate::hashing::compute_plan_fingerprint;
use crate::render::{render_layer_to, RenderContext, RenderOutput};
use crate::runner::{CommandRunner, SystemRunner};
use crate::special::{ChainItem, ImageStackConfig, RawCommandConfig, Special};
use crate::staging;
use crate::validation::{ValidationErrors, Violation};
use crate::ENGINE_VERSION;

/// What a layer will run, without running it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderPlan {
    pub foundation: String,
    pub kind: DrawableKind,
    pub detail: FoundationSummary,
    /// Groups after the foundation; a canvas foundation is the first group.
    pub groups: Vec<GroupSummary>,
    pub fingerprint: String,
}

/// Everything about a layer that decides its output. Staged paths are
/// random per run and never appear here.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerSummary {
    pub foundation: FoundationSummary,
    pub groups: Vec<GroupSummary>,
}

impl LayerSummary {
    pub fn of(layer: &Layer) -> Self {
        let include_foundation = matches!(layer.foundation, Foundation::Canvas(_));
        let drawables = layer.drawables(include_foundation);
        Self {
            foundation: FoundationSummary::of(&layer.foundation),
            groups: group_consolidatables(&drawables)
                .iter()
                .map(|g| g.summary())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FoundationSummary {
    #[serde(rename_all = "camelCase")]
    Canvas {
        name: String,
        arguments: Vec<String>,
        source: Option<PathBuf>,
    },
    Chain {
        output: PathBuf,
        steps: Vec<ChainStepSummary>,
    },
    Command(RawCommandConfig),
    Procedure {
        name: String,
    },
    #[serde(rename_all = "camelCase")]
    Sequence {
        name: String,
        arguments: Vec<String>,
        source: Option<PathBuf>,
        first_index: u32,
    },
    Stack(ImageStackConfig),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ChainStepSummary {
    Command(String),
    Render(Box<LayerSummary>),
}

impl FoundationSummary {
    pub fn of(foundation: &Foundation) -> Self {
        let special = match foundation {
            Foundation::Canvas(canvas) => {
                return FoundationSummary::Canvas {
                    name: canvas.name().to_string(),
                    arguments: canvas.arguments(),
                    source: canvas.source().map(PathBuf::from),
                };
            }
            Foundation::Special(special) => special,
        };

        match special {
            Special::Chain(chain) => FoundationSummary::Chain {
                output: chain.output.clone(),
                steps: chain
                    .items
                    .iter()
                    .map(|item| match item {
                        ChainItem::Command(line) => ChainStepSummary::Command(line.clone()),
                        ChainItem::Render(layer) => {
                            ChainStepSummary::Render(Box::new(LayerSummary::of(layer)))
                        }
                    })
                    .collect(),
            },
            Special::Command(command) => FoundationSummary::Command(command.config.clone()),
            Special::Procedure(procedure) => FoundationSummary::Procedure {
                name: procedure.name.clone(),
            },
            Special::Sequence(sequence) => FoundationSummary::Sequence {
                name: sequence.drawable.name().to_string(),
                arguments: sequence.drawable.arguments(),
                source: sequence.drawable.source().map(PathBuf::from),
                first_index: sequence.first_index,
            },
            Special::Stack(stack) => FoundationSummary::Stack(stack.config.clone()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderReport {
    pub output: RenderOutput,
    pub fingerprint: String,
    pub groups: usize,
    pub engine_version: String,
    pub rendered_at: DateTime<Utc>,
}

pub struct RenderPipeline<R: CommandRunner = SystemRunner> {
    config: RenderConfig,
    runner: R,
}

impl RenderPipeline<SystemRunner> {
    /// Pipeline spawning real processes with the configured timeout.
    pub fn from_config(config: RenderConfig) -> Self {
        let runner = SystemRunner::new(config.timeout());
        Self::new(config, runner)
    }
}

impl<R: CommandRunner> RenderPipeline<R> {
    pub fn new(config: RenderConfig, runner: R) -> Self {
        Self { config, runner }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Consolidate and fingerprint a layer. Spawns nothing.
    pub fn plan_layer(&self, layer: &Layer) -> RenderResult<RenderPlan> {
        validate_layer(layer)?;

        let summary = LayerSummary::of(layer);
        let fingerprint =
            compute_plan_fingerprint(&summary, &self.config.format, ENGINE_VERSION)?;

        let foundation = layer.foundation.as_drawable();
        Ok(RenderPlan {
            foundation: foundation.name().to_string(),
            kind: foundation.kind(),
            detail: summary.foundation,
            groups: summary.groups,
            fingerprint,
        })
    }

    /// Render `layer` and leave the result at `dest`.
    ///
    /// The first failing group aborts the rest.
    #[instrument(skip(self, layer), fields(foundation = layer.foundation.as_drawable().name()))]
    pub fn render_layer(&self, layer: &Layer, dest: &Path) -> RenderResult<RenderOutput> {
        validate_layer(layer)?;
        staging::ensure_dir(&self.config.output_dir)?;

        let ctx = RenderContext::new(&self.runner, &self.config);
        let result = render_layer_to(&ctx, layer, dest);
        self.release_intermediates(&ctx, dest);

        let output = result?;
        info!(output = ?output.path(), "layer rendered");
        Ok(output)
    }

    /// Render and describe the run.
    pub fn render_with_report(&self, layer: &Layer, dest: &Path) -> RenderResult<RenderReport> {
        let plan = self.plan_layer(layer)?;
        let output = self.render_layer(layer, dest)?;
        Ok(RenderReport {
            output,
            fingerprint: plan.fingerprint,
            groups: plan.groups.len(),
            engine_version: ENGINE_VERSION.to_string(),
            rendered_at: Utc::now(),
        })
    }

    fn release_intermediates(&self, ctx: &RenderContext<'_>, dest: &Path) {
        if self.config.keep_intermediates {
            return;
        }
        for path in ctx.scratch().iter().rev() {
            if path == dest || !path.exists() {
                continue;
            }
            let removed = if path.is_dir() {
                fs::remove_dir_all(path)
            } else {
                fs::remove_file(path)
            };
            if let Err(e) = removed {
                warn!(path = %path.display(), error = %e, "failed to remove intermediate");
            }
        }
    }
}

/// Checks that need no process: effects must have an image to work on and
/// special operations only appear as foundations.
pub fn validate_layer(layer: &Layer) -> RenderResult<()> {
    let mut violations = vec![];

    if let Foundation::Special(Special::Procedure(procedure)) = &layer.foundation {
        if !layer.applied_effects.is_empty() {
            violations.push(Violation::new(
                "appliedEffects",
                format!("procedure '{}' yields no image to apply effects to", procedure.name),
            ));
        }
    }

    for (index, effect) in layer.applied_effects.iter().enumerate() {
        if let DrawableKind::Special(_) = effect.kind() {
            violations.push(Violation::new(
                format!("appliedEffects[{}]", index),
                format!("{} can only be a layer foundation", effect.name()),
            ));
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(RenderError::Validation(ValidationErrors::from(violations)))
    }
}

impl Default for RenderPipeline<SystemRunner> {
    fn default() -> Self {
        Self::from_config(RenderConfig::default())
    }
}
