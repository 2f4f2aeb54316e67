//! Special foundations. One exhaustive match picks the variant; the
//! layer's applied effects then run on top of its artifact.

use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use super::{render_layer_to, run_items, RenderContext, RenderOutput};
use crate::drawable::{Drawable, Foundation, Layer, Tool};
use crate::error::{RenderError, RenderResult};
use crate::runner::Invocation;
use crate::special::{
    shell_quote, Chain, ChainItem, ImageStack, RawCommand, Sequence, Special, INPUT_PLACEHOLDER,
    OUTPUT_PLACEHOLDER,
};
use crate::staging::{self, preprocess_drawables_for_rendering};

/// Render a layer whose foundation is a [`Special`].
#[instrument(skip_all, fields(special = layer.foundation.as_drawable().name()))]
pub fn render(ctx: &RenderContext<'_>, layer: &Layer) -> RenderResult<RenderOutput> {
    let Foundation::Special(special) = &layer.foundation else {
        return Err(RenderError::Dispatch(format!(
            "{} is not a special operation",
            layer.foundation.as_drawable().name()
        )));
    };

    let base = match special {
        Special::Chain(chain) => Some(render_chain(ctx, chain)?),
        Special::Command(command) => Some(render_command(ctx, command)?),
        Special::Procedure(procedure) => {
            (procedure.run)(ctx)?;
            None
        }
        Special::Sequence(sequence) => Some(render_sequence(ctx, sequence)?),
        Special::Stack(stack) => Some(render_stack(ctx, stack)?),
    };

    let Some(base) = base else {
        if !layer.applied_effects.is_empty() {
            return Err(RenderError::Dispatch(format!(
                "{} yields no image for its {} applied effect(s)",
                special.name(),
                layer.applied_effects.len()
            )));
        }
        return Ok(RenderOutput::Completed);
    };

    let items = preprocess_drawables_for_rendering(layer, &ctx.output_dir, &ctx.format, false);
    let last = run_items(ctx, &items, Some(&base))?;
    Ok(RenderOutput::Artifact(last.unwrap_or(base)))
}

fn render_chain(ctx: &RenderContext<'_>, chain: &Chain) -> RenderResult<PathBuf> {
    staging::ensure_dir(&chain.temp_dir)?;
    let format = chain.extension().unwrap_or(ctx.format.as_str());

    let mut previous: Option<PathBuf> = None;
    for (index, item) in chain.items.iter().enumerate() {
        let target = if index + 1 == chain.items.len() {
            chain.output.clone()
        } else {
            let path = staging::fresh_file(&chain.temp_dir, format);
            ctx.stage(&path);
            path
        };
        debug!(step = index, target = %target.display(), "chain step");

        match item {
            ChainItem::Command(line) => {
                let line = substitute(line, previous.as_deref(), &target)?;
                ctx.invoke_shell("chain", Tool::Convert, line)?;
            }
            ChainItem::Render(layer) => {
                if render_layer_to(ctx, layer, &target)? == RenderOutput::Completed {
                    return Err(RenderError::Dispatch(format!(
                        "chain step {} produced no image",
                        index
                    )));
                }
            }
        }
        previous = Some(target);
    }
    Ok(chain.output.clone())
}

fn substitute(line: &str, input: Option<&Path>, output: &Path) -> RenderResult<String> {
    let mut line = line.to_string();
    if line.contains(INPUT_PLACEHOLDER) {
        let input = input.ok_or_else(|| {
            RenderError::Dispatch(format!("chain command has no {{input}}: {}", line))
        })?;
        line = line.replace(INPUT_PLACEHOLDER, &shell_quote(&input.display().to_string()));
    }
    Ok(line.replace(
        OUTPUT_PLACEHOLDER,
        &shell_quote(&output.display().to_string()),
    ))
}

fn render_command(ctx: &RenderContext<'_>, command: &RawCommand) -> RenderResult<PathBuf> {
    let config = &command.config;
    let invocation = Invocation::argv(&config.program, config.args.clone());
    ctx.execute("command", Tool::Convert, &invocation)?;
    Ok(config.output.clone())
}

/// The tool names its own output, so render into a private directory and
/// move the produced file out.
fn render_sequence(ctx: &RenderContext<'_>, sequence: &Sequence) -> RenderResult<PathBuf> {
    let id = staging::random_id();
    let dir = staging::temp_dir_path(&ctx.output_dir, &id);
    staging::ensure_dir(&dir)?;
    ctx.stage(&dir);

    let (pattern, produced) = sequence.output_names(&dir, &id, &ctx.format);
    let drawable = sequence.drawable.as_ref();
    let mut args = drawable
        .render_order()
        .resolve(drawable.source(), &drawable.arguments());
    args.push(pattern.display().to_string());
    ctx.invoke(drawable.name(), drawable.tool(), args)?;

    let target = staging::temp_file_path(&ctx.output_dir, &id, &ctx.format);
    ctx.stage(&target);
    staging::move_file(&produced, &target)?;
    Ok(target)
}

/// Stacks need `\( ... \)` grouping, so they go through the shell.
fn render_stack(ctx: &RenderContext<'_>, stack: &ImageStack) -> RenderResult<PathBuf> {
    let dest = staging::fresh_file(&ctx.output_dir, &ctx.format);
    ctx.stage(&dest);
    let tool = stack.config.tool;
    let command = stack.command_line(ctx.program(tool), &dest);
    ctx.invoke_shell("stack", tool, command)?;
    Ok(dest)
}
