//! Effect renderers: one effect, a merged run of effects, or a sequential
//! chain where each step reads the previous step's file.

use std::path::{Path, PathBuf};

use super::RenderContext;
use crate::drawable::Drawable;
use crate::error::RenderResult;
use crate::staging;

/// Apply one effect, honouring its declared argument order.
pub fn apply_single_effect(
    ctx: &RenderContext<'_>,
    image: &Path,
    effect: &dyn Drawable,
    dest: &Path,
) -> RenderResult<PathBuf> {
    let mut args = effect
        .render_order()
        .resolve(Some(image), &effect.arguments());
    args.push(dest.display().to_string());
    ctx.invoke(effect.name(), effect.tool(), args)?;
    Ok(dest.to_path_buf())
}

/// Apply `effects` one invocation at a time, in order.
///
/// An empty list returns `dest` untouched. A failing step stops the chain.
pub fn apply_multiple_effects(
    ctx: &RenderContext<'_>,
    image: &Path,
    effects: &[&dyn Drawable],
    dest: &Path,
) -> RenderResult<PathBuf> {
    let Some((last, steps)) = effects.split_last() else {
        return Ok(dest.to_path_buf());
    };

    let dir = dest
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(ctx.output_dir.as_path());
    let format = staging::format_of(dest, &ctx.format);
    let mut input = image.to_path_buf();
    for step in steps {
        let target = staging::fresh_file(dir, format);
        ctx.stage(&target);
        input = apply_single_effect(ctx, &input, *step, &target)?;
    }
    apply_single_effect(ctx, &input, *last, dest)
}

/// One invocation for a consolidated run of effects.
///
/// The source goes where the first member puts it; every member's
/// arguments follow in order.
pub fn apply_merged(
    ctx: &RenderContext<'_>,
    image: &Path,
    effects: &[&dyn Drawable],
    dest: &Path,
) -> RenderResult<PathBuf> {
    let Some(first) = effects.first() else {
        return Ok(dest.to_path_buf());
    };

    let merged: Vec<String> = effects.iter().flat_map(|e| e.arguments()).collect();
    let mut args = first.render_order().resolve(Some(image), &merged);
    args.push(dest.display().to_string());

    let label = effects
        .iter()
        .map(|e| e.name())
        .collect::<Vec<_>>()
        .join("+");
    ctx.invoke(&label, first.tool(), args)?;
    Ok(dest.to_path_buf())
}
