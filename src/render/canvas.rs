use std::path::{Path, PathBuf};

use tracing::debug;

use super::RenderContext;
use crate::drawable::Drawable;
use crate::error::RenderResult;
use crate::staging;

/// Render a canvas to `dest`.
///
/// A canvas whose order is a bare `[source]` is copied without spawning
/// anything.
pub fn render(
    ctx: &RenderContext<'_>,
    canvas: &dyn Drawable,
    dest: &Path,
) -> RenderResult<PathBuf> {
    let order = canvas.render_order();
    if let (true, Some(source)) = (order.is_pass_through(), canvas.source()) {
        debug!(source = %source.display(), "pass-through canvas, copying");
        staging::copy_file(source, dest)?;
        return Ok(dest.to_path_buf());
    }

    let mut args = order.resolve(canvas.source(), &canvas.arguments());
    args.push(dest.display().to_string());
    ctx.invoke(canvas.name(), canvas.tool(), args)?;
    Ok(dest.to_path_buf())
}
