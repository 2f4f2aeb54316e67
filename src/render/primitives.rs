use std::path::{Path, PathBuf};

use super::RenderContext;
use crate::drawable::{Drawable, Tool};
use crate::error::RenderResult;

/// Stack every primitive onto a single invocation over `image`.
pub fn render(
    ctx: &RenderContext<'_>,
    image: &Path,
    primitives: &[&dyn Drawable],
    dest: &Path,
) -> RenderResult<PathBuf> {
    let tool = primitives.first().map_or(Tool::Convert, |p| p.tool());

    let mut args = vec![image.display().to_string()];
    args.extend(primitives.iter().flat_map(|p| p.arguments()));
    args.push(dest.display().to_string());

    let label = primitives
        .iter()
        .map(|p| p.name())
        .collect::<Vec<_>>()
        .join("+");
    ctx.invoke(&label, tool, args)?;
    Ok(dest.to_path_buf())
}
