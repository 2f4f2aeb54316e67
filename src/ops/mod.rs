//! Concrete drawables.
//!
//! Each type is built from a plain config struct through a validating
//! constructor. The staging core never sees these types directly, only
//! their [`Drawable`](crate::drawable::Drawable) surface.

pub mod canvas;
pub mod effects;
pub mod primitives;

pub use canvas::{ColorCanvas, ColorCanvasConfig, ImageCanvas, ImageCanvasConfig};
pub use effects::{
    Blur, BlurConfig, Compare, CompareConfig, Compose, ComposeConfig, Crop, CropConfig, Metric,
    Modulate, ModulateConfig, Sepia, SepiaConfig, Tint, TintConfig,
};
pub use primitives::{
    Circle, CircleConfig, Line, LineConfig, Rectangle, RectangleConfig, Text, TextConfig,
};

/// Format a number the way the tools expect (`50`, not `50.0`).
pub(crate) fn num(value: f64) -> String {
    format!("{}", value)
}

pub(crate) fn point(p: [f64; 2]) -> String {
    format!("{},{}", num(p[0]), num(p[1]))
}
