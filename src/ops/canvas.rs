use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::drawable::{Drawable, DrawableKind, RenderOrder, Tool};
use crate::validation::{Checks, ValidationErrors};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorCanvasConfig {
    pub width: u32,
    pub height: u32,
    pub color: String,
}

/// Solid color canvas (`-size WxH xc:color`).
#[derive(Debug, Clone)]
pub struct ColorCanvas {
    config: ColorCanvasConfig,
}

impl ColorCanvas {
    pub fn new(config: ColorCanvasConfig) -> Result<Self, ValidationErrors> {
        Checks::new()
            .require(config.width > 0, "width", "must be greater than 0")
            .require(config.height > 0, "height", "must be greater than 0")
            .non_empty("color", &config.color)
            .finish(Self { config })
    }
}

impl Drawable for ColorCanvas {
    fn name(&self) -> &str {
        "colorCanvas"
    }

    fn kind(&self) -> DrawableKind {
        DrawableKind::Canvas
    }

    fn tool(&self) -> Tool {
        Tool::Convert
    }

    fn arguments(&self) -> Vec<String> {
        vec![
            "-size".to_string(),
            format!("{}x{}", self.config.width, self.config.height),
            format!("xc:{}", self.config.color),
        ]
    }

    fn is_layer(&self) -> bool {
        true
    }

    fn is_consolidatable(&self) -> bool {
        false
    }

    fn render_order(&self) -> RenderOrder {
        RenderOrder::args_only()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageCanvasConfig {
    pub source: PathBuf,
    #[serde(default)]
    pub resize: Option<[u32; 2]>,
}

/// Canvas starting from an existing image file.
///
/// Without a resize it is a plain copy of `source`.
#[derive(Debug, Clone)]
pub struct ImageCanvas {
    config: ImageCanvasConfig,
}

impl ImageCanvas {
    pub fn new(config: ImageCanvasConfig) -> Result<Self, ValidationErrors> {
        let resize_ok = config.resize.map_or(true, |[w, h]| w > 0 && h > 0);
        Checks::new()
            .require(
                !config.source.as_os_str().is_empty(),
                "source",
                "must not be empty",
            )
            .require(resize_ok, "resize", "dimensions must be greater than 0")
            .finish(Self { config })
    }

    pub(crate) fn set_source(&mut self, source: PathBuf) {
        self.config.source = source;
    }
}

impl Drawable for ImageCanvas {
    fn name(&self) -> &str {
        "imageCanvas"
    }

    fn kind(&self) -> DrawableKind {
        DrawableKind::Canvas
    }

    fn tool(&self) -> Tool {
        Tool::Convert
    }

    fn arguments(&self) -> Vec<String> {
        match self.config.resize {
            Some([w, h]) => vec!["-resize".to_string(), format!("{}x{}", w, h)],
            None => vec![],
        }
    }

    fn is_layer(&self) -> bool {
        true
    }

    fn is_consolidatable(&self) -> bool {
        false
    }

    fn render_order(&self) -> RenderOrder {
        if self.config.resize.is_some() {
            RenderOrder::source_then_args()
        } else {
            RenderOrder::source_only()
        }
    }

    fn source(&self) -> Option<&Path> {
        Some(&self.config.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_canvas_tokens() {
        let canvas = ColorCanvas::new(ColorCanvasConfig {
            width: 100,
            height: 100,
            color: "red".to_string(),
        })
        .unwrap();
        assert_eq!(canvas.arguments(), vec!["-size", "100x100", "xc:red"]);
        assert!(canvas.is_layer());
        assert!(!canvas.is_consolidatable());
    }

    #[test]
    fn color_canvas_rejects_zero_size() {
        let err = ColorCanvas::new(ColorCanvasConfig {
            width: 0,
            height: 0,
            color: String::new(),
        })
        .unwrap_err();
        assert_eq!(err.violations.len(), 3);
    }

    #[test]
    fn image_canvas_without_resize_is_pass_through() {
        let canvas = ImageCanvas::new(ImageCanvasConfig {
            source: PathBuf::from("photo.jpg"),
            resize: None,
        })
        .unwrap();
        assert!(canvas.render_order().is_pass_through());
        assert_eq!(canvas.source(), Some(Path::new("photo.jpg")));

        let resized = ImageCanvas::new(ImageCanvasConfig {
            source: PathBuf::from("photo.jpg"),
            resize: Some([64, 32]),
        })
        .unwrap();
        assert!(!resized.render_order().is_pass_through());
        assert_eq!(resized.arguments(), vec!["-resize", "64x32"]);
    }
}
