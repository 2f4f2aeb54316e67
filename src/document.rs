//! Layer Documents - JSON In, Layers Out
//!
//! A document names its foundation and effects by `"type"`. Unknown types
//! fail at load time; nothing falls back to a default.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::drawable::{Drawable, Foundation, Layer};
use crate::error::{RenderError, RenderResult};
use crate::ops::{
    Blur, BlurConfig, Circle, CircleConfig, ColorCanvas, ColorCanvasConfig, Compare,
    CompareConfig, Compose, ComposeConfig, Crop, CropConfig, ImageCanvas, ImageCanvasConfig,
    Line, LineConfig, Modulate, ModulateConfig, Rectangle, RectangleConfig, Sepia, SepiaConfig,
    Text, TextConfig, Tint, TintConfig,
};
use crate::special::{
    Chain, ChainItem, ImageStack, ImageStackConfig, RawCommand, RawCommandConfig, Sequence,
    Special,
};
use crate::ENGINE_VERSION;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DrawableSpec {
    ColorCanvas(ColorCanvasConfig),
    ImageCanvas(ImageCanvasConfig),
    Sepia(SepiaConfig),
    Blur(BlurConfig),
    Tint(TintConfig),
    Modulate(ModulateConfig),
    Crop(CropConfig),
    Compare(CompareConfig),
    Compose(ComposeConfig),
    Line(LineConfig),
    Rectangle(RectangleConfig),
    Circle(CircleConfig),
    Text(TextConfig),
    Command(RawCommandConfig),
    Stack(ImageStackConfig),
    #[serde(rename_all = "camelCase")]
    Sequence {
        drawable: Box<DrawableSpec>,
        #[serde(default)]
        first_index: u32,
    },
    #[serde(rename_all = "camelCase")]
    Chain {
        temp_dir: PathBuf,
        output: PathBuf,
        items: Vec<ChainItemSpec>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChainItemSpec {
    Command(String),
    Render(Box<LayerDocument>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerDocument {
    #[serde(default)]
    pub engine_min_version: Option<String>,
    pub foundation: DrawableSpec,
    #[serde(default)]
    pub effects: Vec<DrawableSpec>,
}

impl LayerDocument {
    pub fn from_json(content: &str) -> RenderResult<Self> {
        serde_json::from_str(content).map_err(|e| RenderError::Document(e.to_string()))
    }

    pub fn load(path: &Path) -> RenderResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| RenderError::filesystem(path, e))?;
        Self::from_json(&content)
    }

    pub fn check_engine_version(&self) -> RenderResult<()> {
        let Some(min) = &self.engine_min_version else {
            return Ok(());
        };
        let engine = semver::Version::parse(ENGINE_VERSION)
            .map_err(|_| RenderError::Document("Invalid engine version".into()))?;
        let min_ver = semver::Version::parse(min)
            .map_err(|_| RenderError::Document(format!("Invalid engineMinVersion '{}'", min)))?;

        if engine < min_ver {
            return Err(RenderError::EngineVersionMismatch(
                min.clone(),
                ENGINE_VERSION.to_string(),
            ));
        }
        Ok(())
    }

    /// Build the layer, resolving relative paths against `base`.
    pub fn into_layer(self, base: &Path) -> RenderResult<Layer> {
        self.check_engine_version()?;
        let mut layer = Layer::new(self.foundation.into_foundation(base)?);
        for effect in self.effects {
            layer.push(effect.into_effect(base)?);
        }
        Ok(layer)
    }

    /// Load a file and build its layer relative to the file's directory.
    pub fn load_layer(path: &Path) -> RenderResult<Layer> {
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::load(path)?.into_layer(base)
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_relative() {
        base.join(path)
    } else {
        path.to_path_buf()
    }
}

impl DrawableSpec {
    fn type_name(&self) -> &'static str {
        match self {
            DrawableSpec::ColorCanvas(_) => "colorCanvas",
            DrawableSpec::ImageCanvas(_) => "imageCanvas",
            DrawableSpec::Sepia(_) => "sepia",
            DrawableSpec::Blur(_) => "blur",
            DrawableSpec::Tint(_) => "tint",
            DrawableSpec::Modulate(_) => "modulate",
            DrawableSpec::Crop(_) => "crop",
            DrawableSpec::Compare(_) => "compare",
            DrawableSpec::Compose(_) => "compose",
            DrawableSpec::Line(_) => "line",
            DrawableSpec::Rectangle(_) => "rectangle",
            DrawableSpec::Circle(_) => "circle",
            DrawableSpec::Text(_) => "text",
            DrawableSpec::Command(_) => "command",
            DrawableSpec::Stack(_) => "stack",
            DrawableSpec::Sequence { .. } => "sequence",
            DrawableSpec::Chain { .. } => "chain",
        }
    }

    pub fn into_foundation(self, base: &Path) -> RenderResult<Foundation> {
        let special = match self {
            DrawableSpec::Command(mut config) => {
                config.output = resolve(base, &config.output);
                Special::Command(RawCommand::new(config)?)
            }
            DrawableSpec::Stack(mut config) => {
                for entry in &mut config.entries {
                    entry.source = resolve(base, &entry.source);
                }
                Special::Stack(ImageStack::new(config)?)
            }
            DrawableSpec::Sequence {
                drawable,
                first_index,
            } => Special::Sequence(Sequence::new((*drawable).into_drawable(base)?, first_index)?),
            DrawableSpec::Chain {
                temp_dir,
                output,
                items,
            } => {
                let items = items
                    .into_iter()
                    .map(|item| match item {
                        ChainItemSpec::Command(line) => Ok(ChainItem::Command(line)),
                        ChainItemSpec::Render(doc) => {
                            Ok(ChainItem::Render(Box::new((*doc).into_layer(base)?)))
                        }
                    })
                    .collect::<RenderResult<Vec<_>>>()?;
                Special::Chain(Chain::new(
                    resolve(base, &temp_dir),
                    resolve(base, &output),
                    items,
                )?)
            }
            other => {
                let drawable = other.into_drawable(base)?;
                if !drawable.is_layer() {
                    return Err(RenderError::Document(format!(
                        "{} needs an input image and cannot be a foundation",
                        drawable.name()
                    )));
                }
                return Ok(Foundation::Canvas(drawable));
            }
        };
        Ok(Foundation::Special(special))
    }

    pub fn into_effect(self, base: &Path) -> RenderResult<Box<dyn Drawable>> {
        self.into_drawable(base)
    }

    fn into_drawable(self, base: &Path) -> RenderResult<Box<dyn Drawable>> {
        let drawable: Box<dyn Drawable> = match self {
            DrawableSpec::ColorCanvas(config) => Box::new(ColorCanvas::new(config)?),
            DrawableSpec::ImageCanvas(config) => {
                let source = resolve(base, &config.source);
                let mut canvas = ImageCanvas::new(config)?;
                canvas.set_source(source);
                Box::new(canvas)
            }
            DrawableSpec::Sepia(config) => Box::new(Sepia::new(config)?),
            DrawableSpec::Blur(config) => Box::new(Blur::new(config)?),
            DrawableSpec::Tint(config) => Box::new(Tint::new(config)?),
            DrawableSpec::Modulate(config) => Box::new(Modulate::new(config)?),
            DrawableSpec::Crop(config) => Box::new(Crop::new(config)?),
            DrawableSpec::Compare(config) => {
                let mut compare = Compare::new(config)?;
                let other = resolve(base, compare.other());
                compare.rebind_sources(vec![other])?;
                Box::new(compare)
            }
            DrawableSpec::Compose(config) => {
                let mut compose = Compose::new(config)?;
                let overlay = resolve(base, compose.overlay());
                compose.rebind_sources(vec![overlay])?;
                Box::new(compose)
            }
            DrawableSpec::Line(config) => Box::new(Line::new(config)?),
            DrawableSpec::Rectangle(config) => Box::new(Rectangle::new(config)?),
            DrawableSpec::Circle(config) => Box::new(Circle::new(config)?),
            DrawableSpec::Text(config) => Box::new(Text::new(config)?),
            special => {
                return Err(RenderError::Document(format!(
                    "{} is a special operation and can only be a foundation",
                    special.type_name()
                )))
            }
        };
        Ok(drawable)
    }
}
