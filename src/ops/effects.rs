use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::num;
use crate::drawable::{Drawable, DrawableKind, EffectKind, RenderOrder, Tool};
use crate::error::{RenderError, RenderResult};
use crate::validation::{Checks, ValidationErrors};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SepiaConfig {
    pub percent: f64,
}

#[derive(Debug, Clone)]
pub struct Sepia {
    config: SepiaConfig,
}

impl Sepia {
    pub fn new(config: SepiaConfig) -> Result<Self, ValidationErrors> {
        Checks::new()
            .percent("percent", config.percent)
            .finish(Self { config })
    }
}

impl Drawable for Sepia {
    fn name(&self) -> &str {
        "sepia"
    }

    fn kind(&self) -> DrawableKind {
        DrawableKind::Effect(EffectKind::Fx)
    }

    fn tool(&self) -> Tool {
        Tool::Convert
    }

    fn arguments(&self) -> Vec<String> {
        vec![
            "-sepia-tone".to_string(),
            format!("{}%", num(self.config.percent)),
        ]
    }

    fn is_layer(&self) -> bool {
        false
    }

    fn is_consolidatable(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlurConfig {
    pub radius: f64,
    pub sigma: f64,
}

#[derive(Debug, Clone)]
pub struct Blur {
    config: BlurConfig,
}

impl Blur {
    pub fn new(config: BlurConfig) -> Result<Self, ValidationErrors> {
        Checks::new()
            .non_negative("radius", config.radius)
            .positive("sigma", config.sigma)
            .finish(Self { config })
    }
}

impl Drawable for Blur {
    fn name(&self) -> &str {
        "blur"
    }

    fn kind(&self) -> DrawableKind {
        DrawableKind::Effect(EffectKind::Fx)
    }

    fn tool(&self) -> Tool {
        Tool::Convert
    }

    fn arguments(&self) -> Vec<String> {
        vec![
            "-blur".to_string(),
            format!("{}x{}", num(self.config.radius), num(self.config.sigma)),
        ]
    }

    fn is_layer(&self) -> bool {
        false
    }

    fn is_consolidatable(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TintConfig {
    pub color: String,
    pub percent: f64,
}

#[derive(Debug, Clone)]
pub struct Tint {
    config: TintConfig,
}

impl Tint {
    pub fn new(config: TintConfig) -> Result<Self, ValidationErrors> {
        Checks::new()
            .non_empty("color", &config.color)
            .percent("percent", config.percent)
            .finish(Self { config })
    }
}

impl Drawable for Tint {
    fn name(&self) -> &str {
        "tint"
    }

    fn kind(&self) -> DrawableKind {
        DrawableKind::Effect(EffectKind::Fx)
    }

    fn tool(&self) -> Tool {
        Tool::Convert
    }

    fn arguments(&self) -> Vec<String> {
        vec![
            "-fill".to_string(),
            self.config.color.clone(),
            "-tint".to_string(),
            num(self.config.percent),
        ]
    }

    fn is_layer(&self) -> bool {
        false
    }

    fn is_consolidatable(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModulateConfig {
    #[serde(default = "hundred")]
    pub brightness: f64,
    #[serde(default = "hundred")]
    pub saturation: f64,
    #[serde(default = "hundred")]
    pub hue: f64,
}

fn hundred() -> f64 {
    100.0
}

/// Brightness, saturation and hue, each relative to 100.
#[derive(Debug, Clone)]
pub struct Modulate {
    config: ModulateConfig,
}

impl Modulate {
    pub fn new(config: ModulateConfig) -> Result<Self, ValidationErrors> {
        Checks::new()
            .non_negative("brightness", config.brightness)
            .non_negative("saturation", config.saturation)
            .require(
                config.hue.is_finite() && (0.0..=200.0).contains(&config.hue),
                "hue",
                "must be between 0 and 200",
            )
            .finish(Self { config })
    }
}

impl Drawable for Modulate {
    fn name(&self) -> &str {
        "modulate"
    }

    fn kind(&self) -> DrawableKind {
        DrawableKind::Effect(EffectKind::Mod)
    }

    fn tool(&self) -> Tool {
        Tool::Convert
    }

    fn arguments(&self) -> Vec<String> {
        vec![
            "-modulate".to_string(),
            format!(
                "{},{},{}",
                num(self.config.brightness),
                num(self.config.saturation),
                num(self.config.hue)
            ),
        ]
    }

    fn is_layer(&self) -> bool {
        false
    }

    fn is_consolidatable(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropConfig {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
}

/// Changes geometry, so it never shares an invocation.
#[derive(Debug, Clone)]
pub struct Crop {
    config: CropConfig,
}

impl Crop {
    pub fn new(config: CropConfig) -> Result<Self, ValidationErrors> {
        Checks::new()
            .require(config.width > 0, "width", "must be greater than 0")
            .require(config.height > 0, "height", "must be greater than 0")
            .finish(Self { config })
    }
}

impl Drawable for Crop {
    fn name(&self) -> &str {
        "crop"
    }

    fn kind(&self) -> DrawableKind {
        DrawableKind::Effect(EffectKind::Transform)
    }

    fn tool(&self) -> Tool {
        Tool::Convert
    }

    fn arguments(&self) -> Vec<String> {
        let c = &self.config;
        vec![
            "-crop".to_string(),
            format!("{}x{}{:+}{:+}", c.width, c.height, c.x, c.y),
            "+repage".to_string(),
        ]
    }

    fn is_layer(&self) -> bool {
        false
    }

    fn is_consolidatable(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Metric {
    #[default]
    Ae,
    Mae,
    Mse,
    Rmse,
    Psnr,
}

impl Metric {
    fn as_str(&self) -> &'static str {
        match self {
            Metric::Ae => "AE",
            Metric::Mae => "MAE",
            Metric::Mse => "MSE",
            Metric::Rmse => "RMSE",
            Metric::Psnr => "PSNR",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompareConfig {
    pub other: PathBuf,
    #[serde(default)]
    pub metric: Metric,
    #[serde(default)]
    pub fuzz: Option<f64>,
}

/// Difference image against a second file; the metric lands on stderr.
#[derive(Debug, Clone)]
pub struct Compare {
    config: CompareConfig,
}

impl Compare {
    pub fn new(config: CompareConfig) -> Result<Self, ValidationErrors> {
        Checks::new()
            .require(
                !config.other.as_os_str().is_empty(),
                "other",
                "must not be empty",
            )
            .require(
                config.fuzz.map_or(true, |f| f.is_finite() && (0.0..=100.0).contains(&f)),
                "fuzz",
                "must be between 0 and 100",
            )
            .finish(Self { config })
    }

    pub fn other(&self) -> &PathBuf {
        &self.config.other
    }
}

impl Drawable for Compare {
    fn name(&self) -> &str {
        "compare"
    }

    fn kind(&self) -> DrawableKind {
        DrawableKind::Effect(EffectKind::Fx)
    }

    fn tool(&self) -> Tool {
        Tool::Compare
    }

    fn arguments(&self) -> Vec<String> {
        let mut args = vec!["-metric".to_string(), self.config.metric.as_str().to_string()];
        if let Some(fuzz) = self.config.fuzz {
            args.push("-fuzz".to_string());
            args.push(format!("{}%", num(fuzz)));
        }
        args.push(self.config.other.display().to_string());
        args
    }

    fn is_layer(&self) -> bool {
        false
    }

    fn is_consolidatable(&self) -> bool {
        false
    }

    fn render_order(&self) -> RenderOrder {
        RenderOrder::args_then_source()
    }

    fn source_count(&self) -> usize {
        2
    }

    fn rebind_sources(&mut self, sources: Vec<PathBuf>) -> RenderResult<()> {
        self.config.other = single_source(self.name(), sources)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposeConfig {
    pub overlay: PathBuf,
    #[serde(default = "default_gravity")]
    pub gravity: String,
    #[serde(default = "default_operator")]
    pub operator: String,
}

fn default_gravity() -> String {
    "center".to_string()
}

fn default_operator() -> String {
    "over".to_string()
}

/// Places `overlay` on top of the input image.
#[derive(Debug, Clone)]
pub struct Compose {
    config: ComposeConfig,
}

impl Compose {
    pub fn new(config: ComposeConfig) -> Result<Self, ValidationErrors> {
        Checks::new()
            .require(
                !config.overlay.as_os_str().is_empty(),
                "overlay",
                "must not be empty",
            )
            .non_empty("gravity", &config.gravity)
            .non_empty("operator", &config.operator)
            .finish(Self { config })
    }

    pub fn overlay(&self) -> &PathBuf {
        &self.config.overlay
    }
}

impl Drawable for Compose {
    fn name(&self) -> &str {
        "compose"
    }

    fn kind(&self) -> DrawableKind {
        DrawableKind::Effect(EffectKind::Mod)
    }

    fn tool(&self) -> Tool {
        Tool::Composite
    }

    fn arguments(&self) -> Vec<String> {
        vec![
            "-gravity".to_string(),
            self.config.gravity.clone(),
            "-compose".to_string(),
            self.config.operator.clone(),
            self.config.overlay.display().to_string(),
        ]
    }

    fn is_layer(&self) -> bool {
        false
    }

    fn is_consolidatable(&self) -> bool {
        false
    }

    fn render_order(&self) -> RenderOrder {
        RenderOrder::args_then_source()
    }

    fn source_count(&self) -> usize {
        2
    }

    fn rebind_sources(&mut self, sources: Vec<PathBuf>) -> RenderResult<()> {
        self.config.overlay = single_source(self.name(), sources)?;
        Ok(())
    }
}

fn single_source(name: &str, sources: Vec<PathBuf>) -> RenderResult<PathBuf> {
    let count = sources.len();
    let mut iter = sources.into_iter();
    match (iter.next(), count) {
        (Some(path), 1) => Ok(path),
        _ => Err(RenderError::Dispatch(format!(
            "{} takes exactly one secondary source, got {}",
            name, count
        ))),
    }
}
