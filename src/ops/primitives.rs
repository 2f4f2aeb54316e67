//! Drawing directives. These never stand alone and always stack onto one
//! invocation.

use serde::{Deserialize, Serialize};

use super::{num, point};
use crate::drawable::{Drawable, DrawableKind, Tool};
use crate::validation::{Checks, ValidationErrors};

fn finite(p: [f64; 2]) -> bool {
    p.iter().all(|v| v.is_finite())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineConfig {
    pub from: [f64; 2],
    pub to: [f64; 2],
    pub color: String,
    #[serde(default = "one")]
    pub stroke_width: f64,
}

fn one() -> f64 {
    1.0
}

#[derive(Debug, Clone)]
pub struct Line {
    config: LineConfig,
}

impl Line {
    pub fn new(config: LineConfig) -> Result<Self, ValidationErrors> {
        Checks::new()
            .require(finite(config.from) && finite(config.to), "from/to", "must be finite")
            .non_empty("color", &config.color)
            .positive("strokeWidth", config.stroke_width)
            .finish(Self { config })
    }
}

impl Drawable for Line {
    fn name(&self) -> &str {
        "line"
    }

    fn kind(&self) -> DrawableKind {
        DrawableKind::Primitive
    }

    fn tool(&self) -> Tool {
        Tool::Convert
    }

    fn arguments(&self) -> Vec<String> {
        let c = &self.config;
        vec![
            "-stroke".to_string(),
            c.color.clone(),
            "-strokewidth".to_string(),
            num(c.stroke_width),
            "-draw".to_string(),
            format!("line {} {}", point(c.from), point(c.to)),
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
pub struct RectangleConfig {
    pub from: [f64; 2],
    pub to: [f64; 2],
    pub fill: String,
    #[serde(default)]
    pub stroke: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Rectangle {
    config: RectangleConfig,
}

impl Rectangle {
    pub fn new(config: RectangleConfig) -> Result<Self, ValidationErrors> {
        let stroke_ok = config.stroke.as_deref().map_or(true, |s| !s.trim().is_empty());
        Checks::new()
            .require(finite(config.from) && finite(config.to), "from/to", "must be finite")
            .non_empty("fill", &config.fill)
            .require(stroke_ok, "stroke", "must not be empty when set")
            .finish(Self { config })
    }
}

impl Drawable for Rectangle {
    fn name(&self) -> &str {
        "rectangle"
    }

    fn kind(&self) -> DrawableKind {
        DrawableKind::Primitive
    }

    fn tool(&self) -> Tool {
        Tool::Convert
    }

    fn arguments(&self) -> Vec<String> {
        let c = &self.config;
        let mut args = vec!["-fill".to_string(), c.fill.clone()];
        if let Some(stroke) = &c.stroke {
            args.push("-stroke".to_string());
            args.push(stroke.clone());
        }
        args.push("-draw".to_string());
        args.push(format!("rectangle {} {}", point(c.from), point(c.to)));
        args
    }

    fn is_layer(&self) -> bool {
        false
    }

    fn is_consolidatable(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircleConfig {
    pub center: [f64; 2],
    pub radius: f64,
    pub fill: String,
}

#[derive(Debug, Clone)]
pub struct Circle {
    config: CircleConfig,
}

impl Circle {
    pub fn new(config: CircleConfig) -> Result<Self, ValidationErrors> {
        Checks::new()
            .require(finite(config.center), "center", "must be finite")
            .positive("radius", config.radius)
            .non_empty("fill", &config.fill)
            .finish(Self { config })
    }
}

impl Drawable for Circle {
    fn name(&self) -> &str {
        "circle"
    }

    fn kind(&self) -> DrawableKind {
        DrawableKind::Primitive
    }

    fn tool(&self) -> Tool {
        Tool::Convert
    }

    fn arguments(&self) -> Vec<String> {
        let c = &self.config;
        // circle takes the center and any point on the edge
        let edge = [c.center[0] + c.radius, c.center[1]];
        vec![
            "-fill".to_string(),
            c.fill.clone(),
            "-draw".to_string(),
            format!("circle {} {}", point(c.center), point(edge)),
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
#[serde(rename_all = "camelCase")]
pub struct TextConfig {
    pub position: [f64; 2],
    pub text: String,
    pub color: String,
    #[serde(default = "default_pointsize")]
    pub pointsize: f64,
}

fn default_pointsize() -> f64 {
    12.0
}

#[derive(Debug, Clone)]
pub struct Text {
    config: TextConfig,
}

impl Text {
    pub fn new(config: TextConfig) -> Result<Self, ValidationErrors> {
        Checks::new()
            .require(finite(config.position), "position", "must be finite")
            .require(!config.text.is_empty(), "text", "must not be empty")
            .non_empty("color", &config.color)
            .positive("pointsize", config.pointsize)
            .finish(Self { config })
    }
}

impl Drawable for Text {
    fn name(&self) -> &str {
        "text"
    }

    fn kind(&self) -> DrawableKind {
        DrawableKind::Primitive
    }

    fn tool(&self) -> Tool {
        Tool::Convert
    }

    fn arguments(&self) -> Vec<String> {
        let c = &self.config;
        vec![
            "-fill".to_string(),
            c.color.clone(),
            "-pointsize".to_string(),
            num(c.pointsize),
            "-annotate".to_string(),
            format!("{:+}{:+}", c.position[0], c.position[1]),
            c.text.clone(),
        ]
    }

    fn is_layer(&self) -> bool {
        false
    }

    fn is_consolidatable(&self) -> bool {
        true
    }
}
