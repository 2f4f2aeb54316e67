//! Special Operations - Standalone Multi-Step Foundations
//!
//! Cases the token-list model cannot express: caller-composed chains, raw
//! commands, side-effecting procedures, tools that pick their own output
//! names, and shell-grouped image stacks. All are layers and none merge.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::drawable::{Drawable, DrawableKind, Layer, RenderOrder, SpecialKind, Tool};
use crate::error::RenderResult;
use crate::render::RenderContext;
use crate::validation::{Checks, ValidationErrors};

pub const INPUT_PLACEHOLDER: &str = "{input}";
pub const OUTPUT_PLACEHOLDER: &str = "{output}";

#[derive(Debug)]
pub enum Special {
    Chain(Chain),
    Command(RawCommand),
    Procedure(Procedure),
    Sequence(Sequence),
    Stack(ImageStack),
}

impl Special {
    pub fn subtype(&self) -> SpecialKind {
        match self {
            Special::Chain(_) => SpecialKind::Chain,
            Special::Command(_) => SpecialKind::Command,
            Special::Procedure(_) => SpecialKind::Procedure,
            Special::Sequence(_) => SpecialKind::Sequence,
            Special::Stack(_) => SpecialKind::Stack,
        }
    }
}

impl Drawable for Special {
    fn name(&self) -> &str {
        match self {
            Special::Chain(_) => "chain",
            Special::Command(_) => "command",
            Special::Procedure(procedure) => &procedure.name,
            Special::Sequence(_) => "sequence",
            Special::Stack(_) => "stack",
        }
    }

    fn kind(&self) -> DrawableKind {
        DrawableKind::Special(self.subtype())
    }

    fn tool(&self) -> Tool {
        match self {
            Special::Sequence(sequence) => sequence.drawable.tool(),
            Special::Stack(stack) => stack.config.tool,
            _ => Tool::Convert,
        }
    }

    fn arguments(&self) -> Vec<String> {
        match self {
            Special::Command(command) => command.config.args.clone(),
            Special::Sequence(sequence) => sequence.drawable.arguments(),
            Special::Stack(stack) => stack
                .config
                .entries
                .iter()
                .flat_map(|e| e.tokens.iter().cloned())
                .chain(stack.config.trailing.iter().cloned())
                .collect(),
            Special::Chain(_) | Special::Procedure(_) => vec![],
        }
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

/// One stage of a [`Chain`].
#[derive(Debug)]
pub enum ChainItem {
    /// Shell command; `{input}` and `{output}` are substituted.
    Command(String),
    /// Nested layer rendered to this stage's target.
    Render(Box<Layer>),
}

/// Caller-composed pipeline ending at `output`.
#[derive(Debug)]
pub struct Chain {
    pub temp_dir: PathBuf,
    pub output: PathBuf,
    pub items: Vec<ChainItem>,
}

impl Chain {
    pub fn new(
        temp_dir: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        items: Vec<ChainItem>,
    ) -> Result<Self, ValidationErrors> {
        let temp_dir = temp_dir.into();
        let output = output.into();
        let first_reads_input = matches!(
            items.first(),
            Some(ChainItem::Command(command)) if command.contains(INPUT_PLACEHOLDER)
        );
        Checks::new()
            .require(!items.is_empty(), "items", "must not be empty")
            .require(
                !first_reads_input,
                "items[0]",
                "first step has no {input} to read",
            )
            .require(
                !temp_dir.as_os_str().is_empty(),
                "tempDir",
                "must not be empty",
            )
            .require(!output.as_os_str().is_empty(), "output", "must not be empty")
            .finish(Self {
                temp_dir,
                output,
                items,
            })
    }

    /// Extension used for intermediate stage files.
    pub fn extension(&self) -> Option<&str> {
        self.output.extension().and_then(|e| e.to_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCommandConfig {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    pub output: PathBuf,
}

/// Fully formed argv the caller vouches for.
#[derive(Debug, Clone)]
pub struct RawCommand {
    pub config: RawCommandConfig,
}

impl RawCommand {
    pub fn new(config: RawCommandConfig) -> Result<Self, ValidationErrors> {
        Checks::new()
            .non_empty("program", &config.program)
            .require(
                !config.output.as_os_str().is_empty(),
                "output",
                "must not be empty",
            )
            .finish(Self { config })
    }
}

pub type ProcedureFn = Arc<dyn Fn(&RenderContext<'_>) -> RenderResult<()> + Send + Sync>;

/// Side-effecting operation with no single artifact.
#[derive(Clone)]
pub struct Procedure {
    pub name: String,
    pub run: ProcedureFn,
}

impl Procedure {
    pub fn new<F>(name: impl Into<String>, run: F) -> Result<Self, ValidationErrors>
    where
        F: Fn(&RenderContext<'_>) -> RenderResult<()> + Send + Sync + 'static,
    {
        let name = name.into();
        Checks::new().non_empty("name", &name).finish(Self {
            name,
            run: Arc::new(run),
        })
    }
}

impl fmt::Debug for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Procedure")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Drawable whose tool numbers its own output files (`name-%d.png`).
#[derive(Debug)]
pub struct Sequence {
    pub drawable: Box<dyn Drawable>,
    pub first_index: u32,
}

impl Sequence {
    pub fn new(drawable: Box<dyn Drawable>, first_index: u32) -> Result<Self, ValidationErrors> {
        let standalone = drawable.is_layer();
        Checks::new()
            .require(standalone, "drawable", "must render without an input")
            .finish(Self {
                drawable,
                first_index,
            })
    }

    /// Output pattern handed to the tool, and the file it will produce.
    pub fn output_names(&self, dir: &Path, stem: &str, format: &str) -> (PathBuf, PathBuf) {
        (
            dir.join(format!("{}-%d.{}", stem, format)),
            dir.join(format!("{}-{}.{}", stem, self.first_index, format)),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackEntry {
    pub source: PathBuf,
    #[serde(default)]
    pub tokens: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageStackConfig {
    #[serde(default = "default_stack_tool")]
    pub tool: Tool,
    pub entries: Vec<StackEntry>,
    #[serde(default)]
    pub trailing: Vec<String>,
}

fn default_stack_tool() -> Tool {
    Tool::Convert
}

/// Parenthesised sub-images composed in one shell command.
#[derive(Debug, Clone)]
pub struct ImageStack {
    pub config: ImageStackConfig,
}

impl ImageStack {
    pub fn new(config: ImageStackConfig) -> Result<Self, ValidationErrors> {
        let sources_ok = config
            .entries
            .iter()
            .all(|e| !e.source.as_os_str().is_empty());
        Checks::new()
            .require(!config.entries.is_empty(), "entries", "must not be empty")
            .require(sources_ok, "entries.source", "must not be empty")
            .finish(Self { config })
    }

    /// Shell command line writing the stack to `dest`.
    pub fn command_line(&self, program: &str, dest: &Path) -> String {
        let mut parts = vec![shell_quote(program)];
        for entry in &self.config.entries {
            parts.push("\\(".to_string());
            parts.push(shell_quote(&entry.source.display().to_string()));
            parts.extend(entry.tokens.iter().map(|t| shell_quote(t)));
            parts.push("\\)".to_string());
        }
        parts.extend(self.config.trailing.iter().map(|t| shell_quote(t)));
        parts.push(shell_quote(&dest.display().to_string()));
        parts.join(" ")
    }
}

/// POSIX single-quote `token` unless it is plainly safe.
pub fn shell_quote(token: &str) -> String {
    let safe = !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=+%,@".contains(c));
    if safe {
        token.to_string()
    } else {
        format!("'{}'", token.replace('\'', r"'\''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::{ColorCanvas, ColorCanvasConfig, Sepia, SepiaConfig};

    #[test]
    fn quoting_handles_spaces_and_quotes() {
        assert_eq!(shell_quote("-resize"), "-resize");
        assert_eq!(shell_quote("50%"), "50%");
        assert_eq!(shell_quote("my file.png"), "'my file.png'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote(""), "''");
    }

    #[test]
    fn stack_groups_entries_in_parentheses() {
        let stack = ImageStack::new(ImageStackConfig {
            tool: Tool::Convert,
            entries: vec![
                StackEntry {
                    source: PathBuf::from("a.png"),
                    tokens: vec!["-resize".into(), "50%".into()],
                },
                StackEntry {
                    source: PathBuf::from("b c.png"),
                    tokens: vec!["-negate".into()],
                },
            ],
            trailing: vec!["+append".into()],
        })
        .unwrap();

        assert_eq!(
            stack.command_line("convert", Path::new("/tmp/out.png")),
            r"convert \( a.png -resize 50% \) \( 'b c.png' -negate \) +append /tmp/out.png"
        );
    }

    #[test]
    fn chain_rejects_input_on_first_step() {
        let err = Chain::new(
            "/tmp/chain",
            "/tmp/out.png",
            vec![ChainItem::Command("convert {input} {output}".into())],
        )
        .unwrap_err();
        assert_eq!(err.violations[0].field, "items[0]");

        assert!(Chain::new("/tmp/chain", "/tmp/out.png", vec![]).is_err());
    }

    #[test]
    fn sequence_requires_standalone_drawable() {
        let sepia = Sepia::new(SepiaConfig { percent: 10.0 }).unwrap();
        assert!(Sequence::new(Box::new(sepia), 0).is_err());

        let canvas = ColorCanvas::new(ColorCanvasConfig {
            width: 4,
            height: 4,
            color: "red".into(),
        })
        .unwrap();
        let sequence = Sequence::new(Box::new(canvas), 2).unwrap();
        let (pattern, produced) = sequence.output_names(Path::new("/tmp/x"), "abc", "png");
        assert_eq!(pattern, PathBuf::from("/tmp/x/abc-%d.png"));
        assert_eq!(produced, PathBuf::from("/tmp/x/abc-2.png"));
    }

    #[test]
    fn specials_never_merge() {
        let command = RawCommand::new(RawCommandConfig {
            program: "convert".into(),
            args: vec!["rose:".into(), "/tmp/rose.png".into()],
            output: PathBuf::from("/tmp/rose.png"),
        })
        .unwrap();
        let special = Special::Command(command);
        assert!(special.is_layer());
        assert!(!special.is_consolidatable());
        assert_eq!(special.kind(), DrawableKind::Special(SpecialKind::Command));
    }
}
