//! Stub runner shared by the integration tests.
//!
//! Records every invocation and writes a small file at the output path so
//! later groups and the final move have something to work with.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use inkstage_core::ops::{ColorCanvas, ColorCanvasConfig};
use inkstage_core::{CommandRunner, Invocation, RenderConfig, RenderResult, ToolOutput};

type Responder = Box<dyn Fn(&Invocation) -> ToolOutput + Send + Sync>;

pub struct StubRunner {
    calls: Mutex<Vec<Invocation>>,
    respond: Responder,
}

impl StubRunner {
    pub fn new() -> Self {
        Self::responding(|_| ToolOutput::ok())
    }

    pub fn responding<F>(respond: F) -> Self
    where
        F: Fn(&Invocation) -> ToolOutput + Send + Sync + 'static,
    {
        Self {
            calls: Mutex::new(Vec::new()),
            respond: Box::new(respond),
        }
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }
}

impl CommandRunner for StubRunner {
    fn run(&self, invocation: &Invocation) -> RenderResult<ToolOutput> {
        self.calls.lock().unwrap().push(invocation.clone());
        let output = (self.respond)(invocation);
        if matches!(output.status, Some(0) | Some(1)) {
            if let Some(path) = output_path(invocation) {
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent).unwrap();
                }
                fs::write(&path, invocation.to_string()).unwrap();
            }
        }
        Ok(output)
    }
}

/// Last token of the command, with `%d` numbered from zero.
fn output_path(invocation: &Invocation) -> Option<PathBuf> {
    let last = match invocation {
        Invocation::Argv { args, .. } => args.last()?.clone(),
        Invocation::Shell { command, .. } => command
            .split_whitespace()
            .last()?
            .trim_matches('\'')
            .to_string(),
    };
    if !last.contains('/') {
        return None;
    }
    Some(PathBuf::from(last.replace("%d", "0")))
}

pub fn args(invocation: &Invocation) -> &[String] {
    match invocation {
        Invocation::Argv { args, .. } => args,
        Invocation::Shell { .. } => panic!("expected argv invocation, got {}", invocation),
    }
}

pub fn config(root: &Path) -> RenderConfig {
    RenderConfig {
        output_dir: root.join("stage"),
        ..RenderConfig::default()
    }
}

pub fn red_canvas() -> ColorCanvas {
    ColorCanvas::new(ColorCanvasConfig {
        width: 100,
        height: 100,
        color: "red".to_string(),
    })
    .unwrap()
}

/// Files left in the staging directory.
pub fn staged_files(config: &RenderConfig) -> Vec<PathBuf> {
    match fs::read_dir(&config.output_dir) {
        Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
        Err(_) => vec![],
    }
}
