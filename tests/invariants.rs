//! Pipeline Invariant Tests
//!
//! Consolidation, staging and the layer renderers, driven through the
//! public API with a stub runner. No image tool is needed.

mod common;

use std::fs;
use std::path::{Path, PathBuf};

use common::{args, config, red_canvas, staged_files, StubRunner};
use inkstage_core::ops::{
    Blur, BlurConfig, Circle, CircleConfig, Compare, CompareConfig, Crop, CropConfig,
    ImageCanvas, ImageCanvasConfig, Line, LineConfig, Metric, Sepia, SepiaConfig, Text,
    TextConfig, Tint, TintConfig,
};
use inkstage_core::render::standard::{apply_multiple_effects, apply_single_effect};
use inkstage_core::{
    preprocess_drawables_for_rendering, Drawable, Invocation, Layer, RenderConfig, RenderContext,
    RenderError, RenderOutput, RenderPipeline, ToolConfig, ToolOutput,
};

fn sepia(percent: f64) -> Sepia {
    Sepia::new(SepiaConfig { percent }).unwrap()
}

fn blur() -> Blur {
    Blur::new(BlurConfig { radius: 2.0, sigma: 1.0 }).unwrap()
}

fn crop() -> Crop {
    Crop::new(CropConfig { width: 50, height: 50, x: 10, y: 10 }).unwrap()
}

fn tint() -> Tint {
    Tint::new(TintConfig { color: "blue".to_string(), percent: 30.0 }).unwrap()
}

fn photo(source: PathBuf, resize: Option<[u32; 2]>) -> ImageCanvas {
    ImageCanvas::new(ImageCanvasConfig { source, resize }).unwrap()
}

fn line() -> Line {
    Line::new(LineConfig {
        from: [0.0, 0.0],
        to: [99.0, 99.0],
        color: "white".to_string(),
        stroke_width: 3.0,
    })
    .unwrap()
}

fn circle() -> Circle {
    Circle::new(CircleConfig {
        center: [50.0, 50.0],
        radius: 10.0,
        fill: "yellow".to_string(),
    })
    .unwrap()
}

fn pipeline(root: &Path, runner: StubRunner) -> RenderPipeline<StubRunner> {
    RenderPipeline::new(config(root), runner)
}

#[test]
fn invariant_sepia_and_blur_share_one_invocation() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline(dir.path(), StubRunner::new());
    let layer = Layer::canvas(red_canvas()).with(sepia(50.0)).with(blur());

    let plan = pipeline.plan_layer(&layer).unwrap();
    let members: Vec<_> = plan.groups.iter().map(|g| g.members.clone()).collect();
    assert_eq!(members, vec![vec!["colorCanvas"], vec!["sepia", "blur"]]);

    let dest = dir.path().join("final.png");
    let output = pipeline.render_layer(&layer, &dest).unwrap();
    assert_eq!(output, RenderOutput::Artifact(dest.clone()));
    assert!(dest.exists());

    let calls = pipeline.runner().calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].program(), "convert");
    let canvas_args = args(&calls[0]);
    assert_eq!(&canvas_args[..3], ["-size", "100x100", "xc:red"]);

    let effect_args = args(&calls[1]);
    assert_eq!(effect_args[0], canvas_args[3]);
    assert_eq!(&effect_args[1..5], ["-sepia-tone", "50%", "-blur", "2x1"]);
}

#[test]
fn invariant_unmergeable_effect_splits_groups() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("photo.jpg");
    fs::write(&source, b"jpeg").unwrap();

    let pipeline = pipeline(dir.path(), StubRunner::new());
    let layer = Layer::canvas(photo(source, Some([200, 200])))
        .with(crop())
        .with(tint());

    let plan = pipeline.plan_layer(&layer).unwrap();
    assert_eq!(plan.groups.len(), 3);

    pipeline
        .render_layer(&layer, &dir.path().join("out.png"))
        .unwrap();
    let calls = pipeline.runner().calls();
    assert_eq!(calls.len(), 3);
    assert!(args(&calls[1]).contains(&"-crop".to_string()));
    assert!(args(&calls[2]).contains(&"-tint".to_string()));
    assert_eq!(args(&calls[2])[0], *args(&calls[1]).last().unwrap());
}

#[test]
fn invariant_pass_through_canvas_spawns_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("photo.png");
    fs::write(&source, b"original pixels").unwrap();

    let pipeline = pipeline(dir.path(), StubRunner::new());
    let dest = dir.path().join("copy.png");
    pipeline
        .render_layer(&Layer::canvas(photo(source.clone(), None)), &dest)
        .unwrap();

    assert!(pipeline.runner().calls().is_empty());
    assert_eq!(fs::read(&dest).unwrap(), b"original pixels");
    assert!(source.exists());
}

#[test]
fn invariant_numeric_compare_stderr_resolves() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("a.png");
    fs::write(&source, b"a").unwrap();

    let runner = StubRunner::responding(|inv| match inv.program() {
        "compare" => ToolOutput::with_stderr(1, "1234"),
        _ => ToolOutput::ok(),
    });
    let pipeline = pipeline(dir.path(), runner);
    let compare = Compare::new(CompareConfig {
        other: dir.path().join("golden.png"),
        metric: Metric::Ae,
        fuzz: None,
    })
    .unwrap();
    let layer = Layer::canvas(photo(source, Some([10, 10]))).with(compare);

    let dest = dir.path().join("diff.png");
    let output = pipeline.render_layer(&layer, &dest).unwrap();
    assert_eq!(output.path(), Some(dest.as_path()));

    let calls = pipeline.runner().calls();
    assert_eq!(calls[1].program(), "compare");
    assert_eq!(&args(&calls[1])[..2], ["-metric", "AE"]);
}

#[test]
fn invariant_failure_aborts_remaining_groups() {
    let dir = tempfile::tempdir().unwrap();
    let runner = StubRunner::responding(|inv| match inv {
        Invocation::Argv { args, .. } if args.iter().any(|a| a == "-crop") => {
            ToolOutput::with_stderr(1, "convert: geometry does not contain image")
        }
        _ => ToolOutput::ok(),
    });
    let pipeline = pipeline(dir.path(), runner);
    let layer = Layer::canvas(red_canvas())
        .with(sepia(20.0))
        .with(crop())
        .with(tint());

    let dest = dir.path().join("never.png");
    let err = pipeline.render_layer(&layer, &dest).unwrap_err();
    match err {
        RenderError::Execution { drawable, command, message } => {
            assert_eq!(drawable, "crop");
            assert_eq!(command, "convert");
            assert!(message.contains("geometry"));
        }
        other => panic!("unexpected error: {other}"),
    }

    assert_eq!(pipeline.runner().calls().len(), 3);
    assert!(!dest.exists());
    assert!(staged_files(pipeline.config()).is_empty());
}

#[test]
fn invariant_intermediates_kept_on_request() {
    let dir = tempfile::tempdir().unwrap();
    let config = RenderConfig {
        keep_intermediates: true,
        ..config(dir.path())
    };
    let pipeline = RenderPipeline::new(config, StubRunner::new());
    let layer = Layer::canvas(red_canvas()).with(crop()).with(tint());

    pipeline
        .render_layer(&layer, &dir.path().join("out.png"))
        .unwrap();
    // canvas and crop outputs remain; the tint output moved to dest
    assert_eq!(staged_files(pipeline.config()).len(), 2);
}

#[test]
fn invariant_intermediates_removed_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline(dir.path(), StubRunner::new());
    let layer = Layer::canvas(red_canvas()).with(crop()).with(tint());

    pipeline
        .render_layer(&layer, &dir.path().join("out.png"))
        .unwrap();
    assert!(staged_files(pipeline.config()).is_empty());
    assert!(dir.path().join("out.png").exists());
}

#[test]
fn invariant_primitives_stack_onto_one_call() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline(dir.path(), StubRunner::new());
    let layer = Layer::canvas(red_canvas())
        .with(line())
        .with(circle())
        .with(
            Text::new(TextConfig {
                position: [5.0, 20.0],
                text: "hi".to_string(),
                color: "black".to_string(),
                pointsize: 12.0,
            })
            .unwrap(),
        );

    pipeline
        .render_layer(&layer, &dir.path().join("drawn.png"))
        .unwrap();
    let calls = pipeline.runner().calls();
    assert_eq!(calls.len(), 2);
    let drawn = args(&calls[1]);
    assert_eq!(drawn.iter().filter(|a| *a == "-draw").count(), 2);
    assert!(drawn.contains(&"-annotate".to_string()));
}

#[test]
fn invariant_preprocess_chains_paths() {
    let layer = Layer::canvas(red_canvas())
        .with(sepia(10.0))
        .with(crop())
        .with(blur());
    let items = preprocess_drawables_for_rendering(&layer, Path::new("/stage"), "png", true);

    assert_eq!(items.len(), 4);
    assert!(items[0].previous_output_path.is_none());
    for pair in items.windows(2) {
        assert_eq!(
            pair[1].previous_output_path.as_deref(),
            Some(pair[0].temp_file_path.as_path())
        );
    }
}

#[test]
fn invariant_empty_effect_chain_is_identity() {
    let dir = tempfile::tempdir().unwrap();
    let runner = StubRunner::new();
    let config = config(dir.path());
    let ctx = RenderContext::new(&runner, &config);

    let dest = dir.path().join("same.png");
    let result = apply_multiple_effects(&ctx, Path::new("in.png"), &[], &dest).unwrap();
    assert_eq!(result, dest);
    assert!(runner.calls().is_empty());
}

#[test]
fn invariant_effect_chain_is_a_sequential_fold() {
    let dir = tempfile::tempdir().unwrap();
    let runner = StubRunner::new();
    let config = config(dir.path());
    let ctx = RenderContext::new(&runner, &config);

    let (s, b) = (sepia(40.0), blur());
    let effects: [&dyn Drawable; 2] = [&s, &b];
    let dest = dir.path().join("chained.png");
    apply_multiple_effects(&ctx, Path::new("/in/start.png"), &effects, &dest).unwrap();

    let calls = runner.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(args(&calls[0])[0], "/in/start.png");
    assert_eq!(args(&calls[1])[0], *args(&calls[0]).last().unwrap());
    assert_eq!(*args(&calls[1]).last().unwrap(), dest.display().to_string());
}

#[test]
fn invariant_effect_chain_stops_at_first_failure() {
    let dir = tempfile::tempdir().unwrap();
    let runner = StubRunner::responding(|_| ToolOutput::with_stderr(0, "convert: out of memory"));
    let config = config(dir.path());
    let ctx = RenderContext::new(&runner, &config);

    let (s, b) = (sepia(40.0), blur());
    let effects: [&dyn Drawable; 2] = [&s, &b];
    let err = apply_multiple_effects(&ctx, Path::new("in.png"), &effects, &dir.path().join("x.png"))
        .unwrap_err();
    assert!(err.to_string().starts_with("sepia failed running convert"));
    assert_eq!(runner.calls().len(), 1);
}

#[test]
fn invariant_single_effect_honours_argument_order() {
    let dir = tempfile::tempdir().unwrap();
    let runner = StubRunner::new();
    let config = config(dir.path());
    let ctx = RenderContext::new(&runner, &config);

    let compare = Compare::new(CompareConfig {
        other: PathBuf::from("/golden.png"),
        metric: Metric::Psnr,
        fuzz: None,
    })
    .unwrap();
    apply_single_effect(&ctx, Path::new("/in.png"), &compare, &dir.path().join("d.png")).unwrap();

    let calls = runner.calls();
    assert_eq!(
        &args(&calls[0])[..4],
        ["-metric", "PSNR", "/golden.png", "/in.png"]
    );
}

#[test]
fn invariant_independent_layers_render_concurrently() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline(dir.path(), StubRunner::new());

    std::thread::scope(|scope| {
        for i in 0..4 {
            let pipeline = &pipeline;
            let dest = dir.path().join(format!("layer-{i}.png"));
            scope.spawn(move || {
                let layer = Layer::canvas(red_canvas()).with(sepia(10.0 * (i + 1) as f64)).with(crop());
                pipeline.render_layer(&layer, &dest).unwrap();
                assert!(dest.exists());
            });
        }
    });

    let calls = pipeline.runner().calls();
    assert_eq!(calls.len(), 12);
    let mut outputs: Vec<_> = calls.iter().map(|c| args(c).last().unwrap().clone()).collect();
    outputs.sort();
    outputs.dedup();
    assert_eq!(outputs.len(), 12);
}

#[test]
fn invariant_plan_fingerprint_ignores_staged_paths() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline(dir.path(), StubRunner::new());
    let layer = Layer::canvas(red_canvas()).with(sepia(50.0)).with(blur());

    let first = pipeline.plan_layer(&layer).unwrap();
    let second = pipeline.plan_layer(&layer).unwrap();
    assert_eq!(first.fingerprint, second.fingerprint);

    let other = Layer::canvas(red_canvas()).with(sepia(51.0)).with(blur());
    assert_ne!(first.fingerprint, pipeline.plan_layer(&other).unwrap().fingerprint);
}

#[test]
fn invariant_plan_fingerprint_tracks_canvas_source() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline(dir.path(), StubRunner::new());
    let plan = |source: &str| {
        let layer = Layer::canvas(photo(PathBuf::from(source), None)).with(sepia(50.0));
        pipeline.plan_layer(&layer).unwrap()
    };

    let a = plan("/a.png");
    assert_eq!(a.groups[0].sources, vec![PathBuf::from("/a.png")]);
    assert_ne!(a.fingerprint, plan("/b.png").fingerprint);
    assert_eq!(a.fingerprint, plan("/a.png").fingerprint);
}

#[test]
fn invariant_missing_tool_names_the_stage() {
    let dir = tempfile::tempdir().unwrap();
    let config = RenderConfig {
        tools: ToolConfig {
            convert: "inkstage-missing-convert-7f3a".to_string(),
            ..ToolConfig::default()
        },
        ..config(dir.path())
    };
    let pipeline = RenderPipeline::from_config(config);
    let layer = Layer::canvas(red_canvas()).with(crop());

    let err = pipeline
        .render_layer(&layer, &dir.path().join("out.png"))
        .unwrap_err();
    match &err {
        RenderError::Spawn { drawable, command, .. } => {
            assert_eq!(drawable, "colorCanvas");
            assert_eq!(command, "inkstage-missing-convert-7f3a");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().starts_with("colorCanvas failed to spawn"));
}

#[test]
fn invariant_primitive_failure_names_its_members() {
    let dir = tempfile::tempdir().unwrap();
    let runner = StubRunner::responding(|inv| match inv {
        Invocation::Argv { args, .. } if args.iter().any(|a| a == "-draw") => {
            ToolOutput::with_stderr(1, "convert: non-conforming drawing primitive")
        }
        _ => ToolOutput::ok(),
    });
    let pipeline = pipeline(dir.path(), runner);
    let layer = Layer::canvas(red_canvas()).with(line()).with(circle());

    let err = pipeline
        .render_layer(&layer, &dir.path().join("out.png"))
        .unwrap_err();
    assert!(err
        .to_string()
        .starts_with("line+circle failed running convert"));
}
