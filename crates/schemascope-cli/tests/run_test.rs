//! End-to-end tests for the CLI run loop

use std::{fs, path::Path};

use tempfile::tempdir;

use schemascope::DiagramError;
use schemascope_cli::{Args, run};

const SCHEMA: &str = r#"{
    "entities": [
        {"id": "users", "label": "Users", "type": "table",
         "properties": [
            {"name": "id", "type": "uuid", "isPrimary": true},
            {"name": "email", "type": "text", "isRequired": true}
         ]},
        {"id": "posts", "label": "Posts", "type": "table",
         "properties": [{"name": "author_id", "type": "uuid", "isForeign": true}]},
        {"id": "audit", "label": "Audit", "type": "view"}
    ],
    "relationships": [
        {"id": "writes", "source": "users", "target": "posts", "type": "oneToMany", "label": "writes"},
        {"id": "logs", "source": "audit", "target": "events", "type": "reference"}
    ]
}"#;

fn args(input: &Path, output: &Path) -> Args {
    Args {
        input: input.to_string_lossy().to_string(),
        output: output.to_string_lossy().to_string(),
        config: None,
        layout: None,
        width: 1200.0,
        height: 800.0,
        log_level: "off".to_string(),
    }
}

#[test]
fn test_run_writes_svg_for_every_layout() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let input = temp_dir.path().join("schema.json");
    fs::write(&input, SCHEMA).unwrap();

    for layout in ["force", "hierarchical", "circular"] {
        let output = temp_dir.path().join(format!("{layout}.svg"));
        let mut args = args(&input, &output);
        args.layout = Some(layout.to_string());

        let skipped = run(&args).unwrap_or_else(|err| panic!("{layout} failed: {err}"));
        assert_eq!(skipped.len(), 1, "{layout} should skip the dangling relationship");

        let svg = fs::read_to_string(&output).unwrap();
        assert!(svg.starts_with("<svg"), "{layout} output is not an SVG document");
        assert!(svg.contains("Users"));
        assert!(svg.contains("writes"));
    }
}

#[test]
fn test_run_honours_config_file() {
    let temp_dir = tempdir().unwrap();
    let input = temp_dir.path().join("schema.json");
    let output = temp_dir.path().join("out.svg");
    let config = temp_dir.path().join("config.toml");
    fs::write(&input, SCHEMA).unwrap();
    fs::write(&config, "[layout]\nengine = \"spiral\"\n").unwrap();

    let mut args = args(&input, &output);
    args.config = Some(config.to_string_lossy().to_string());

    let result = run(&args);
    assert!(matches!(result, Err(DiagramError::Configuration(_))));
    assert!(!output.exists());
}

#[test]
fn test_run_rejects_malformed_input() {
    let temp_dir = tempdir().unwrap();
    let input = temp_dir.path().join("schema.json");
    let output = temp_dir.path().join("out.svg");
    fs::write(&input, "{\"entities\": 3}").unwrap();

    assert!(matches!(run(&args(&input, &output)), Err(DiagramError::Io(_))));
}

#[test]
fn test_run_rejects_empty_canvas() {
    let temp_dir = tempdir().unwrap();
    let input = temp_dir.path().join("schema.json");
    let output = temp_dir.path().join("out.svg");
    fs::write(&input, SCHEMA).unwrap();

    let mut args = args(&input, &output);
    args.width = 0.0;

    assert!(matches!(run(&args), Err(DiagramError::InvalidContainer(_))));
}
