//! Schemascope CLI library
//!
//! Reads entities and relationships from a JSON file, lays them out,
//! renders them and writes the SVG document.

pub mod error_adapter;

mod args;
mod config;
mod input;

pub use args::Args;
pub use input::{DiagramInput, parse_input};

use std::{fs, rc::Rc};

use log::{info, warn};

use schemascope::{
    Container, DiagramApi, DiagramError, DiagramOptions, config::AppConfig,
    error::MissingEntity, geometry::Size,
};

/// Id of the container the CLI renders into.
const CONTAINER_ID: &str = "schemascope-cli";

/// Run the Schemascope CLI application
///
/// Loads the configuration, renders the input file and writes the SVG to
/// the output file. Relationships that reference missing entities do not
/// fail the run; they are returned so the caller can report them.
///
/// # Errors
///
/// Returns `DiagramError` for:
/// - File I/O errors and malformed input
/// - Configuration loading errors
/// - Unknown layout names
/// - Empty canvas sizes
pub fn run(args: &Args) -> Result<Vec<MissingEntity>, DiagramError> {
    info!(
        input_path = args.input,
        output_path = args.output;
        "Processing diagram"
    );

    let app_config = config::load_config(args.config.as_ref())?;

    let source = fs::read_to_string(&args.input)?;
    let input = parse_input(&source)?;

    let runtime = tokio::runtime::Builder::new_current_thread().build()?;
    let (svg, skipped) = runtime.block_on(render(app_config, input, args))?;

    fs::write(&args.output, svg)?;

    for missing in &skipped {
        warn!(
            relationship:% = missing.relationship,
            entity:% = missing.entity;
            "Relationship skipped"
        );
    }
    info!(output_file = args.output, skipped = skipped.len(); "SVG exported successfully");

    Ok(skipped)
}

async fn render(
    config: AppConfig,
    input: DiagramInput,
    args: &Args,
) -> Result<(String, Vec<MissingEntity>), DiagramError> {
    let api = DiagramApi::new(config)?;
    let container = Rc::new(Container::new(CONTAINER_ID, Size::new(args.width, args.height)));
    let options = DiagramOptions {
        layout: args.layout.clone(),
        ..DiagramOptions::default()
    };

    let controller = api
        .generate_diagram(container, input.entities, input.relationships, options)
        .await?;
    let svg = controller.svg()?;
    let skipped = controller.diagnostics()?;
    controller.destroy();

    Ok((svg, skipped))
}
