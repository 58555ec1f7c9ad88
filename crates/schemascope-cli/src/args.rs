//! Command-line argument definitions for the Schemascope CLI.
//!
//! This module defines the [`Args`] structure parsed from the command line
//! using [`clap`]. Arguments control input/output paths, the layout engine,
//! the canvas size, configuration file selection, and logging verbosity.

use clap::Parser;

/// Command-line arguments for the Schemascope diagram tool
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input JSON file with `entities` and `relationships`
    #[arg(help = "Path to the input file")]
    pub input: String,

    /// Path to the output SVG file
    #[arg(short, long, default_value = "out.svg")]
    pub output: String,

    /// Path to configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Layout engine (force, hierarchical, circular); defaults to the configured one
    #[arg(short, long)]
    pub layout: Option<String>,

    /// Canvas width in pixels
    #[arg(long, default_value_t = 1200.0)]
    pub width: f32,

    /// Canvas height in pixels
    #[arg(long, default_value_t = 800.0)]
    pub height: f32,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["schemascope", "schema.json"]);
        assert_eq!(args.input, "schema.json");
        assert_eq!(args.output, "out.svg");
        assert_eq!(args.layout, None);
        assert_eq!(args.width, 1200.0);
        assert_eq!(args.log_level, "info");
    }

    #[test]
    fn test_layout_and_canvas() {
        let args = Args::parse_from([
            "schemascope",
            "schema.json",
            "--layout",
            "force",
            "--width",
            "640",
            "--height",
            "480",
        ]);
        assert_eq!(args.layout.as_deref(), Some("force"));
        assert_eq!(args.width, 640.0);
        assert_eq!(args.height, 480.0);
    }
}
