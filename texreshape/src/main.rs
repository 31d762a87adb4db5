//! texreshape - reshapes a 256x65536 strip texture into a 4096x4096 atlas
//!
//! Paths not given as flags are read as lines from stdin, input first.

use std::io::{self, BufRead};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use image::ImageFormat;
use texreshape::{Config, Layout, Reshaper};

#[derive(Parser)]
#[command(name = "texreshape")]
#[command(about = "Reshape a 256x65536 strip texture into a 4096x4096 tiled atlas")]
#[command(version)]
struct Cli {
    /// Input strip texture
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output atlas (format inferred from the extension)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format, overriding the extension (e.g. png, tiff, exr)
    #[arg(short, long, value_parser = parse_format)]
    format: Option<ImageFormat>,

    /// Allow writing lossy formats such as JPEG
    #[arg(long)]
    allow_lossy: bool,

    /// Write a JSON report of the tile placements
    #[arg(long)]
    report: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn parse_format(s: &str) -> Result<ImageFormat, String> {
    ImageFormat::from_extension(s).ok_or_else(|| format!("unknown image format '{}'", s))
}

/// Read the next non-empty line from stdin as a path
fn read_path(lines: &mut impl Iterator<Item = io::Result<String>>, what: &str) -> Result<PathBuf> {
    let line = match lines.next() {
        Some(line) => line.with_context(|| format!("Failed to read {} path from stdin", what))?,
        None => bail!("No {} path given on stdin", what),
    };

    // Only the line ending is dropped; spaces can be part of a path
    let line = line.trim_end_matches(&['\r', '\n'][..]);
    if line.is_empty() {
        bail!("Empty {} path", what);
    }
    Ok(PathBuf::from(line))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    let mut lines = io::stdin().lock().lines();
    let input_file = match cli.input {
        Some(path) => path,
        None => read_path(&mut lines, "input")?,
    };
    let output_file = match cli.output {
        Some(path) => path,
        None => read_path(&mut lines, "output")?,
    };

    let config = Config {
        input_file,
        output_file,
        format: cli.format,
        allow_lossy: cli.allow_lossy,
        report_file: cli.report,
        layout: Layout::ATLAS,
    };

    let report = Reshaper::new(config).run()?;
    tracing::info!(
        "Done! {} tiles written ({}x{} {})",
        report.tiles.len(),
        report.width,
        report.height,
        report.color_type
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(input: &str) -> impl Iterator<Item = io::Result<String>> + '_ {
        input.lines().map(|l| Ok(l.to_string()))
    }

    #[test]
    fn reads_paths_in_order() {
        let mut stdin = lines("strips.png\natlas.png\n");
        assert_eq!(read_path(&mut stdin, "input").unwrap(), PathBuf::from("strips.png"));
        assert_eq!(read_path(&mut stdin, "output").unwrap(), PathBuf::from("atlas.png"));
    }

    #[test]
    fn keeps_spaces_in_paths() {
        let mut stdin = [Ok(" my strips.png \r".to_string())].into_iter();
        assert_eq!(
            read_path(&mut stdin, "input").unwrap(),
            PathBuf::from(" my strips.png ")
        );
    }

    #[test]
    fn missing_or_empty_path() {
        let mut stdin = lines("strips.png\n");
        read_path(&mut stdin, "input").unwrap();
        assert!(read_path(&mut stdin, "output").is_err());

        let mut stdin = lines("\n");
        assert!(read_path(&mut stdin, "input").is_err());
    }

    #[test]
    fn format_names() {
        assert_eq!(parse_format("png").unwrap(), ImageFormat::Png);
        assert_eq!(parse_format("exr").unwrap(), ImageFormat::OpenExr);
        assert!(parse_format("psd").is_err());
    }

    #[test]
    fn cli_flags() {
        let cli = Cli::parse_from([
            "texreshape",
            "--input",
            "in.png",
            "-o",
            "out.bin",
            "--format",
            "tiff",
            "--report",
            "report.json",
        ]);
        assert_eq!(cli.input, Some(PathBuf::from("in.png")));
        assert_eq!(cli.output, Some(PathBuf::from("out.bin")));
        assert_eq!(cli.format, Some(ImageFormat::Tiff));
        assert_eq!(cli.report, Some(PathBuf::from("report.json")));
        assert!(!cli.allow_lossy);
    }
}
