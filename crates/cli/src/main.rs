//! CLI tool for converting between PDF, Markdown decks and slide layouts.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use deck_core::{parse, serialize, Deck};
use deck_pdf::PdfExtractor;
use deck_pptx::{DeckRenderer, LayoutMapping, RenderPlan, StyleConfig, TemplateCatalog};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Directory name for extracted images, next to the Markdown output.
const DEFAULT_IMAGE_DIR: &str = "extracted_images";

/// Convert slide decks between PDF, Markdown and template layouts.
#[derive(Parser, Debug)]
#[command(name = "deck-convert")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract a PDF into a Markdown deck
    Extract {
        /// Input PDF file
        input: PathBuf,

        /// Output Markdown file (default: input name with .md)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Directory for extracted images (default: extracted_images next to the output)
        #[arg(long)]
        images: Option<PathBuf>,
    },

    /// Parse a Markdown deck and print it as JSON
    Parse {
        /// Input Markdown file
        input: PathBuf,

        /// Write JSON to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Rewrite a Markdown deck in canonical form
    Format {
        /// Input Markdown file
        input: PathBuf,

        /// Output file (default: print to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the layouts and placeholders of a .pptx template
    Layouts {
        /// Template file
        template: PathBuf,

        /// Print the catalog as JSON
        #[arg(long)]
        json: bool,
    },

    /// Map a Markdown deck onto a template and write the render plan as JSON
    Plan {
        /// Input Markdown file
        input: PathBuf,

        /// Template file
        #[arg(short, long)]
        template: PathBuf,

        /// JSON file mapping slide types to layout indexes or names
        #[arg(short, long)]
        mapping: Option<PathBuf>,

        /// JSON file with fonts and colors
        #[arg(short, long)]
        styles: Option<PathBuf>,

        /// Output plan file
        #[arg(short, long, default_value = "plan.json")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    match &args.command {
        Command::Extract {
            input,
            output,
            images,
        } => extract(input, output.as_deref(), images.as_deref(), args.verbose),
        Command::Parse { input, output } => {
            let deck = read_deck(input)?;
            let json = serde_json::to_string_pretty(&deck).context("Failed to encode deck")?;
            emit(output.as_deref(), &json)
        }
        Command::Format { input, output } => {
            let deck = read_deck(input)?;
            emit(output.as_deref(), &serialize(&deck))
        }
        Command::Layouts { template, json } => layouts(template, *json),
        Command::Plan {
            input,
            template,
            mapping,
            styles,
            output,
        } => plan(
            input,
            template,
            mapping.as_deref(),
            styles.as_deref(),
            output,
            args.verbose,
        ),
    }
}

/// Extract a PDF into Markdown plus an image directory.
fn extract(input: &Path, output: Option<&Path>, images: Option<&Path>, verbose: bool) -> Result<()> {
    let output_path = match output {
        Some(path) => path.to_path_buf(),
        None => get_output_path(input, "md"),
    };
    let image_dir = match images {
        Some(dir) => dir.to_path_buf(),
        None => output_path
            .parent()
            .map(|p| p.join(DEFAULT_IMAGE_DIR))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_IMAGE_DIR)),
    };

    if verbose {
        eprintln!("Processing: {}", input.display());
    }
    log::debug!("Writing images to {}", image_dir.display());

    let deck = PdfExtractor::new(&image_dir)
        .extract(input)
        .with_context(|| format!("Failed to extract {}", input.display()))?;

    if verbose {
        eprintln!("  Found {} slides", deck.slides.len());
    }

    write_output(&output_path, &serialize(&deck))?;
    if verbose {
        eprintln!("Written to: {}", output_path.display());
    }

    Ok(())
}

/// List template layouts.
fn layouts(template: &Path, json: bool) -> Result<()> {
    let catalog = TemplateCatalog::open(template)
        .with_context(|| format!("Failed to read template {}", template.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&catalog)?);
        return Ok(());
    }

    println!(
        "Slide size: {} x {} EMU",
        catalog.slide_width, catalog.slide_height
    );
    for layout in &catalog.layouts {
        println!("[{}] {}", layout.index, layout.name);
        for placeholder in &layout.placeholders {
            println!(
                "    idx={} type={} name={}",
                placeholder.idx,
                placeholder.kind.as_deref().unwrap_or("-"),
                placeholder.name
            );
        }
    }

    Ok(())
}

/// Render a Markdown deck into a plan file.
fn plan(
    input: &Path,
    template: &Path,
    mapping: Option<&Path>,
    styles: Option<&Path>,
    output: &Path,
    verbose: bool,
) -> Result<()> {
    let deck = read_deck(input)?;
    let catalog = TemplateCatalog::open(template)
        .with_context(|| format!("Failed to read template {}", template.display()))?;

    let mapping = match mapping {
        Some(path) => LayoutMapping::load(path)
            .with_context(|| format!("Failed to read layout mapping {}", path.display()))?,
        None => LayoutMapping::default(),
    };
    let styles = match styles {
        Some(path) => StyleConfig::load(path)
            .with_context(|| format!("Failed to read styles {}", path.display()))?,
        None => StyleConfig::default(),
    };

    let mut renderer = RenderPlan::new(catalog);
    let summary = DeckRenderer::new()
        .with_mapping(mapping)
        .with_styles(styles)
        .render(&deck, &mut renderer, output)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    if verbose {
        eprintln!(
            "Rendered {} slides ({} skipped, {} units skipped) to {}",
            summary.slides_rendered,
            summary.slides_skipped,
            summary.units_skipped,
            output.display()
        );
    }

    Ok(())
}

/// Read and parse a Markdown deck.
fn read_deck(input: &Path) -> Result<Deck> {
    let markdown = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to open {}", input.display()))?;
    Ok(parse(&markdown))
}

/// Write to `output`, or print to stdout when no path is given.
fn emit(output: Option<&Path>, content: &str) -> Result<()> {
    match output {
        Some(path) => write_output(path, content),
        None => {
            print!("{}", content);
            Ok(())
        }
    }
}

/// Output path next to the input, with a new extension.
fn get_output_path(input_path: &Path, extension: &str) -> PathBuf {
    let stem = input_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");

    let output_filename = format!("{}.{}", stem, extension);

    match input_path.parent() {
        Some(parent) => parent.join(output_filename),
        None => PathBuf::from(output_filename),
    }
}

/// Write output to a file, creating its directory.
fn write_output(path: &Path, content: &str) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
    }

    let mut file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;

    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write to {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_output_path() {
        assert_eq!(
            get_output_path(Path::new("decks/report.pdf"), "md"),
            PathBuf::from("decks/report.md")
        );
        assert_eq!(get_output_path(Path::new("report.pdf"), "md"), PathBuf::from("report.md"));
    }

    #[test]
    fn test_parse_subcommands() {
        let args = Args::try_parse_from(["deck-convert", "plan", "deck.md", "-t", "t.pptx", "-v"]).unwrap();
        assert!(args.verbose);
        match args.command {
            Command::Plan { template, output, mapping, styles, .. } => {
                assert_eq!(template, PathBuf::from("t.pptx"));
                assert_eq!(output, PathBuf::from("plan.json"));
                assert!(mapping.is_none());
                assert!(styles.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }

        let args = Args::try_parse_from(["deck-convert", "plan", "deck.md", "-t", "t.pptx", "-s", "brand.json"])
            .unwrap();
        match args.command {
            Command::Plan { styles, .. } => assert_eq!(styles, Some(PathBuf::from("brand.json"))),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_read_deck() {
        let dir = tempfile::tempdir().unwrap();
        let md = dir.path().join("deck.md");
        write_output(&md, "# Hello\n## World\n").unwrap();

        let deck = read_deck(&md).unwrap();
        assert_eq!(deck.slides[0].title.as_deref(), Some("Hello"));
        assert!(read_deck(&dir.path().join("missing.md")).is_err());
    }
}
