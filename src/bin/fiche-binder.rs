//! Fiche Binder CLI tool
//!
//! Builds a binder PDF from a JSON request file and inspects PDF documents.

use std::io::Read;
use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::{Parser, Subcommand};

use fiche_binder::{bind, BinderConfig, BinderRequest, BinderResponse, OverflowPolicy};

/// Fiche Binder - assemble fiche PDFs into a single binder
#[derive(Parser)]
#[command(name = "fiche-binder")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    # Build a binder from a request file
    fiche-binder build request.json -o binder.pdf

    # Read the request from stdin and print the JSON response envelope
    cat request.json | fiche-binder build - -o binder.pdf --json

    # Use a specific TrueType face and show \"Page X of N\" footers
    fiche-binder build request.json -o binder.pdf --font Poppins-SemiBold.ttf --page-total

    # Show information about a PDF file
    fiche-binder info binder.pdf")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a binder from a JSON request
    Build {
        /// Request JSON file ("-" reads stdin)
        request: PathBuf,

        /// Output PDF file path
        #[arg(short, long)]
        output: PathBuf,

        /// TrueType face for the summary and the stamps (built-in Helvetica
        /// when omitted or unreadable)
        #[arg(long)]
        font: Option<PathBuf>,

        /// Show "Page X of N" in the footer instead of the bare page number
        #[arg(long)]
        page_total: bool,

        /// Centered footer note on every stamped page
        #[arg(long)]
        footer_note: Option<String>,

        /// Fail the build when summary entries exceed the reserved pages
        /// (default: drop the surplus entries and warn)
        #[arg(long)]
        strict_summary: bool,

        /// Print the JSON response envelope (base64 PDF + counts) to stdout
        #[arg(long)]
        json: bool,
    },

    /// Show information about a PDF file
    Info {
        /// PDF file to inspect
        input: PathBuf,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Build {
            request,
            output,
            font,
            page_total,
            footer_note,
            strict_summary,
            json,
        } => cmd_build(
            request,
            output,
            font,
            page_total,
            footer_note,
            strict_summary,
            json,
        ),
        Commands::Info { input } => cmd_info(input),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

/// Read the request JSON from a file, or from stdin for "-"
fn read_request(path: &PathBuf) -> anyhow::Result<BinderRequest> {
    let text = if path.as_os_str() == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("reading request from stdin")?;
        buffer
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("reading request file {}", path.display()))?
    };
    serde_json::from_str(&text).context("parsing request JSON")
}

fn cmd_build(
    request_path: PathBuf,
    output: PathBuf,
    font: Option<PathBuf>,
    page_total: bool,
    footer_note: Option<String>,
    strict_summary: bool,
    json: bool,
) -> anyhow::Result<()> {
    let request = read_request(&request_path)?;

    let config = BinderConfig {
        font_path: font,
        show_page_total: page_total,
        footer_note,
        overflow: if strict_summary {
            OverflowPolicy::Reject
        } else {
            OverflowPolicy::Truncate
        },
        ..BinderConfig::default()
    };

    eprintln!("Binding {} fiches...", request.fiches.len());
    let result = bind(&request, &config).context("building the binder")?;

    std::fs::write(&output, &result.pdf)
        .with_context(|| format!("writing {}", output.display()))?;
    eprintln!(
        "Bound {} fiches into {} pages: {}",
        result.fiches_count,
        result.total_pages,
        output.display()
    );

    if json {
        let response =
            BinderResponse::new(&result.pdf, result.total_pages, result.fiches_count);
        println!("{}", serde_json::to_string(&response)?);
    }

    Ok(())
}

fn cmd_info(input: PathBuf) -> anyhow::Result<()> {
    let metadata = fiche_binder::pdf::inspect_file(&input)
        .with_context(|| format!("inspecting {}", input.display()))?;

    println!("File: {}", input.display());
    println!("Pages: {}", metadata.page_count);
    if let Some(title) = metadata.title {
        println!("Title: {}", title);
    }
    if let Some(author) = metadata.author {
        println!("Author: {}", author);
    }

    Ok(())
}
