// Command-line front-end for oxipatch.
//
// Uses explicit subcommands and long-form options; all diagnostics go to
// stderr and any error class exits nonzero.

use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};

use crate::io::{apply_file, ApplyStats};
use crate::patch::header::{PatchHeader, HEADER_LEN};

// ---------------------------------------------------------------------------
// Clap CLI definition
// ---------------------------------------------------------------------------

/// BSDIFF40 binary patch applier with extent addressing.
#[derive(Parser, Debug)]
#[command(
    name = "oxipatch",
    version,
    about = "BSDIFF40 binary patch applier",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,

    /// Quiet mode (suppress non-error output).
    #[arg(short = 'q', long, global = true)]
    quiet: bool,

    /// Output stats as JSON to stderr.
    #[arg(long = "json", global = true)]
    json_output: bool,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Apply a patch to an old image, producing the new image.
    Apply(ApplyArgs),
    /// Print the declared sizes of a patch header.
    Header(HeaderArgs),
    /// Print build/configuration details.
    Config,
}

#[derive(Args, Debug)]
struct ApplyArgs {
    /// Old image file.
    old: PathBuf,

    /// New image file to produce.
    new: PathBuf,

    /// BSDIFF40 patch file.
    patch: PathBuf,

    /// Extent specification for the old image (`offset:length,...`;
    /// a negative offset marks a sparse run of zeros).
    #[arg(long, value_name = "EXTENTS")]
    old_extents: Option<String>,

    /// Extent specification for the new image. The file is written in
    /// place, without truncation.
    #[arg(long, value_name = "EXTENTS")]
    new_extents: Option<String>,
}

#[derive(Args, Debug)]
struct HeaderArgs {
    /// BSDIFF40 patch file.
    patch: PathBuf,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Runs the CLI; exits the process.
pub fn run() -> ! {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .format_target(false)
        .init();

    let cli = Cli::parse();
    let code = match &cli.command {
        Cmd::Apply(args) => cmd_apply(&cli, args),
        Cmd::Header(args) => cmd_header(&cli, args),
        Cmd::Config => cmd_config(),
    };
    process::exit(code);
}

fn report(err: &dyn std::error::Error) {
    eprintln!("oxipatch: {err}");
    let mut cause = err.source();
    while let Some(e) = cause {
        eprintln!("  caused by: {e}");
        cause = e.source();
    }
}

// ---------------------------------------------------------------------------
// apply
// ---------------------------------------------------------------------------

fn cmd_apply(cli: &Cli, args: &ApplyArgs) -> i32 {
    let stats = match apply_file(
        &args.old,
        &args.new,
        &args.patch,
        args.old_extents.as_deref(),
        args.new_extents.as_deref(),
    ) {
        Ok(stats) => stats,
        Err(e) => {
            report(&e);
            return 1;
        }
    };

    if cli.json_output {
        print_json_stats(&stats);
    } else if !cli.quiet {
        eprintln!(
            "applied: old {} B, patch {} B -> new {} B",
            stats.old_size, stats.patch_size, stats.new_size
        );
        if let Some(digest) = stats.new_sha256 {
            eprintln!("new sha256: {}", hex(&digest));
        }
    }
    0
}

fn print_json_stats(stats: &ApplyStats) {
    let json = serde_json::json!({
        "command": "apply",
        "old_size": stats.old_size,
        "patch_size": stats.patch_size,
        "new_size": stats.new_size,
        "new_sha256": stats.new_sha256.map(|d| hex(&d)),
    });
    eprintln!("{}", serde_json::to_string_pretty(&json).unwrap());
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

// ---------------------------------------------------------------------------
// header
// ---------------------------------------------------------------------------

fn cmd_header(cli: &Cli, args: &HeaderArgs) -> i32 {
    let blob = match std::fs::read(&args.patch) {
        Ok(blob) => blob,
        Err(e) => {
            report(&e);
            return 1;
        }
    };
    let header = match PatchHeader::decode(&blob) {
        Ok(header) => header,
        Err(e) => {
            report(&e);
            return 1;
        }
    };

    if cli.json_output {
        let json = serde_json::json!({
            "command": "header",
            "ctrl_len": header.ctrl_len,
            "diff_len": header.diff_len,
            "new_size": header.new_size,
        });
        eprintln!("{}", serde_json::to_string_pretty(&json).unwrap());
    } else {
        println!("ctrl compressed:  {} B", header.ctrl_len);
        println!("diff compressed:  {} B", header.diff_len);
        println!(
            "extra compressed: {} B",
            (blob.len() as u64).saturating_sub(HEADER_LEN as u64 + header.ctrl_len + header.diff_len)
        );
        println!("new image:        {} B", header.new_size);
    }
    0
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

fn cmd_config() -> i32 {
    let file_io = cfg!(feature = "file-io") as u8;
    eprintln!("VERSION={}", env!("CARGO_PKG_VERSION"));
    eprintln!("MAX_NEW_SIZE={}", crate::patch::apply::MAX_NEW_SIZE);
    eprintln!("FILE_IO={file_io}");
    0
}
