//! Command-line front end for docsift.
//!
//! `docsift <path>` prints the full text of every extracted content
//! object; `--json` emits the tagged serialization and `--json-unit`
//! the flattened unit list. Binary payloads are omitted unless
//! `--binary` is given alongside a JSON mode.

use clap::Parser;
use clap::error::ErrorKind;
use docsift::{Content, serialize, serialize_units};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "docsift",
    about = "Extract file content and emit full text to stdout (or JSON with --json)."
)]
struct Cli {
    /// Path to the file to extract.
    path: PathBuf,

    /// Emit structured JSON instead of plain full text (omits binary
    /// payloads by default).
    #[arg(long)]
    json: bool,

    /// Emit a JSON array of unit objects (pages/slides/sheets/…).
    #[arg(long = "json-unit")]
    json_unit: bool,

    /// With --json/--json-unit, include binary payloads as base64 blobs.
    #[arg(long)]
    binary: bool,
}

fn main() {
    std::process::exit(run());
}

fn run() -> i32 {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if e.kind() == ErrorKind::UnknownArgument => {
            eprintln!("docsift: warning: unsupported arguments");
            return 1;
        }
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            return 0;
        }
        Err(e) => {
            eprintln!("docsift: {e}");
            return 1;
        }
    };

    match execute(&cli) {
        Ok(output) => {
            println!("{output}");
            0
        }
        Err(message) => {
            eprintln!("docsift: {message}");
            1
        }
    }
}

fn execute(cli: &Cli) -> Result<String, String> {
    if cli.binary && !cli.json && !cli.json_unit {
        return Err("--binary requires --json or --json-unit".to_string());
    }

    let results = docsift::extract(&cli.path).map_err(|e| e.to_string())?;
    if results.is_empty() {
        return Err(format!("No extraction results for {}", cli.path.display()));
    }

    if cli.json {
        let values: Vec<serde_json::Value> = results.iter().map(|c| serialize(c, cli.binary)).collect();
        let payload = if values.len() == 1 {
            values.into_iter().next().expect("one value")
        } else {
            serde_json::Value::Array(values)
        };
        return serde_json::to_string(&payload).map_err(|e| e.to_string());
    }

    if cli.json_unit {
        let mut units = Vec::new();
        for content in &results {
            if let serde_json::Value::Array(items) = serialize_units(content) {
                units.extend(items);
            }
        }
        return serde_json::to_string(&serde_json::Value::Array(units)).map_err(|e| e.to_string());
    }

    Ok(results
        .iter()
        .map(|content| content.full_text().trim_end().to_string())
        .collect::<Vec<_>>()
        .join("\n\n")
        .trim_end()
        .to_string())
}
