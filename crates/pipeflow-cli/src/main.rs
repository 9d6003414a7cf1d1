use futures::executor::block_on;
use pipeflow::{
    CoreError, Editor, EditorConfig, FsDocumentStore, LoadReport, MeasuredSizes, SpacingKey,
};
use serde::Serialize;
use std::path::Path;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
enum CliError {
    Usage(&'static str),
    Io(std::io::Error),
    Pipeflow(pipeflow::Error),
    Json(serde_json::Error),
    UnknownTask(String),
    Issues(usize),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Pipeflow(err) => write!(f, "{err}"),
            CliError::Json(err) => write!(f, "JSON error: {err}"),
            CliError::UnknownTask(id) => write!(f, "no task named `{id}`"),
            CliError::Issues(n) => write!(f, "document has {n} issue(s)"),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<pipeflow::Error> for CliError {
    fn from(value: pipeflow::Error) -> Self {
        Self::Pipeflow(value)
    }
}

impl From<CoreError> for CliError {
    fn from(value: CoreError) -> Self {
        Self::Pipeflow(value.into())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Command {
    #[default]
    Check,
    Layout,
    Chain,
    Export,
    Edges,
    Rename,
}

#[derive(Debug, Default)]
struct Args {
    command: Command,
    input: Option<String>,
    pretty: bool,
    spacing: Option<SpacingKey>,
    config: Option<String>,
    root: Option<String>,
    from: Option<String>,
    to: Option<String>,
    out: Option<String>,
}

#[derive(Serialize)]
struct CheckOut<'a> {
    file: &'a str,
    #[serde(flatten)]
    report: &'a LoadReport,
}

#[derive(Serialize)]
struct RenameOut<'a> {
    from: &'a str,
    to: &'a str,
    written: &'a str,
}

fn usage() -> &'static str {
    "pipeflow-cli\n\
\n\
USAGE:\n\
  pipeflow-cli [check] [--pretty] <path>\n\
  pipeflow-cli layout [--spacing compact|normal|loose] [--config <path>] [--pretty] <path>\n\
  pipeflow-cli chain --root <id> [--spacing compact|normal|loose] [--config <path>] [--pretty] <path>\n\
  pipeflow-cli export [--pretty] <path>\n\
  pipeflow-cli edges [--config <path>] [--pretty] <path>\n\
  pipeflow-cli rename --from <id> --to <id> [--out <path>] <path>\n\
\n\
NOTES:\n\
  - check exits with 3 when the document loads with issues.\n\
  - rename rewrites <path> in place unless --out is given.\n\
  - Set PIPEFLOW_LOG (e.g. PIPEFLOW_LOG=debug) to see logs on stderr.\n\
"
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut args = Args::default();

    let mut it = argv.iter().skip(1);
    while let Some(a) = it.next() {
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage())),
            "check" => args.command = Command::Check,
            "layout" => args.command = Command::Layout,
            "chain" => args.command = Command::Chain,
            "export" => args.command = Command::Export,
            "edges" => args.command = Command::Edges,
            "rename" => args.command = Command::Rename,
            "--pretty" => args.pretty = true,
            "--spacing" => {
                let Some(key) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.spacing = Some(
                    key.parse::<SpacingKey>()
                        .map_err(|_| CliError::Usage(usage()))?,
                );
            }
            "--config" => args.config = Some(next_value(&mut it)?),
            "--root" => args.root = Some(next_value(&mut it)?),
            "--from" => args.from = Some(next_value(&mut it)?),
            "--to" => args.to = Some(next_value(&mut it)?),
            "--out" => args.out = Some(next_value(&mut it)?),
            "--" => {
                let Some(rest) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                if args.input.is_some() || it.next().is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some(rest.clone());
            }
            other if other.starts_with('-') => return Err(CliError::Usage(usage())),
            path => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some(path.to_string());
            }
        }
    }

    let complete = args.input.is_some()
        && match args.command {
            Command::Chain => args.root.is_some(),
            Command::Rename => args.from.is_some() && args.to.is_some(),
            _ => true,
        };
    if !complete {
        return Err(CliError::Usage(usage()));
    }
    Ok(args)
}

fn next_value<'a>(it: &mut impl Iterator<Item = &'a String>) -> Result<String, CliError> {
    it.next().cloned().ok_or(CliError::Usage(usage()))
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("PIPEFLOW_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn write_json(value: &impl Serialize, pretty: bool) -> Result<(), CliError> {
    let text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{text}");
    Ok(())
}

/// Splits a document path into the store's `(source directory, file name)` pair.
fn split_path(path: &str) -> Result<(String, String), CliError> {
    let p = Path::new(path);
    let Some(name) = p.file_name().and_then(|n| n.to_str()) else {
        return Err(CliError::Usage(usage()));
    };
    let dir = match p.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_string_lossy().into_owned(),
        _ => ".".to_string(),
    };
    Ok((dir, name.to_string()))
}

fn load_config(args: &Args) -> Result<EditorConfig, CliError> {
    let mut config = match args.config.as_deref() {
        Some(path) => EditorConfig::from_path(path)?,
        None => EditorConfig::default(),
    };
    if let Some(spacing) = args.spacing {
        config.spacing = spacing;
    }
    Ok(config)
}

fn run(args: Args) -> Result<(), CliError> {
    let Some(input) = args.input.as_deref() else {
        return Err(CliError::Usage(usage()));
    };
    let config = load_config(&args)?;
    let (source, filename) = split_path(input)?;
    let (mut editor, report) =
        block_on(Editor::open(FsDocumentStore::new(), source, filename, config))?;

    match args.command {
        Command::Check => {
            write_json(
                &CheckOut {
                    file: input,
                    report: &report,
                },
                args.pretty,
            )?;
            if report.issues.is_empty() {
                Ok(())
            } else {
                Err(CliError::Issues(report.issues.len()))
            }
        }
        Command::Layout => write_json(&editor.model().positions(), args.pretty),
        Command::Chain => {
            let root = args.root.as_deref().unwrap_or_default();
            let Some(chain) = editor.arrange_chain(root, &MeasuredSizes::default()) else {
                return Err(CliError::UnknownTask(root.to_string()));
            };
            write_json(&chain, args.pretty)
        }
        Command::Export => {
            let document = editor.model().export_document();
            if args.pretty {
                print!("{}", document.to_pretty_json()?);
            } else {
                println!("{}", serde_json::to_string(&document.to_value())?);
            }
            Ok(())
        }
        Command::Edges => write_json(&editor.edge_appearances(), args.pretty),
        Command::Rename => {
            let from = args.from.as_deref().unwrap_or_default();
            let to = args.to.as_deref().unwrap_or_default();
            editor.model_mut().rename(from, to)?;
            let written = match args.out.as_deref() {
                Some(out) => {
                    let text = editor.model().export_document().to_pretty_json()?;
                    std::fs::write(out, text)?;
                    out
                }
                None => {
                    block_on(editor.save())?;
                    input
                }
            };
            tracing::info!(%from, %to, %written, "renamed task");
            write_json(&RenameOut { from, to, written }, args.pretty)
        }
    }
}

fn main() {
    let args = match parse_args(&std::env::args().collect::<Vec<_>>()) {
        Ok(v) => v,
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };
    init_logging();

    match run(args) {
        Ok(()) => {}
        Err(err @ CliError::Issues(_)) => {
            eprintln!("{err}");
            std::process::exit(3);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    }
}
