use crate::driver::{ArtifactSubmission, HttpEndpoint, UploadDriver, PDF_MIME};
use crate::model::{ArtifactType, Branch, SessionReceipt, UploadEvent};
use crate::wizard::{DetailsInput, SelectionInput, Wizard};
use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio::time::Duration;

const DEFAULT_ENDPOINT_URL: &str =
    "https://script.google.com/macros/s/AKfycbwEQqc4VzxmwmvHC5ggjIGyAqO0EzO9JxivppqQYcg3bNqfSoHAO3iaTmqeRJb90sCgrg/exec";

/// Output line routing for the stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

/// One `--file <artifact>=<path>` argument.
#[derive(Debug, Clone)]
pub struct FileArg {
    pub artifact: ArtifactType,
    pub path: PathBuf,
}

fn parse_file_arg(raw: &str) -> Result<FileArg, String> {
    let (artifact, path) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected <artifact>=<path>, got '{raw}'"))?;
    let artifact = ArtifactType::from_str(artifact, true)
        .map_err(|_| format!("unknown artifact type '{artifact}'"))?;
    if path.is_empty() {
        return Err(format!("missing path for artifact '{artifact}'"));
    }
    Ok(FileArg {
        artifact,
        path: PathBuf::from(path),
    })
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "pyq-uploader",
    version,
    about = "Upload PYQ paper PDFs to the collection endpoint through a guided wizard"
)]
pub struct Cli {
    /// Your name (letters only, at most 20 characters)
    #[arg(long)]
    pub name: String,

    /// Branch of the papers being uploaded
    #[arg(long, value_enum)]
    pub branch: Branch,

    /// Academic year recorded in the filename
    #[arg(long)]
    pub year: String,

    /// Semester of the papers being uploaded
    #[arg(long)]
    pub sem: String,

    /// Artifact types to upload, at most 3 (repeatable)
    #[arg(long = "select", value_enum, required = true)]
    pub selections: Vec<ArtifactType>,

    /// Subject name, required with `--select subject`
    #[arg(long)]
    pub subject_name: Option<String>,

    /// Resources name, required with `--select resources`
    #[arg(long)]
    pub resources_name: Option<String>,

    /// PDF for an artifact type, as `<artifact>=<path>` (repeatable)
    #[arg(long = "file", value_parser = parse_file_arg)]
    pub files: Vec<FileArg>,

    /// Upload endpoint URL
    #[arg(long, default_value = DEFAULT_ENDPOINT_URL)]
    pub endpoint_url: String,

    /// Pause after each confirmed upload
    #[arg(long, default_value = "1200ms")]
    pub confirm_delay: humantime::Duration,

    /// Write a JSON receipt for the session
    #[arg(long)]
    pub export_json: Option<PathBuf>,

    /// Suppress progress output
    #[arg(long)]
    pub quiet: bool,
}

/// Infer the submission media type from the file extension. The driver
/// rejects anything that is not a PDF.
fn mime_for_path(path: &std::path::Path) -> String {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("pdf") => PDF_MIME.to_string(),
        _ => "application/octet-stream".to_string(),
    }
}

pub async fn run(args: Cli) -> Result<()> {
    // Drive the wizard gates from the arguments; a validation failure here is
    // the same user error the interactive form would surface.
    let mut wizard = Wizard::new();
    wizard.submit_details(DetailsInput {
        name: args.name.clone(),
        branch: Some(args.branch),
        year: args.year.clone(),
    })?;
    wizard.submit_selection(SelectionInput {
        sem: Some(args.sem.clone()),
        selections: args.selections.iter().copied().collect(),
        subject_name: args.subject_name.clone(),
        resources_name: args.resources_name.clone(),
    })?;
    let (details, queue) = wizard
        .into_handoff()
        .context("wizard did not reach the upload step")?;

    let mut files: HashMap<ArtifactType, PathBuf> = HashMap::new();
    for arg in &args.files {
        if files.insert(arg.artifact, arg.path.clone()).is_some() {
            bail!("duplicate --file for artifact '{}'", arg.artifact);
        }
    }
    for artifact in queue.iter() {
        if !files.contains_key(&artifact) {
            bail!("no --file given for selected artifact '{artifact}'");
        }
    }
    let queue_len = queue.len();

    let endpoint = HttpEndpoint::new(&args.endpoint_url)?;
    let driver = UploadDriver::new(endpoint, details.clone(), queue)
        .with_confirm_delay(Duration::from(args.confirm_delay));

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<UploadEvent>();
    let (sub_tx, sub_rx) = mpsc::unbounded_channel::<ArtifactSubmission>();
    let handle = tokio::spawn(async move { driver.run(event_tx, sub_rx).await });

    let (out_tx, out_handle) = spawn_output_writer();
    // Dropping the submission sender tells the driver the session is over;
    // held in an Option so a failure can end it early.
    let mut sub_tx = Some(sub_tx);
    let mut last_whole_percent = -1_i64;

    while let Some(ev) = event_rx.recv().await {
        match ev {
            UploadEvent::PromptForArtifact { artifact } => {
                if let Some(tx) = sub_tx.as_ref() {
                    let path = files
                        .get(&artifact)
                        .expect("prompted for an artifact that was never selected")
                        .clone();
                    let _ = out_tx.send(OutputLine::Stderr(format!(
                        "Uploading your {} file. Please wait...",
                        artifact.prompt_label(&details)
                    )));
                    last_whole_percent = -1;
                    let mime_type = mime_for_path(&path);
                    let _ = tx.send(ArtifactSubmission { path, mime_type });
                }
            }
            UploadEvent::Progress { percent, .. } => {
                let whole = percent.round() as i64;
                if !args.quiet && whole > last_whole_percent {
                    last_whole_percent = whole;
                    let _ = out_tx.send(OutputLine::Stderr(format!("{whole}%")));
                }
            }
            UploadEvent::ItemConfirmed {
                artifact,
                file_name,
                is_last,
            } => {
                let _ = out_tx.send(OutputLine::Stderr(format!(
                    "Your {} file has been uploaded successfully as {}",
                    artifact.prompt_label(&details),
                    file_name
                )));
                if !is_last {
                    let _ = out_tx.send(OutputLine::Stderr("Next file...".to_string()));
                }
            }
            UploadEvent::ItemFailed { message, .. } => {
                let _ = out_tx.send(OutputLine::Stderr(message));
                // Non-interactive: a failure ends the session instead of
                // retrying the position.
                sub_tx = None;
            }
            UploadEvent::AllComplete => {
                let _ = out_tx.send(OutputLine::Stdout(
                    "All files uploaded successfully!".to_string(),
                ));
            }
        }
    }

    let receipt = handle
        .await
        .context("upload driver task failed")?
        .context("upload session aborted")?;

    if let Some(path) = args.export_json.as_deref() {
        export_receipt(path, &receipt)?;
        let _ = out_tx.send(OutputLine::Stderr(format!("Saved: {}", path.display())));
    }

    drop(out_tx);
    let _ = out_handle.await;

    if receipt.items.len() < queue_len {
        bail!(
            "upload session did not complete: {} of {} files uploaded",
            receipt.items.len(),
            queue_len
        );
    }
    Ok(())
}

fn export_receipt(path: &std::path::Path, receipt: &SessionReceipt) -> Result<()> {
    let json = serde_json::to_string_pretty(receipt)?;
    std::fs::write(path, json)
        .with_context(|| format!("failed to write receipt to {}", path.display()))?;
    Ok(())
}
