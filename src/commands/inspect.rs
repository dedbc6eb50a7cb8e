use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use a11ysnap_lib::{InspectOutput, SnapError, SnapOutput, Snapshot};

use crate::cli::OutputFormat;
use crate::formatting::{render_error, write_output};

/// Run the inspect command.
pub fn run_inspect(snapshot_path: PathBuf, format: OutputFormat, output: Option<PathBuf>) -> ExitCode {
    let source = snapshot_path.display().to_string();
    let snapshot = match load_snapshot(&snapshot_path) {
        Ok(snapshot) => snapshot,
        Err(err) => return render_error(err, Some(&source), format, output),
    };

    let body = SnapOutput::Inspect(InspectOutput::from_snapshot(source.clone(), &snapshot));
    if let Err(err) = write_output(&body, format, output.as_deref()) {
        return render_error(err, Some(&source), format, output);
    }
    ExitCode::SUCCESS
}

fn load_snapshot(path: &std::path::Path) -> Result<Snapshot, SnapError> {
    let content = fs::read_to_string(path)?;
    Ok(Snapshot::from_json(&content)?)
}
