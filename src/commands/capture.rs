use std::path::{Path, PathBuf};
use std::process::ExitCode;

use a11ysnap_lib::progress::stderr_progress;
use a11ysnap_lib::{
    capture_with_timeout, parse_resource, BrowserManager, HtmlPage, ResourceKind, SnapError,
    Snapshot,
};
use tracing::info;

use crate::cli::CaptureArgs;
use crate::formatting::{render_error, write_snapshot};
use crate::settings::{
    format_effective_config, load_config, resolve_capture_settings, validate_capture_settings,
    CaptureFlagSources, ResolvedCaptureSettings,
};

/// Run the capture command.
pub async fn run_capture(
    raw_args: &[String],
    config_path: Option<PathBuf>,
    verbose: bool,
    args: CaptureArgs,
) -> ExitCode {
    let format = args.format;
    let output = args.output.clone();

    let input = args.input.as_str();

    let config = match load_config(config_path.as_deref()) {
        Ok(cfg) => cfg,
        Err(err) => return render_error(err, Some(input), format, output),
    };
    let flags = CaptureFlagSources::from_args(raw_args);
    let mut settings = resolve_capture_settings(&args, &config, &flags);
    if let Err(err) = validate_capture_settings(&settings) {
        return render_error(err, Some(input), format, output);
    }
    if verbose {
        settings.browser.progress = Some(stderr_progress());
        eprintln!(
            "{}",
            format_effective_config(&settings, config_path.as_deref())
        );
    }

    let resource = match parse_resource(input, args.input_type.map(Into::into)) {
        Ok(res) => res,
        Err(err) => return render_error(err.into(), Some(input), format, output),
    };
    let source = Some(resource.value.as_str());

    let snapshot = match capture_resource(resource.kind, &resource.value, &settings).await {
        Ok(snapshot) => snapshot,
        Err(err) => return render_error(err, source, format, output),
    };

    if let Err(err) = write_snapshot(&snapshot, format, output.as_deref()) {
        return render_error(err, source, format, output);
    }
    if let Some(path) = &output {
        info!(path = %path.display(), "snapshot written");
        if verbose {
            eprintln!("Snapshot written to {}", path.display());
        }
    }
    ExitCode::SUCCESS
}

async fn capture_resource(
    kind: ResourceKind,
    value: &str,
    settings: &ResolvedCaptureSettings,
) -> Result<Snapshot, SnapError> {
    match kind {
        ResourceKind::Url => {
            let manager = BrowserManager::new(settings.browser.clone());
            manager
                .capture_url(value, &settings.capture, Some(settings.capture_timeout))
                .await
        }
        ResourceKind::Html => {
            let page = HtmlPage::from_file(Path::new(value))?;
            let snapshot =
                capture_with_timeout(&page, &settings.capture, settings.capture_timeout).await?;
            Ok(snapshot)
        }
    }
}
