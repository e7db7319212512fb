use wavdiag::{AnalyzerConfig, RecordingLocator};

use anyhow::Context;
use flexi_logger::{Logger, opt_format};

/// Print loudness diagnostics for a recording.
///
/// Takes an optional file name relative to the recordings directory. Without
/// it the latest `mic_*.wav` recording is used.
fn main() -> anyhow::Result<()> {
    // Start as "RUST_LOG=wavdiag=debug analyze_segment <filename>" to show log info
    Logger::with_env_or_str("analyze_segment=warn, wavdiag=warn")
                            .format(opt_format)
                            .start()
                            .context("failed to start logger")?;

    let filename = std::env::args().nth(1);
    let locator = RecordingLocator::from_home()?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match wavdiag::run(&locator, filename.as_deref(), AnalyzerConfig::default(), &mut out) {
        Ok(_) => Ok(()),
        Err(e) if e.is_user_facing() => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
        Err(e) => Err(e).context("analysis failed"),
    }
}
