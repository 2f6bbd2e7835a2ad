use crate::{cli::ListCommand, ExitCode};
use anyhow::Result;
use tracing::info;
use verdict_tracing::{
    init_tracing_subscriber, println_green, println_red, println_yellow, LogOptions,
};

pub fn list(command: ListCommand) -> Result<ExitCode> {
    let (cwd, config) = super::load_config(&command.fixtures)?;
    init_tracing_subscriber(LogOptions::default());
    let loaded = super::load_fixtures(&command.fixtures, config.as_ref(), &cwd)?;

    let mut failed = 0;
    for fixture in &loaded {
        match fixture {
            Ok(case) => {
                let source = case
                    .path()
                    .map(|path| format!("  {}", path.display()))
                    .unwrap_or_default();
                info!(
                    "{:<8} {}{}",
                    case.expected().to_string(),
                    case.identifier(),
                    source
                );
            }
            Err(err) => {
                failed += 1;
                println_yellow(&format!("{:<8} {}", "ERROR", err));
            }
        }
    }

    let total = loaded.len();
    if failed == 0 {
        println_green(&format!("{total} fixtures"));
        Ok(ExitCode::Success)
    } else {
        println_red(&format!("{total} fixtures, {failed} failed to load"));
        Ok(ExitCode::Infrastructure)
    }
}
