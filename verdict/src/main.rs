use verdict::{cli, ExitCode};
use verdict_tracing::{init_tracing_subscriber, println_red_err, LogOptions};

#[tokio::main]
async fn main() {
    let code = match cli::run_cli().await {
        Ok(code) => code,
        Err(err) => {
            // Errors can surface before the command has set up logging.
            init_tracing_subscriber(LogOptions::default());
            println_red_err(&format!("Error: {err:?}"));
            ExitCode::Usage
        }
    };
    std::process::exit(code.code());
}
