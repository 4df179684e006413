mod app;

use std::process::ExitCode;

fn main() -> ExitCode {
    match app::build_app() {
        Ok(wiring) => app::run(wiring),
        Err(message) => {
            tracing::error!(error = %message, "startup_failed");
            ExitCode::FAILURE
        }
    }
}
