use std::process::ExitCode;

use shopper::app::{bootstrap, loop_runner};
use tracing::error;

fn main() -> ExitCode {
    match bootstrap::build_app() {
        Ok(app) => loop_runner::run(app),
        Err(err) => {
            error!(error = %err, "startup_failed");
            ExitCode::FAILURE
        }
    }
}
