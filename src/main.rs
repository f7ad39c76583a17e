//! Binary entrypoint for the `issue-bridge` CLI.

use std::process::ExitCode;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    // Recording is handled in commands::dispatch via ISSUE_BRIDGE_RECORD=<file>.
    match issue_bridge::run(std::env::args()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
