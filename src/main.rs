//! `storefront-translate` server binary.

use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match storefront_translate::run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "storefront-translate failed");
            eprintln!("storefront-translate: {e}");
            ExitCode::FAILURE
        }
    }
}
