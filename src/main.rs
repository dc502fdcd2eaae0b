//! geocollect CLI entry point
//!
//! Device position collector - CLI + collection server

use geocollect::cli;

#[tokio::main]
async fn main() {
    if let Err(e) = cli::run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
