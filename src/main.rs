use std::process::ExitCode;

use clap::Parser;

use tether::cli::{self, Cli};

#[tokio::main]
async fn main() -> ExitCode {
    tether::harness::init_tracing("info");
    let cli = Cli::parse();

    match cli::execute(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::from(2)
        }
    }
}
