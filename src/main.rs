// src/main.rs

use adminagent::{cli, run};

#[tokio::main]
async fn main() {
    if let Err(err) = run(cli::parse()).await {
        eprintln!("adminagent error: {err:?}");
        std::process::exit(1);
    }
}
