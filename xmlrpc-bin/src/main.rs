use clap::Parser;
use std::path::PathBuf;
use xmlrpc_bin::{call, run};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "/etc/xmlrpc/config.yaml")]
    config: PathBuf,

    /// Call this method on the configured client endpoint instead of serving
    #[arg(long, value_name = "METHOD")]
    call: Option<String>,

    /// Parameters for --call
    #[arg(requires = "call")]
    params: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    match args.call {
        Some(method) => call(&args.config, &method, &args.params).await,
        None => run(&args.config).await,
    }
}
