use clap::Parser;
use fuel_price::dashboard::{Dashboard, serve};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fuel-dashboard")]
#[command(about = "Fuel Price Box Plot")]
struct Args {
    /// Path to the CSV file containing fuel price data
    csv_file: PathBuf,

    #[arg(long, default_value = "0.0.0.0")]
    bind: String,

    #[arg(short, long, default_value_t = 8050)]
    port: u16,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("INFO"));

    let args = Args::parse();

    if !args.csv_file.is_file() {
        log::warn!("{} does not exist yet", args.csv_file.display());
    }

    serve(Dashboard::new(args.csv_file), &args.bind, args.port).await
}
