use crate::fetcher::{DEFAULT_ENDPOINT, PriceRequest};
use crate::model::FuelType;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "UPPER")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    pub fn filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warning => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// timestamp,count,min,max,mean,stddev
    Stats,
    /// timestamp,price1,price2,...
    Raw,
}

#[derive(Debug, Parser)]
#[command(name = "fuel-price")]
#[command(about = "Get fuel price from RACQ")]
pub struct Args {
    /// Fuel type
    pub fuel_type: FuelType,

    /// Latitude
    #[arg(allow_negative_numbers = true)]
    pub lat: String,

    /// Longitude
    #[arg(allow_negative_numbers = true)]
    pub lon: String,

    /// Log level
    #[arg(short, long, value_enum, default_value = "ERROR")]
    pub log: LogLevel,

    /// Output format: statistics only, or raw prices
    #[arg(short, long, value_enum, default_value = "stats")]
    pub output: OutputFormat,

    /// Directory holding the price log and snapshots; enables change detection
    #[arg(long, env = "FUEL_PRICE_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Incoming webhook notified when prices go up
    #[arg(long, env = "FUEL_PRICE_WEBHOOK_URL")]
    pub webhook_url: Option<String>,

    #[arg(long, env = "FUEL_PRICE_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,
}

impl Args {
    pub fn request(&self) -> PriceRequest {
        PriceRequest::new(self.fuel_type, self.lat.clone(), self.lon.clone())
    }
}
