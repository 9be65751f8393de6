use clap::ValueEnum;
use std::fmt;

/// Fuel grades understood by the price API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FuelType {
    #[value(name = "E10")]
    E10,
    #[value(name = "91")]
    Unleaded91,
    #[value(name = "95")]
    Premium95,
    #[value(name = "98")]
    Premium98,
    #[value(name = "Diesel")]
    Diesel,
    #[value(name = "LPG")]
    Lpg,
}

impl FuelType {
    /// Code sent as the `fueltype` query parameter.
    pub fn code(&self) -> &'static str {
        match self {
            FuelType::E10 => "40",
            FuelType::Unleaded91 => "37",
            FuelType::Premium95 => "38",
            FuelType::Premium98 => "39",
            FuelType::Diesel => "1",
            FuelType::Lpg => "41",
        }
    }
}

impl fmt::Display for FuelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FuelType::E10 => "E10",
            FuelType::Unleaded91 => "91",
            FuelType::Premium95 => "95",
            FuelType::Premium98 => "98",
            FuelType::Diesel => "Diesel",
            FuelType::Lpg => "LPG",
        };
        f.write_str(name)
    }
}

/// One fetch result: timestamp plus station prices in cents, in API order.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub timestamp: String,
    pub prices: Vec<f64>,
}

impl Reading {
    pub fn new(timestamp: impl Into<String>, prices: Vec<f64>) -> Self {
        Self {
            timestamp: timestamp.into(),
            prices,
        }
    }

    /// `timestamp,price1,price2,...`
    pub fn to_line(&self) -> String {
        let mut line = self.timestamp.clone();
        for price in &self.prices {
            line.push(',');
            line.push_str(&price.to_string());
        }
        line
    }
}
