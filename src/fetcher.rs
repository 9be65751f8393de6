use crate::error::{FuelError, Result};
use crate::model::{FuelType, Reading};
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://www.racq.com.au/ajaxPages/fuelprice/FuelPricesapi.ashx";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(3);
const LOGGED_STATIONS: usize = 10;

/// Parameters for one price lookup. Built per call, never shared between runs.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceRequest {
    pub fuel_type: FuelType,
    pub lat: String,
    pub lon: String,
}

impl PriceRequest {
    pub fn new(fuel_type: FuelType, lat: impl Into<String>, lon: impl Into<String>) -> Self {
        Self {
            fuel_type,
            lat: lat.into(),
            lon: lon.into(),
        }
    }

    pub fn query(&self) -> [(&'static str, &str); 4] {
        [
            ("fueltype", self.fuel_type.code()),
            ("lat", self.lat.as_str()),
            ("lng", self.lon.as_str()),
            ("includesurrounding", "1"),
        ]
    }
}

pub trait PriceSource {
    fn fetch(&self, request: &PriceRequest) -> Result<Reading>;
}

#[derive(Debug, Deserialize)]
struct PriceResponse {
    #[serde(rename = "Timestamp")]
    timestamp: String,
    #[serde(rename = "Stations")]
    stations: Vec<Station>,
}

#[derive(Debug, Deserialize)]
struct Station {
    #[serde(rename = "Price")]
    price: String,
    #[serde(rename = "Name", default)]
    name: String,
}

/// Turns a price API body into a reading.
pub fn parse_response(body: &str) -> Result<Reading> {
    let response: PriceResponse =
        serde_json::from_str(body).map_err(|err| FuelError::MalformedResponse(err.to_string()))?;

    if response.stations.is_empty() {
        return Err(FuelError::EmptyData);
    }

    let timestamp = response
        .timestamp
        .split('.')
        .next()
        .unwrap_or_default()
        .to_string();
    if timestamp.is_empty() {
        return Err(FuelError::MalformedResponse("empty timestamp".to_string()));
    }

    let mut prices = Vec::with_capacity(response.stations.len());
    for (i, station) in response.stations.iter().enumerate() {
        let price = station
            .price
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|p| p.is_finite())
            .ok_or_else(|| {
                FuelError::MalformedResponse(format!(
                    "bad price {:?} for station {:?}",
                    station.price, station.name
                ))
            })?;
        if i < LOGGED_STATIONS {
            log::info!("{} {}", station.price, station.name);
        }
        prices.push(price);
    }

    Ok(Reading { timestamp, prices })
}

/// Blocking client for the RACQ fuel price API.
pub struct RacqClient {
    endpoint: String,
    client: reqwest::blocking::Client,
}

impl RacqClient {
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| FuelError::Fetch(format!("Failed to create HTTP client: {}", err)))?;

        Ok(Self {
            endpoint: endpoint.into(),
            client,
        })
    }
}

impl PriceSource for RacqClient {
    fn fetch(&self, request: &PriceRequest) -> Result<Reading> {
        log::debug!(
            "send request: endpoint={}, fuel={}, lat={}, lon={}",
            self.endpoint,
            request.fuel_type,
            request.lat,
            request.lon
        );
        let body = self
            .client
            .get(&self.endpoint)
            .query(&request.query())
            .send()?
            .error_for_status()?
            .text()?;
        log::debug!("received response: {} bytes", body.len());

        parse_response(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    /// Answers a single HTTP request on localhost and returns its base URL.
    fn serve_once(
        status: &'static str,
        body: &'static str,
    ) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/FuelPricesapi.ashx", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = [0u8; 4096];
            let n = stream.read(&mut buf).unwrap();
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\
                 Connection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).unwrap();
            String::from_utf8_lossy(&buf[..n]).into_owned()
        });
        (url, handle)
    }

    fn request() -> PriceRequest {
        PriceRequest::new(FuelType::Unleaded91, "-27.5", "153.1")
    }

    #[test]
    fn fetch_sends_query_and_parses_body() {
        let (url, handle) = serve_once(
            "200 OK",
            r#"{"Timestamp":"2024-11-22T08:00:05.5","Stations":[{"Price":"160.9","Name":"A"}]}"#,
        );

        let reading = RacqClient::new(url).unwrap().fetch(&request()).unwrap();
        assert_eq!(reading, Reading::new("2024-11-22T08:00:05", vec![160.9]));

        let sent = handle.join().unwrap();
        assert!(sent.starts_with("GET /FuelPricesapi.ashx?fueltype=37&lat=-27.5&lng=153.1"));
        assert!(sent.contains("includesurrounding=1"));
    }

    #[test]
    fn server_error_is_fetch_error() {
        let (url, handle) = serve_once("500 Internal Server Error", "");

        let result = RacqClient::new(url).unwrap().fetch(&request());
        assert!(matches!(result, Err(FuelError::Fetch(_))), "{:?}", result);
        handle.join().unwrap();
    }

    #[test]
    fn refused_connection_is_fetch_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/", listener.local_addr().unwrap());
        drop(listener);

        let result = RacqClient::new(url).unwrap().fetch(&request());
        assert!(matches!(result, Err(FuelError::Fetch(_))), "{:?}", result);
    }

    #[test]
    fn parses_stations_in_order() {
        let body = r#"{
            "Timestamp": "2024-11-22T08:00:05.1234567+10:00",
            "Stations": [
                {"Price": "160.9", "Name": "Coorparoo"},
                {"Price": "161.9", "Name": "Holland Park"},
                {"Price": "163.9", "Name": "Carina"}
            ]
        }"#;

        let reading = parse_response(body).unwrap();
        assert_eq!(reading.timestamp, "2024-11-22T08:00:05");
        assert_eq!(reading.prices, vec![160.9, 161.9, 163.9]);
    }

    #[test]
    fn timestamp_without_fraction_is_kept() {
        let body = r#"{
            "Timestamp": "2024-11-22T08:00:05",
            "Stations": [{"Price": "170.5", "Name": "A"}]
        }"#;
        assert_eq!(parse_response(body).unwrap().timestamp, "2024-11-22T08:00:05");
    }

    #[test]
    fn no_stations_is_empty_data() {
        let body = r#"{"Timestamp": "2024-11-22T08:00:05", "Stations": []}"#;
        assert!(matches!(parse_response(body), Err(FuelError::EmptyData)));
    }

    #[test]
    fn wrong_shape_is_malformed() {
        for body in [
            "not json",
            r#"{"Stations": []}"#,
            r#"{"Timestamp": "2024-11-22T08:00:05", "Stations": [{"Name": "A"}]}"#,
            r#"{"Timestamp": "2024-11-22T08:00:05", "Stations": [{"Price": "n/a", "Name": "A"}]}"#,
        ] {
            assert!(
                matches!(parse_response(body), Err(FuelError::MalformedResponse(_))),
                "{}",
                body
            );
        }
    }

    #[test]
    fn query_carries_request_values() {
        let request = PriceRequest::new(FuelType::E10, "-27.5480097", "153.0912986");
        assert_eq!(
            request.query(),
            [
                ("fueltype", "40"),
                ("lat", "-27.5480097"),
                ("lng", "153.0912986"),
                ("includesurrounding", "1"),
            ]
        );
    }
}
