use super::boxplot::{BoxSummary, DateRange, summarize};
use super::render::{grid_labels, render_png};
use crate::error::FuelError;
use crate::store::load_log;
use actix_files as fs;
use actix_web::http::StatusCode;
use actix_web::http::header::{
    CACHE_CONTROL, ContentDisposition, DispositionType, IF_MODIFIED_SINCE, LAST_MODIFIED,
};
use actix_web::middleware::Logger;
use actix_web::{App, HttpRequest, HttpResponse, HttpServer, ResponseError, get, web};
use chrono::{Duration, Local, NaiveDate};
use httpdate::HttpDate;
use serde::Deserialize;
use std::fmt::Write;
use std::path::PathBuf;
use std::time::SystemTime;

const DEFAULT_WEEKS: i64 = 3;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("price log not found")]
    NotFound(),

    #[error("bad date: {0}")]
    BadDate(String),

    #[error("Failed to read price log: err={0}")]
    FailedToRead(FuelError),

    #[error("Failed to encode: err={0}")]
    FailedToEncode(image::ImageError),
}

impl From<FuelError> for ApiError {
    fn from(err: FuelError) -> Self {
        match err {
            FuelError::NotFound(_) => ApiError::NotFound(),
            FuelError::InvalidDate(date) => ApiError::BadDate(date),
            err => ApiError::FailedToRead(err),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound() => StatusCode::NOT_FOUND,
            ApiError::BadDate(_) => StatusCode::BAD_REQUEST,
            ApiError::FailedToRead(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::FailedToEncode(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).body(self.to_string())
    }
}

/// The price log a dashboard instance serves.
#[derive(Debug, Clone)]
pub struct Dashboard {
    pub csv_path: PathBuf,
}

impl Dashboard {
    pub fn new(csv_path: impl Into<PathBuf>) -> Self {
        Self {
            csv_path: csv_path.into(),
        }
    }

    fn title(&self) -> String {
        let name = self
            .csv_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if name.is_empty() {
            "Petrol Prices Over Time".to_string()
        } else {
            format!("Petrol Prices Over Time - {}", name)
        }
    }

    fn summaries(&self, range: &DateRange) -> Result<Vec<BoxSummary>, ApiError> {
        let rows = load_log(&self.csv_path)?;
        Ok(summarize(&rows, range))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RangeQuery {
    start: Option<String>,
    end: Option<String>,
}

impl RangeQuery {
    /// Missing bounds fall back to the last three weeks.
    fn dates(&self, today: NaiveDate) -> (String, String) {
        let start = self
            .start
            .clone()
            .unwrap_or_else(|| (today - Duration::weeks(DEFAULT_WEEKS)).to_string());
        let end = self.end.clone().unwrap_or_else(|| today.to_string());
        (start, end)
    }

    /// Defaulted bounds move with the clock, so only explicit ranges are cacheable.
    fn is_fixed(&self) -> bool {
        self.start.is_some() && self.end.is_some()
    }

    fn range(&self) -> Result<DateRange, ApiError> {
        let (start, end) = self.dates(Local::now().date_naive());
        Ok(DateRange::parse(Some(&start), Some(&end))?)
    }
}

fn is_not_modified(req: &HttpRequest, modified_time: SystemTime) -> bool {
    if let Some(ims) = req.headers().get(IF_MODIFIED_SINCE) {
        if let Ok(ims_str) = ims.to_str() {
            if let Ok(ims_time) = httpdate::parse_http_date(ims_str) {
                // HTTP dates carry whole seconds only
                let modified = SystemTime::from(HttpDate::from(modified_time));
                return modified <= ims_time;
            }
        }
    }
    false
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn render_page(title: &str, start: &str, end: &str, summaries: &[BoxSummary]) -> String {
    let start = escape(start);
    let end = escape(end);
    let mut html = String::new();
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>{title}</title></head><body>\n\
         <h1>{title}</h1>\n\
         <form method=\"get\" action=\"/\">\
         <input type=\"date\" name=\"start\" value=\"{start}\" placeholder=\"Start Date\"> \
         <input type=\"date\" name=\"end\" value=\"{end}\" placeholder=\"End Date\"> \
         <button type=\"submit\">Update</button></form>\n\
         <img id=\"price-box-plot\" \
         src=\"/plot.png?start={start}&amp;end={end}\" alt=\"{title}\">\n",
        title = escape(title),
    );

    let labels: Vec<String> = grid_labels(summaries)
        .iter()
        .map(|p| format!("{:.1}", p))
        .collect();
    let _ = writeln!(html, "<p>Price (cents), top to bottom: {}</p>", labels.join(" / "));

    html.push_str(
        "<table><tr><th>Date/Time</th><th>Stations</th><th>Min</th><th>Q1</th>\
         <th>Median</th><th>Q3</th><th>Max</th></tr>\n",
    );
    for s in summaries {
        let _ = writeln!(
            html,
            "<tr><td>{}</td><td>{}</td><td>{}</td>\
             <td>{:.2}</td><td>{:.2}</td><td>{:.2}</td><td>{}</td></tr>",
            escape(&s.timestamp),
            s.count,
            s.min,
            s.q1,
            s.median,
            s.q3,
            s.max
        );
    }
    html.push_str("</table>\n<p><a href=\"/raw\">Download CSV</a></p>\n</body></html>\n");
    html
}

#[get("/")]
async fn index(
    query: web::Query<RangeQuery>,
    dashboard: web::Data<Dashboard>,
) -> Result<HttpResponse, ApiError> {
    let (start, end) = query.dates(Local::now().date_naive());
    let range = DateRange::parse(Some(&start), Some(&end))?;
    let summaries = dashboard.summaries(&range)?;

    Ok(HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(render_page(&dashboard.title(), &start, &end, &summaries)))
}

#[get("/plot.png")]
async fn plot(
    req: HttpRequest,
    query: web::Query<RangeQuery>,
    dashboard: web::Data<Dashboard>,
) -> Result<HttpResponse, ApiError> {
    let range = query.range()?;

    let metadata = std::fs::metadata(&dashboard.csv_path).map_err(|_| ApiError::NotFound())?;
    let modified_time = metadata.modified().unwrap_or(SystemTime::now());
    if query.is_fixed() && is_not_modified(&req, modified_time) {
        return Ok(HttpResponse::NotModified().finish());
    }

    let summaries = dashboard.summaries(&range)?;
    log::debug!("plotting {} boxes", summaries.len());
    let png = render_png(&summaries).map_err(ApiError::FailedToEncode)?;

    Ok(HttpResponse::Ok()
        .content_type("image/png")
        .insert_header((CACHE_CONTROL, "no-cache"))
        .insert_header((LAST_MODIFIED, HttpDate::from(modified_time).to_string()))
        .body(png))
}

#[get("/summary.json")]
async fn summary(
    query: web::Query<RangeQuery>,
    dashboard: web::Data<Dashboard>,
) -> Result<HttpResponse, ApiError> {
    let range = query.range()?;
    Ok(HttpResponse::Ok().json(dashboard.summaries(&range)?))
}

#[get("/raw")]
async fn raw(dashboard: web::Data<Dashboard>) -> Result<fs::NamedFile, actix_web::Error> {
    let named_file = fs::NamedFile::open(&dashboard.csv_path)?;
    Ok(named_file
        .use_last_modified(true)
        .set_content_disposition(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![],
        }))
}

pub fn configure(dashboard: Dashboard) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        cfg.app_data(web::Data::new(dashboard))
            .service(index)
            .service(plot)
            .service(summary)
            .service(raw);
    }
}

pub async fn serve(dashboard: Dashboard, bind: &str, port: u16) -> std::io::Result<()> {
    log::info!(
        "Serving {} at http://{}:{}",
        dashboard.csv_path.display(),
        bind,
        port
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .configure(configure(dashboard.clone()))
    })
    .bind((bind, port))?
    .run()
    .await
}
