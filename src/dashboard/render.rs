use super::boxplot::BoxSummary;
use image::{ImageError, ImageFormat, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;
use std::io::Cursor;

pub const WIDTH: u32 = 1200;
pub const HEIGHT: u32 = 600;

const MARGIN_LEFT: f32 = 60.0;
const MARGIN_RIGHT: f32 = 20.0;
const MARGIN_TOP: f32 = 30.0;
const MARGIN_BOTTOM: f32 = 40.0;
const GRID_LINES: usize = 5;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const AXIS: Rgb<u8> = Rgb([60, 60, 60]);
const GRID: Rgb<u8> = Rgb([225, 229, 236]);
const BOX_FILL: Rgb<u8> = Rgb([196, 214, 240]);
const BOX_LINE: Rgb<u8> = Rgb([31, 119, 180]);
const OUTLIER: Rgb<u8> = Rgb([214, 39, 40]);

/// Maps prices onto pixel rows of the plot area.
struct YScale {
    low: f64,
    high: f64,
    top: f32,
    bottom: f32,
}

impl YScale {
    fn new(summaries: &[BoxSummary]) -> Self {
        let mut low = summaries.iter().map(|s| s.min).fold(f64::INFINITY, f64::min);
        let mut high = summaries.iter().map(|s| s.max).fold(f64::NEG_INFINITY, f64::max);
        if !low.is_finite() || !high.is_finite() {
            low = 0.0;
            high = 1.0;
        }
        let pad = ((high - low) * 0.05).max(0.5);
        Self {
            low: low - pad,
            high: high + pad,
            top: MARGIN_TOP,
            bottom: HEIGHT as f32 - MARGIN_BOTTOM,
        }
    }

    fn y(&self, price: f64) -> f32 {
        let t = (price - self.low) / (self.high - self.low);
        self.bottom - (t as f32) * (self.bottom - self.top)
    }
}

fn rect(left: f32, top: f32, right: f32, bottom: f32) -> Rect {
    let width = (right - left).round().max(1.0) as u32;
    let height = (bottom - top).round().max(1.0) as u32;
    Rect::at(left.round() as i32, top.round() as i32).of_size(width, height)
}

fn draw_box(img: &mut RgbImage, scale: &YScale, summary: &BoxSummary, center: f32, half: f32) {
    let cap = half * 0.5;
    let q1 = scale.y(summary.q1);
    let q3 = scale.y(summary.q3);
    let low = scale.y(summary.lower_whisker);
    let high = scale.y(summary.upper_whisker);

    draw_line_segment_mut(img, (center, q1), (center, low), BOX_LINE);
    draw_line_segment_mut(img, (center, q3), (center, high), BOX_LINE);
    draw_line_segment_mut(img, (center - cap, low), (center + cap, low), BOX_LINE);
    draw_line_segment_mut(img, (center - cap, high), (center + cap, high), BOX_LINE);

    let body = rect(center - half, q3, center + half, q1);
    draw_filled_rect_mut(img, body, BOX_FILL);
    draw_hollow_rect_mut(img, body, BOX_LINE);

    let median = scale.y(summary.median);
    draw_line_segment_mut(img, (center - half, median), (center + half, median), BOX_LINE);

    for outlier in &summary.outliers {
        let y = scale.y(*outlier);
        draw_filled_rect_mut(img, rect(center - 2.0, y - 2.0, center + 2.0, y + 2.0), OUTLIER);
    }
}

/// Draws one box per summary on a categorical x-axis and encodes the chart as PNG.
pub fn render_png(summaries: &[BoxSummary]) -> Result<Vec<u8>, ImageError> {
    let mut img = RgbImage::from_pixel(WIDTH, HEIGHT, BACKGROUND);
    let scale = YScale::new(summaries);
    let left = MARGIN_LEFT;
    let right = WIDTH as f32 - MARGIN_RIGHT;

    for i in 0..=GRID_LINES {
        let y = scale.top + (scale.bottom - scale.top) * i as f32 / GRID_LINES as f32;
        draw_line_segment_mut(&mut img, (left, y), (right, y), GRID);
    }
    draw_line_segment_mut(&mut img, (left, scale.top), (left, scale.bottom), AXIS);
    draw_line_segment_mut(&mut img, (left, scale.bottom), (right, scale.bottom), AXIS);

    if !summaries.is_empty() {
        let slot = (right - left) / summaries.len() as f32;
        let half = (slot * 0.3).clamp(1.0, 30.0);
        for (i, summary) in summaries.iter().enumerate() {
            let center = left + slot * (i as f32 + 0.5);
            draw_line_segment_mut(
                &mut img,
                (center, scale.bottom),
                (center, scale.bottom + 4.0),
                AXIS,
            );
            draw_box(&mut img, &scale, summary, center, half);
        }
    }

    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, ImageFormat::Png)?;
    Ok(buffer.into_inner())
}

/// Price at each horizontal grid line, top to bottom, for labelling outside the image.
pub fn grid_labels(summaries: &[BoxSummary]) -> Vec<f64> {
    let scale = YScale::new(summaries);
    (0..=GRID_LINES)
        .map(|i| scale.high - (scale.high - scale.low) * i as f64 / GRID_LINES as f64)
        .collect()
}
