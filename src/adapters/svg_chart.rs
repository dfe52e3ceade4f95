//! SVG chart rendering: price with EMAs and crossover markers, and the equity curve.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::EmacrossError;
use crate::ports::report_port::ReportPort;

const WIDTH: f64 = 1000.0;
const HEIGHT: f64 = 400.0;
const PADDING: f64 = 40.0;

const CLOSE_COLOR: &str = "#555555";
const FAST_COLOR: &str = "blue";
const SLOW_COLOR: &str = "orange";
const BUY_COLOR: &str = "green";
const SELL_COLOR: &str = "red";
const EQUITY_COLOR: &str = "blue";

#[derive(Debug, Default)]
pub struct SvgChartAdapter;

impl SvgChartAdapter {
    pub fn new() -> Self {
        Self
    }
}

pub fn price_chart_path(output_dir: &Path, ticker: &str) -> PathBuf {
    output_dir.join(format!("{} price.svg", ticker))
}

pub fn equity_chart_path(output_dir: &Path, ticker: &str) -> PathBuf {
    output_dir.join(format!("{} equity.svg", ticker))
}

/// Maps bar indices and values onto the drawing area.
struct Plot {
    min: f64,
    scale_x: f64,
    scale_y: f64,
}

impl Plot {
    fn new(count: usize, values: impl Iterator<Item = f64>) -> Self {
        let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
        let plot_width = WIDTH - 2.0 * PADDING;
        let plot_height = HEIGHT - 2.0 * PADDING;

        let range = max - min;
        let scale_y = if range > 0.0 {
            plot_height / range
        } else {
            1.0
        };
        let scale_x = if count > 1 {
            plot_width / (count - 1) as f64
        } else {
            0.0
        };
        Plot {
            min: if min.is_finite() { min } else { 0.0 },
            scale_x,
            scale_y,
        }
    }

    fn x(&self, index: usize) -> f64 {
        PADDING + index as f64 * self.scale_x
    }

    fn y(&self, value: f64) -> f64 {
        HEIGHT - PADDING - (value - self.min) * self.scale_y
    }

    fn polyline(&self, values: &[f64], color: &str) -> String {
        let points: Vec<String> = values
            .iter()
            .enumerate()
            .map(|(i, &v)| format!("{:.1},{:.1}", self.x(i), self.y(v)))
            .collect();
        format!(
            r#"<polyline fill="none" stroke="{}" stroke-width="1.5" points="{}"/>"#,
            color,
            points.join(" ")
        )
    }

    fn markers(&self, values: &[Option<f64>], color: &str) -> String {
        values
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.map(|v| (i, v)))
            .map(|(i, v)| {
                format!(
                    r#"<circle cx="{:.1}" cy="{:.1}" r="4" fill="{}"/>"#,
                    self.x(i),
                    self.y(v),
                    color
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn open_svg(title: &str) -> String {
    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w:.0}" height="{h:.0}" viewBox="0 0 {w:.0} {h:.0}">
<rect width="100%" height="100%" fill="white"/>
<text x="{tx:.0}" y="24" font-family="sans-serif" font-size="16" text-anchor="middle">{title}</text>
<line x1="{p:.0}" y1="{p:.0}" x2="{p:.0}" y2="{b:.0}" stroke="black"/>
<line x1="{p:.0}" y1="{b:.0}" x2="{r:.0}" y2="{b:.0}" stroke="black"/>
"#,
        w = WIDTH,
        h = HEIGHT,
        tx = WIDTH / 2.0,
        title = escape(title),
        p = PADDING,
        b = HEIGHT - PADDING,
        r = WIDTH - PADDING,
    )
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn legend(entries: &[(&str, &str)]) -> String {
    entries
        .iter()
        .enumerate()
        .map(|(i, (label, color))| {
            format!(
                r#"<text x="{:.0}" y="{:.0}" font-family="sans-serif" font-size="11" fill="{}">{}</text>
"#,
                PADDING + 8.0,
                PADDING + 14.0 * i as f64 + 10.0,
                color,
                escape(label)
            )
        })
        .collect()
}

/// Close price, both EMAs, and crossover markers at the bar close.
pub fn render_price_chart(result: &BacktestResult, ticker: &str) -> String {
    let closes: Vec<f64> = result.bars.iter().map(|b| b.close).collect();
    let fast = result.ema_fast.raw();
    let slow = result.ema_slow.raw();

    let plot = Plot::new(
        closes.len(),
        closes.iter().chain(&fast).chain(&slow).copied(),
    );

    let fast_label = result.ema_fast.indicator_type.to_string();
    let slow_label = result.ema_slow.indicator_type.to_string();
    let title = format!("{} | {} / {} Crossover", ticker, fast_label, slow_label);

    let mut svg = open_svg(&title);
    for (values, color) in [(&closes, CLOSE_COLOR), (&fast, FAST_COLOR), (&slow, SLOW_COLOR)] {
        svg.push_str(&plot.polyline(values, color));
        svg.push('\n');
    }

    for (markers, color) in [
        (result.buy_markers(), BUY_COLOR),
        (result.sell_markers(), SELL_COLOR),
    ] {
        let circles = plot.markers(&markers, color);
        if !circles.is_empty() {
            svg.push_str(&circles);
            svg.push('\n');
        }
    }

    svg.push_str(&legend(&[
        ("Close", CLOSE_COLOR),
        (fast_label.as_str(), FAST_COLOR),
        (slow_label.as_str(), SLOW_COLOR),
        ("Buy", BUY_COLOR),
        ("Sell", SELL_COLOR),
    ]));
    svg.push_str("</svg>\n");
    svg
}

/// Equity after each closed trade.
pub fn render_equity_chart(result: &BacktestResult, ticker: &str) -> String {
    let equity: Vec<f64> = result.equity_curve().iter().map(|p| p.equity).collect();
    let mut svg = open_svg(&format!("{} | Equity Curve", ticker));

    if equity.is_empty() {
        svg.push_str(&format!(
            r#"<text x="{:.0}" y="{:.0}" font-family="sans-serif" font-size="14" text-anchor="middle">No equity data available.</text>
"#,
            WIDTH / 2.0,
            HEIGHT / 2.0
        ));
    } else {
        let plot = Plot::new(equity.len(), equity.iter().copied());
        svg.push_str(&plot.polyline(&equity, EQUITY_COLOR));
        svg.push('\n');
    }

    svg.push_str("</svg>\n");
    svg
}

impl ReportPort for SvgChartAdapter {
    fn write(
        &self,
        result: &BacktestResult,
        ticker: &str,
        output_dir: &Path,
    ) -> Result<Vec<PathBuf>, EmacrossError> {
        fs::create_dir_all(output_dir)?;

        let price = price_chart_path(output_dir, ticker);
        fs::write(&price, render_price_chart(result, ticker))?;
        let equity = equity_chart_path(output_dir, ticker);
        fs::write(&equity, render_equity_chart(result, ticker))?;

        let written = vec![price, equity];
        for path in &written {
            info!(path = %path.display(), "wrote");
        }
        Ok(written)
    }
}
