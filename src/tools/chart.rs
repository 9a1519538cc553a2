//! Built-in chart tools
//!
//! Render yearly series as SVG line charts and return them base64-encoded in
//! `image_base64`. The agent loop lifts that field out of the tool result and
//! sends it to the client as a `chart` event; the model never sees the bytes.

use std::fmt::{self, Write as _};

use serde_json::{json, Map, Value};

use super::invoker::{ChartPayload, IMAGE_FIELD, IMAGE_MIME_FIELD};
use super::{FunctionTool, ToolFault, ToolRegistry, ToolReturn, ToolSpec};

const WIDTH: f64 = 640.0;
const HEIGHT: f64 = 400.0;
const MARGIN_LEFT: f64 = 80.0;
const MARGIN_RIGHT: f64 = 24.0;
const MARGIN_TOP: f64 = 48.0;
const MARGIN_BOTTOM: f64 = 56.0;
const PALETTE: [&str; 2] = ["#2563eb", "#f97316"];
const SVG_MIME: &str = "image/svg+xml";

/// One plotted line
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: String,
    pub points: Vec<(f64, f64)>,
}

/// Register the growth and comparison chart tools.
pub fn register(registry: &mut ToolRegistry) {
    registry.register(FunctionTool::new(growth_spec(), |args| async move {
        let data = series_arg(&args, "yearly_data", "Portfolio")?;
        let svg = render_line_chart("Investment Growth", &[data]).map_err(render_fault)?;
        Ok(chart_return(&svg))
    }));

    registry.register(FunctionTool::new(comparison_spec(), |args| async move {
        let label_1 = label_arg(&args, "label_1", "Strategy A");
        let label_2 = label_arg(&args, "label_2", "Strategy B");
        let first = series_arg(&args, "data_1", &label_1)?;
        let second = series_arg(&args, "data_2", &label_2)?;
        let svg = render_line_chart("Strategy Comparison", &[first, second]).map_err(render_fault)?;
        Ok(chart_return(&svg))
    }));
}

fn yearly_schema() -> Value {
    json!({
        "type": "array",
        "description": "Rows like {\"year\": 1, \"value\": 100000}",
        "items": {
            "type": "object",
            "properties": {
                "year": { "type": "number" },
                "value": { "type": "number" }
            },
            "required": ["year", "value"]
        }
    })
}

fn growth_spec() -> ToolSpec {
    ToolSpec {
        name: "generate_growth_chart_tool".to_string(),
        description: "Draw a line chart of portfolio value per year. The chart is shown to the user directly.".to_string(),
        parameters: json!({
            "type": "object",
            "properties": { "yearly_data": yearly_schema() },
            "required": ["yearly_data"]
        }),
    }
}

fn comparison_spec() -> ToolSpec {
    ToolSpec {
        name: "generate_comparison_chart_tool".to_string(),
        description: "Draw two yearly value series on one chart to compare strategies. The chart is shown to the user directly.".to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "data_1": yearly_schema(),
                "data_2": yearly_schema(),
                "label_1": { "type": "string" },
                "label_2": { "type": "string" }
            },
            "required": ["data_1", "data_2", "label_1", "label_2"]
        }),
    }
}

fn label_arg(args: &Map<String, Value>, field: &str, default: &str) -> String {
    args.get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default)
        .to_string()
}

/// Read `[{year, value}, ...]` from `args[field]`.
fn series_arg(args: &Map<String, Value>, field: &str, label: &str) -> Result<Series, ToolFault> {
    let rows = args
        .get(field)
        .and_then(Value::as_array)
        .filter(|rows| !rows.is_empty())
        .ok_or_else(|| ToolFault::Failed(format!("{} must be a non-empty list", field)))?;

    let points = rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let year = row.get("year").and_then(Value::as_f64);
            let value = row.get("value").and_then(Value::as_f64);
            match (year, value) {
                (Some(year), Some(value)) => Ok((year, value)),
                _ => Err(ToolFault::Failed(format!(
                    "{}[{}] needs numeric 'year' and 'value'",
                    field, i
                ))),
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Series {
        label: label.to_string(),
        points,
    })
}

fn render_fault(e: fmt::Error) -> ToolFault {
    ToolFault::Failed(format!("Chart rendering failed: {}", e))
}

fn chart_return(svg: &str) -> ToolReturn {
    let payload = ChartPayload::from_bytes(SVG_MIME, svg.as_bytes());
    let mut map = Map::new();
    map.insert(IMAGE_FIELD.to_string(), Value::String(payload.data));
    map.insert(IMAGE_MIME_FIELD.to_string(), Value::String(payload.mime_type));
    ToolReturn::Mapping(map)
}

/// Render one or more series as an SVG line chart.
pub fn render_line_chart(title: &str, series: &[Series]) -> Result<String, fmt::Error> {
    let all = series.iter().flat_map(|s| s.points.iter());
    let (mut x_min, mut x_max, mut y_min, mut y_max) =
        (f64::INFINITY, f64::NEG_INFINITY, 0.0_f64, f64::NEG_INFINITY);
    for &(x, y) in all {
        x_min = x_min.min(x);
        x_max = x_max.max(x);
        y_min = y_min.min(y);
        y_max = y_max.max(y);
    }
    if !x_min.is_finite() {
        (x_min, x_max, y_max) = (0.0, 1.0, 1.0);
    }
    if x_max == x_min {
        x_max = x_min + 1.0;
    }
    if y_max <= y_min {
        y_max = y_min + 1.0;
    }

    let plot_w = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_h = HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
    let sx = |x: f64| MARGIN_LEFT + (x - x_min) / (x_max - x_min) * plot_w;
    let sy = |y: f64| MARGIN_TOP + plot_h - (y - y_min) / (y_max - y_min) * plot_h;

    let mut svg = String::new();
    write!(
        svg,
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="sans-serif">"##,
        w = WIDTH,
        h = HEIGHT
    )?;
    write!(svg, r##"<rect width="100%" height="100%" fill="#ffffff"/>"##)?;
    write!(
        svg,
        r##"<text x="{}" y="28" font-size="18" text-anchor="middle">{}</text>"##,
        WIDTH / 2.0,
        escape(title)
    )?;

    // Axes
    let (x0, y0) = (MARGIN_LEFT, MARGIN_TOP + plot_h);
    write!(
        svg,
        r##"<line x1="{x0}" y1="{y0}" x2="{x1}" y2="{y0}" stroke="#333"/><line x1="{x0}" y1="{y0}" x2="{x0}" y2="{top}" stroke="#333"/>"##,
        x1 = MARGIN_LEFT + plot_w,
        top = MARGIN_TOP
    )?;

    // Y ticks with grid lines
    for i in 0..=4 {
        let value = y_min + (y_max - y_min) * f64::from(i) / 4.0;
        let y = sy(value);
        write!(
            svg,
            r##"<line x1="{x0}" y1="{y:.1}" x2="{x1}" y2="{y:.1}" stroke="#e5e7eb"/><text x="{tx}" y="{ty:.1}" font-size="11" text-anchor="end">{label}</text>"##,
            x1 = MARGIN_LEFT + plot_w,
            tx = MARGIN_LEFT - 6.0,
            ty = y + 4.0,
            label = compact_number(value)
        )?;
    }

    // X ticks at the first series' points
    if let Some(first) = series.first() {
        for &(x, _) in &first.points {
            write!(
                svg,
                r##"<text x="{:.1}" y="{:.1}" font-size="11" text-anchor="middle">{}</text>"##,
                sx(x),
                y0 + 16.0,
                compact_number(x)
            )?;
        }
    }

    write!(
        svg,
        r##"<text x="{}" y="{}" font-size="12" text-anchor="middle">Year</text>"##,
        MARGIN_LEFT + plot_w / 2.0,
        HEIGHT - 12.0
    )?;

    for (i, s) in series.iter().enumerate() {
        let color = PALETTE[i % PALETTE.len()];
        let points: Vec<String> = s
            .points
            .iter()
            .map(|&(x, y)| format!("{:.1},{:.1}", sx(x), sy(y)))
            .collect();
        write!(
            svg,
            r##"<polyline fill="none" stroke="{}" stroke-width="2" points="{}"/>"##,
            color,
            points.join(" ")
        )?;
        if series.len() > 1 {
            let ly = MARGIN_TOP + 12.0 + 16.0 * i as f64;
            write!(
                svg,
                r##"<rect x="{lx}" y="{ry:.1}" width="10" height="10" fill="{color}"/><text x="{tx}" y="{ly:.1}" font-size="12">{label}</text>"##,
                lx = MARGIN_LEFT + 12.0,
                ry = ly - 9.0,
                tx = MARGIN_LEFT + 28.0,
                label = escape(&s.label)
            )?;
        }
    }

    svg.push_str("</svg>");
    Ok(svg)
}

/// 1234567 -> "1.2M", 15300 -> "15.3K"
fn compact_number(value: f64) -> String {
    let abs = value.abs();
    if abs >= 1_000_000_000.0 {
        format!("{:.1}B", value / 1_000_000_000.0)
    } else if abs >= 1_000_000.0 {
        format!("{:.1}M", value / 1_000_000.0)
    } else if abs >= 10_000.0 {
        format!("{:.1}K", value / 1_000.0)
    } else if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{:.2}", value)
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
