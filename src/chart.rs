//! SVG line chart of the trend table.

use std::fmt;

use crate::trends::{Group, Trends};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const CONTROL: Color = Color::rgb(0x00, 0x72, 0xB2);
    pub const TREATMENT: Color = Color::rgb(0xD5, 0x5E, 0x00);
    pub const POLICY: Color = Color::rgb(0xFF, 0x00, 0x00);
    pub const GRID: Color = Color::rgb(0xE5, 0xE5, 0xE5);
    pub const TEXT: Color = Color::rgb(0x2A, 0x2A, 0x2A);

    pub fn for_group(group: Group) -> Self {
        match group {
            Group::Control => Self::CONTROL,
            Group::Treatment => Self::TREATMENT,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

pub(crate) fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Axis with "nice number" ticks and data to pixel mapping.
#[derive(Debug, Clone)]
pub struct Axis {
    pub min: f64,
    pub max: f64,
    pub ticks: Vec<f64>,
    pub labels: Vec<String>,
}

impl Axis {
    pub fn auto_linear(data_min: f64, data_max: f64, target_ticks: usize) -> Self {
        let (min, max, step) = nice_range(data_min, data_max, target_ticks);
        let mut ticks = Vec::new();
        let mut labels = Vec::new();
        let mut v = min;
        while v <= max + step * 0.01 {
            ticks.push(v);
            labels.push(format_tick(v, step));
            v += step;
        }
        Self {
            min,
            max,
            ticks,
            labels,
        }
    }

    pub fn data_to_pixel(&self, value: f64, px_min: f64, px_max: f64) -> f64 {
        let frac = (value - self.min) / (self.max - self.min);
        px_min + frac * (px_max - px_min)
    }
}

fn nice_range(data_min: f64, data_max: f64, target_ticks: usize) -> (f64, f64, f64) {
    if (data_max - data_min).abs() < 1e-15 {
        return (data_min - 1.0, data_max + 1.0, 1.0);
    }
    let rough = (data_max - data_min) / (target_ticks.max(2) - 1) as f64;
    let step = nice_step(rough);
    (
        (data_min / step).floor() * step,
        (data_max / step).ceil() * step,
        step,
    )
}

fn nice_step(rough: f64) -> f64 {
    let exp = rough.abs().log10().floor();
    let frac = rough / 10.0_f64.powf(exp);
    let nice = if frac <= 1.5 {
        1.0
    } else if frac <= 3.5 {
        2.0
    } else if frac <= 7.5 {
        5.0
    } else {
        10.0
    };
    nice * 10.0_f64.powf(exp)
}

fn format_tick(value: f64, step: f64) -> String {
    if step >= 1.0 {
        let v = if value.abs() < step * 0.01 { 0.0 } else { value };
        format!("{}", v.round() as i64)
    } else {
        let decimals = (-step.log10().floor()) as usize;
        format!("{:.prec$}", value, prec = decimals)
    }
}

/// Immediate-mode SVG writer.
struct Canvas {
    width: f64,
    height: f64,
    body: String,
}

impl Canvas {
    fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            body: String::with_capacity(16 * 1024),
        }
    }

    fn line(
        &mut self,
        (x1, y1): (f64, f64),
        (x2, y2): (f64, f64),
        color: Color,
        width: f64,
        dash: Option<&str>,
    ) {
        self.body.push_str(&format!(
            r#"<line x1="{x1:.2}" y1="{y1:.2}" x2="{x2:.2}" y2="{y2:.2}" stroke="{color}" stroke-width="{width}""#
        ));
        if let Some(dash) = dash {
            self.body.push_str(&format!(r#" stroke-dasharray="{dash}""#));
        }
        self.body.push_str(" />\n");
    }

    fn polyline(&mut self, points: &[(f64, f64)], color: Color, width: f64) {
        let points = points
            .iter()
            .map(|(x, y)| format!("{x:.2},{y:.2}"))
            .collect::<Vec<_>>()
            .join(" ");
        self.body.push_str(&format!(
            r#"<polyline points="{points}" fill="none" stroke="{color}" stroke-width="{width}" />"#
        ));
        self.body.push('\n');
    }

    fn marker(&mut self, (cx, cy): (f64, f64), color: Color, tooltip: &str) {
        self.body.push_str(&format!(
            r#"<circle cx="{cx:.2}" cy="{cy:.2}" r="4" fill="{color}"><title>{}</title></circle>"#,
            escape(tooltip)
        ));
        self.body.push('\n');
    }

    fn hover_band(&mut self, x: f64, y: f64, w: f64, h: f64, tooltip: &str) {
        self.body.push_str(&format!(
            r##"<rect class="hover" x="{x:.2}" y="{y:.2}" width="{w:.2}" height="{h:.2}" fill="#000" fill-opacity="0"><title>{}</title></rect>"##,
            escape(tooltip)
        ));
        self.body.push('\n');
    }

    fn text(&mut self, (x, y): (f64, f64), content: &str, size: f64, anchor: &str, bold: bool) {
        let weight = if bold { "bold" } else { "normal" };
        self.body.push_str(&format!(
            r#"<text x="{x:.2}" y="{y:.2}" font-size="{size}" font-weight="{weight}" text-anchor="{anchor}" fill="{}">{}</text>"#,
            Color::TEXT,
            escape(content)
        ));
        self.body.push('\n');
    }

    fn text_rotated(&mut self, (x, y): (f64, f64), content: &str, size: f64) {
        self.body.push_str(&format!(
            r#"<text x="{x:.2}" y="{y:.2}" font-size="{size}" text-anchor="middle" fill="{}" transform="rotate(-90 {x:.2} {y:.2})">{}</text>"#,
            Color::TEXT,
            escape(content)
        ));
        self.body.push('\n');
    }

    fn finish_svg(self) -> String {
        format!(
            concat!(
                r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="sans-serif">"#,
                "\n",
                r#"<style>.hover:hover {{ fill-opacity: 0.06; }}</style>"#,
                "\n",
                r#"<rect width="{w}" height="{h}" fill="white" />"#,
                "\n{body}</svg>\n"
            ),
            w = self.width,
            h = self.height,
            body = self.body
        )
    }
}

#[derive(Debug, Clone)]
pub struct ChartConfig {
    pub width: f64,
    pub height: f64,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    /// Year boundary marked with the dashed policy line.
    pub policy_boundary: f64,
    pub policy_label: String,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            width: 900.0,
            height: 500.0,
            title: "Average Income Trends: Treatment vs. Control Groups".to_string(),
            x_label: "Year".to_string(),
            y_label: "Weighted Mean Log Income".to_string(),
            policy_boundary: crate::config::DEFAULT_POLICY_BOUNDARY,
            policy_label: "Policy start".to_string(),
        }
    }
}

impl ChartConfig {
    pub fn with_policy_boundary(mut self, boundary: f64) -> Self {
        self.policy_boundary = boundary;
        self
    }
}

/// One line per group with markers, a per-year hover band listing every
/// group's value, and a dashed vertical line at the policy boundary.
pub fn render_trends(trends: &Trends, config: &ChartConfig) -> String {
    if trends.is_empty() {
        return r#"<svg xmlns="http://www.w3.org/2000/svg" width="200" height="50"><text x="10" y="30">No trend data</text></svg>"#.into();
    }
    let (left, right, top, bottom) = (80.0, config.width - 30.0, 70.0, config.height - 60.0);
    let mut canvas = Canvas::new(config.width, config.height);

    let years = trends.years();
    let first = years.first().copied().unwrap_or_default() as f64;
    let last = years.last().copied().unwrap_or_default() as f64;
    let x_axis = Axis::auto_linear(
        first.min(config.policy_boundary),
        last.max(config.policy_boundary),
        years.len().max(2),
    );
    let (lo, hi) = trends
        .points()
        .iter()
        .map(|p| p.weighted_mean)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    let y_axis = Axis::auto_linear(lo, hi, 6);
    let px = |x: f64| x_axis.data_to_pixel(x, left, right);
    let py = |y: f64| y_axis.data_to_pixel(y, bottom, top);

    canvas.text((config.width / 2.0, 32.0), &config.title, 20.0, "middle", true);

    for (tick, label) in y_axis.ticks.iter().zip(&y_axis.labels) {
        canvas.line((left, py(*tick)), (right, py(*tick)), Color::GRID, 1.0, None);
        canvas.text((left - 8.0, py(*tick) + 4.0), label, 12.0, "end", false);
    }
    for (tick, label) in x_axis.ticks.iter().zip(&x_axis.labels) {
        canvas.line((px(*tick), bottom), (px(*tick), bottom + 5.0), Color::TEXT, 1.0, None);
        canvas.text((px(*tick), bottom + 20.0), label, 12.0, "middle", false);
    }
    canvas.line((left, bottom), (right, bottom), Color::TEXT, 1.0, None);
    canvas.line((left, top), (left, bottom), Color::TEXT, 1.0, None);
    canvas.text(((left + right) / 2.0, config.height - 15.0), &config.x_label, 16.0, "middle", false);
    canvas.text_rotated((22.0, (top + bottom) / 2.0), &config.y_label, 16.0);

    // unified hover: one band per year covering every series
    let band = if years.len() > 1 {
        (px(last) - px(first)) / (years.len() - 1) as f64
    } else {
        right - left
    };
    for year in &years {
        let tooltip = std::iter::once(year.to_string())
            .chain([Group::Control, Group::Treatment].into_iter().filter_map(|g| {
                trends
                    .get(*year, g)
                    .map(|p| format!("{}: {:.4}", g, p.weighted_mean))
            }))
            .collect::<Vec<_>>()
            .join("\n");
        let x = (px(*year as f64) - band / 2.0).max(left);
        let w = band.min(right - x);
        canvas.hover_band(x, top, w, bottom - top, &tooltip);
    }

    let mut legend_y = top + 4.0;
    for group in [Group::Control, Group::Treatment] {
        let color = Color::for_group(group);
        let points = trends
            .series(group)
            .map(|p| (px(p.year as f64), py(p.weighted_mean)))
            .collect::<Vec<_>>();
        if points.is_empty() {
            continue;
        }
        canvas.polyline(&points, color, 2.5);
        for (p, xy) in trends.series(group).zip(&points) {
            canvas.marker(
                *xy,
                color,
                &format!("{} {}: {:.4}", group, p.year, p.weighted_mean),
            );
        }
        canvas.line((right - 110.0, legend_y), (right - 85.0, legend_y), color, 2.5, None);
        canvas.text((right - 80.0, legend_y + 4.0), group.label(), 13.0, "start", false);
        legend_y += 18.0;
    }

    let boundary = px(config.policy_boundary);
    canvas.line((boundary, top), (boundary, bottom), Color::POLICY, 2.0, Some("6 4"));
    canvas.text((boundary + 4.0, top - 6.0), &config.policy_label, 13.0, "start", false);

    canvas.finish_svg()
}
