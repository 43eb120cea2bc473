//! Risk gauge SVG.
//!
//! A half donut split into Low / Moderate / High bands whose widths are
//! the alert thresholds (0.21, 0.04, 0.75 of the dial), a needle at
//! `180 deg * clamp(score, 0, 1)` measured clockwise from the left end,
//! and a "Risk Score: x.xxx" caption under the hub.
//!
//! The document is built with the [`svg`] crate, which also takes care
//! of XML escaping.

use std::f64::consts::PI;
use std::fmt::Write;

use svg::Document;
use svg::node::element::{Circle, Description, Element, Line, Path, Title};
use svg::node::{Node, Text};

use georoots_pipeline::{AlertLevel, AlertThresholds, RiskScore};

/// Document width in user units.
const WIDTH: f64 = 400.0;
/// Document height in user units.
const HEIGHT: f64 = 260.0;
/// Dial centre.
const CX: f64 = WIDTH / 2.0;
const CY: f64 = 200.0;
/// Outer radius of the dial.
const OUTER_RADIUS: f64 = 160.0;
/// Inner radius (the donut hole).
const INNER_RADIUS: f64 = OUTER_RADIUS / 2.0;
/// Needle length relative to the outer radius.
const NEEDLE_RATIO: f64 = 0.8;

/// One coloured band of the dial, spanning `[start, end]` in score
/// units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaugeBand {
    /// Label shown in the band's tooltip.
    pub label: &'static str,
    /// Fill colour.
    pub colour: &'static str,
    /// Score where the band starts.
    pub start: f64,
    /// Score where the band ends.
    pub end: f64,
}

impl GaugeBand {
    /// Bands for the given thresholds, covering `[0, 1]`.
    #[must_use]
    pub fn for_thresholds(thresholds: &AlertThresholds) -> [Self; 3] {
        let low = thresholds.low_below.clamp(0.0, 1.0);
        let medium = thresholds.medium_up_to.clamp(low, 1.0);
        [
            Self {
                label: "Low",
                colour: "green",
                start: 0.0,
                end: low,
            },
            Self {
                label: "Moderate",
                colour: "orange",
                start: low,
                end: medium,
            },
            Self {
                label: "High",
                colour: "red",
                start: medium,
                end: 1.0,
            },
        ]
    }
}

/// Metadata to embed in the SVG document.
///
/// All fields are optional. Text values are XML-escaped by the `svg`
/// crate.
#[derive(Debug, Clone, Default)]
pub struct SvgMetadata<'a> {
    /// Document title, emitted as `<title>`.
    pub title: Option<&'a str>,

    /// Document description, emitted as `<desc>`.
    pub description: Option<&'a str>,

    /// Serialized assessment (feature record, score, alert) emitted
    /// inside `<metadata>` so the file carries the inputs that produced
    /// it.
    pub assessment_json: Option<&'a str>,
}

/// Point on a circle of `radius` around the dial centre for a score in
/// `[0, 1]`: 0 is the left end, 0.5 the top, 1 the right end.
fn dial_point(score: f64, radius: f64) -> (f64, f64) {
    let theta = PI * score;
    (CX - radius * theta.cos(), CY - radius * theta.sin())
}

/// Path data for the annular sector between two scores.
fn band_path_data(start: f64, end: f64) -> String {
    let (ox0, oy0) = dial_point(start, OUTER_RADIUS);
    let (ox1, oy1) = dial_point(end, OUTER_RADIUS);
    let (ix1, iy1) = dial_point(end, INNER_RADIUS);
    let (ix0, iy0) = dial_point(start, INNER_RADIUS);
    let mut d = String::new();
    // Bands never exceed half a turn, so the large-arc flag is always 0.
    let _ = write!(
        d,
        "M {ox0:.2} {oy0:.2} A {OUTER_RADIUS} {OUTER_RADIUS} 0 0 1 {ox1:.2} {oy1:.2} \
         L {ix1:.2} {iy1:.2} A {INNER_RADIUS} {INNER_RADIUS} 0 0 0 {ix0:.2} {iy0:.2} Z"
    );
    d
}

/// Label the dashboards show under the gauge.
const fn alert_caption(level: AlertLevel) -> &'static str {
    match level {
        AlertLevel::Low => "Low Risk",
        AlertLevel::Medium => "Moderate Risk",
        AlertLevel::High => "High Risk",
    }
}

fn text_element(x: f64, y: f64, size: u32, content: &str) -> Element {
    let mut text = Element::new("text");
    text.assign("x", format!("{x:.2}"));
    text.assign("y", format!("{y:.2}"));
    text.assign("text-anchor", "middle");
    text.assign("font-family", "sans-serif");
    text.assign("font-size", size);
    text.append(Text::new(content));
    text
}

/// Render the risk gauge for a score.
///
/// When `alert` is given, its label ("Low Risk", "Moderate Risk",
/// "High Risk") is added under the score caption.
#[must_use]
pub fn risk_gauge_svg(
    score: RiskScore,
    thresholds: &AlertThresholds,
    alert: Option<AlertLevel>,
    metadata: &SvgMetadata<'_>,
) -> String {
    let mut doc = Document::new()
        .set("width", format!("{WIDTH}"))
        .set("height", format!("{HEIGHT}"))
        .set("viewBox", format!("0 0 {WIDTH} {HEIGHT}"));

    if let Some(title) = metadata.title {
        doc = doc.add(Title::new(title));
    }
    if let Some(description) = metadata.description {
        doc = doc.add(Description::new().add(Text::new(description)));
    }
    if let Some(json) = metadata.assessment_json {
        let mut assessment = Element::new("georoots:assessment");
        assessment.assign("xmlns:georoots", "https://georoots.dev/ns/1");
        assessment.append(Text::new(json));
        let mut metadata_el = Element::new("metadata");
        metadata_el.append(assessment);
        doc = doc.add(metadata_el);
    }

    for band in GaugeBand::for_thresholds(thresholds) {
        if band.end <= band.start {
            continue;
        }
        let path = Path::new()
            .set("d", band_path_data(band.start, band.end))
            .set("fill", band.colour)
            .set("stroke", "white")
            .set("stroke-width", 1)
            .set("data-band", band.label);
        doc = doc.add(path);
    }

    let (nx, ny) = dial_point(score.value().clamp(0.0, 1.0), OUTER_RADIUS * NEEDLE_RATIO);
    doc = doc
        .add(
            Line::new()
                .set("x1", format!("{CX:.2}"))
                .set("y1", format!("{CY:.2}"))
                .set("x2", format!("{nx:.2}"))
                .set("y2", format!("{ny:.2}"))
                .set("stroke", "black")
                .set("stroke-width", 4)
                .set("stroke-linecap", "round"),
        )
        .add(
            Circle::new()
                .set("cx", format!("{CX:.2}"))
                .set("cy", format!("{CY:.2}"))
                .set("r", 6)
                .set("fill", "black"),
        )
        .add(text_element(
            CX,
            CY + 30.0,
            16,
            &format!("Risk Score: {:.3}", score.value()),
        ));

    if let Some(level) = alert {
        doc = doc.add(text_element(CX, CY + 52.0, 14, alert_caption(level)));
    }

    // The svg crate omits the XML declaration, so we prepend it.
    format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{doc}\n")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn score(value: f64) -> RiskScore {
        RiskScore::new(value).unwrap()
    }

    fn needle_end(svg: &str) -> (f64, f64) {
        let grab = |attr: &str| -> f64 {
            let key = format!("{attr}=\"");
            let start = svg.find(&key).unwrap() + key.len();
            let end = start + svg[start..].find('"').unwrap();
            svg[start..end].parse().unwrap()
        };
        (grab("x2"), grab("y2"))
    }

    #[test]
    fn dial_endpoints() {
        let (x, y) = dial_point(0.0, 10.0);
        assert!((x - (CX - 10.0)).abs() < 1e-9 && (y - CY).abs() < 1e-9);
        let (x, y) = dial_point(0.5, 10.0);
        assert!((x - CX).abs() < 1e-9 && (y - (CY - 10.0)).abs() < 1e-9);
        let (x, y) = dial_point(1.0, 10.0);
        assert!((x - (CX + 10.0)).abs() < 1e-9 && (y - CY).abs() < 1e-9);
    }

    #[test]
    fn default_bands_match_thresholds() {
        let bands = GaugeBand::for_thresholds(&AlertThresholds::default());
        let widths: Vec<f64> = bands.iter().map(|b| b.end - b.start).collect();
        assert!((widths[0] - 0.21).abs() < 1e-12);
        assert!((widths[1] - 0.04).abs() < 1e-12);
        assert!((widths[2] - 0.75).abs() < 1e-12);
        assert_eq!(bands.map(|b| b.label), ["Low", "Moderate", "High"]);
    }

    #[test]
    fn gauge_contains_bands_needle_and_caption() {
        let svg = risk_gauge_svg(
            score(0.2345),
            &AlertThresholds::default(),
            Some(AlertLevel::Medium),
            &SvgMetadata::default(),
        );
        assert!(svg.starts_with("<?xml"));
        assert_eq!(svg.matches("<path").count(), 3);
        assert!(svg.contains("fill=\"green\""));
        assert!(svg.contains("fill=\"orange\""));
        assert!(svg.contains("fill=\"red\""));
        assert!(svg.contains("<line"));
        assert!(svg.contains("Risk Score: 0.234") || svg.contains("Risk Score: 0.235"));
        assert!(svg.contains("Moderate Risk"));
        assert!(svg.contains("</svg>"));
    }

    #[test]
    fn needle_points_left_for_zero_and_up_for_half() {
        let svg = risk_gauge_svg(
            score(0.0),
            &AlertThresholds::default(),
            None,
            &SvgMetadata::default(),
        );
        let (x, y) = needle_end(&svg);
        assert!((x - (CX - OUTER_RADIUS * NEEDLE_RATIO)).abs() < 0.01);
        assert!((y - CY).abs() < 0.01);

        let svg = risk_gauge_svg(
            score(0.5),
            &AlertThresholds::default(),
            None,
            &SvgMetadata::default(),
        );
        let (x, y) = needle_end(&svg);
        assert!((x - CX).abs() < 0.01);
        assert!((y - (CY - OUTER_RADIUS * NEEDLE_RATIO)).abs() < 0.01);
    }

    #[test]
    fn needle_is_clamped_but_caption_is_not() {
        let svg = risk_gauge_svg(
            score(1.7),
            &AlertThresholds::default(),
            None,
            &SvgMetadata::default(),
        );
        let (x, _) = needle_end(&svg);
        assert!((x - (CX + OUTER_RADIUS * NEEDLE_RATIO)).abs() < 0.01);
        assert!(svg.contains("Risk Score: 1.700"));
    }

    #[test]
    fn metadata_is_embedded_and_escaped() {
        let metadata = SvgMetadata {
            title: Some("Site <A>"),
            description: Some("slope 30 & rain 12.5"),
            assessment_json: Some(r#"{"score":0.3}"#),
        };
        let svg = risk_gauge_svg(
            score(0.3),
            &AlertThresholds::default(),
            Some(AlertLevel::High),
            &metadata,
        );
        assert!(svg.contains("<title>Site &lt;A&gt;</title>"));
        assert!(svg.contains("slope 30 &amp; rain 12.5"));
        assert!(svg.contains("<metadata>"));
        assert!(svg.contains("georoots:assessment"));
    }
}
