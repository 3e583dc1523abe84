//! Standalone SVG rendering of the equity curve and its drawdown.

use crate::domain::metrics::drawdown_series;
use crate::domain::portfolio::EquityPoint;

const WIDTH: f64 = 800.0;
const EQUITY_HEIGHT: f64 = 300.0;
const DRAWDOWN_HEIGHT: f64 = 120.0;
const PADDING: f64 = 40.0;

/// Equity polyline on top, drawdown area underneath.
pub fn generate_equity_svg(equity_curve: &[EquityPoint]) -> String {
    let total_height = EQUITY_HEIGHT + DRAWDOWN_HEIGHT + PADDING;
    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w:.0}" height="{h:.0}" viewBox="0 0 {w:.0} {h:.0}">
<rect width="100%" height="100%" fill="white"/>
"#,
        w = WIDTH,
        h = total_height
    );

    if equity_curve.is_empty() {
        svg.push_str(&format!(
            "<text x=\"{:.0}\" y=\"{:.0}\" text-anchor=\"middle\">No equity data available.</text>\n",
            WIDTH / 2.0,
            total_height / 2.0
        ));
        svg.push_str("</svg>\n");
        return svg;
    }

    let values: Vec<f64> = equity_curve.iter().map(|p| p.value).collect();
    let min_value = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max_value = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let plot_width = WIDTH - 2.0 * PADDING;
    let scale_x = if values.len() > 1 {
        plot_width / (values.len() - 1) as f64
    } else {
        0.0
    };

    // Equity panel
    let plot_height = EQUITY_HEIGHT - 2.0 * PADDING;
    let range = max_value - min_value;
    let scale_y = if range > 0.0 { plot_height / range } else { 0.0 };
    let mid = if range > 0.0 { 0.0 } else { plot_height / 2.0 };
    let equity_points: Vec<String> = values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let x = PADDING + i as f64 * scale_x;
            let y = EQUITY_HEIGHT - PADDING - (v - min_value) * scale_y - mid;
            format!("{:.1},{:.1}", x, y)
        })
        .collect();

    svg.push_str(&axes(PADDING, EQUITY_HEIGHT - PADDING, plot_width, plot_height));
    svg.push_str(&format!(
        "<polyline class=\"equity\" fill=\"none\" stroke=\"#1f77b4\" stroke-width=\"1.5\" points=\"{}\"/>\n",
        equity_points.join(" ")
    ));
    svg.push_str(&format!(
        "<text x=\"{:.0}\" y=\"{:.0}\" font-size=\"12\">{:.2}</text>\n<text x=\"{:.0}\" y=\"{:.0}\" font-size=\"12\">{:.2}</text>\n",
        2.0,
        PADDING,
        max_value,
        2.0,
        EQUITY_HEIGHT - PADDING,
        min_value
    ));

    // Drawdown panel
    let drawdowns = drawdown_series(equity_curve);
    let worst = drawdowns.iter().copied().fold(0.0_f64, f64::min);
    let top = EQUITY_HEIGHT + PADDING / 2.0;
    let dd_height = DRAWDOWN_HEIGHT - PADDING / 2.0;
    let dd_scale = if worst < 0.0 { dd_height / -worst } else { 0.0 };
    let mut area: Vec<String> = vec![format!("{:.1},{:.1}", PADDING, top)];
    area.extend(drawdowns.iter().enumerate().map(|(i, dd)| {
        let x = PADDING + i as f64 * scale_x;
        let y = top - dd * dd_scale;
        format!("{:.1},{:.1}", x, y)
    }));
    area.push(format!("{:.1},{:.1}", PADDING + (values.len() - 1) as f64 * scale_x, top));

    svg.push_str(&axes(PADDING, top + dd_height, plot_width, dd_height));
    svg.push_str(&format!(
        "<polygon class=\"drawdown\" fill=\"#d62728\" fill-opacity=\"0.4\" stroke=\"#d62728\" points=\"{}\"/>\n",
        area.join(" ")
    ));
    svg.push_str(&format!(
        "<text x=\"{:.0}\" y=\"{:.0}\" font-size=\"12\">{:.2}%</text>\n",
        2.0,
        top + dd_height,
        worst * 100.0
    ));

    svg.push_str("</svg>\n");
    svg
}

fn axes(x0: f64, y0: f64, width: f64, height: f64) -> String {
    format!(
        "<line x1=\"{x0:.1}\" y1=\"{y0:.1}\" x2=\"{x1:.1}\" y2=\"{y0:.1}\" stroke=\"#444\"/>\n<line x1=\"{x0:.1}\" y1=\"{y0:.1}\" x2=\"{x0:.1}\" y2=\"{y1:.1}\" stroke=\"#444\"/>\n",
        x0 = x0,
        y0 = y0,
        x1 = x0 + width,
        y1 = y0 - height
    )
}
