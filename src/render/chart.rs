//! Toxicity confidence bar chart.

use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use super::error::RenderError;
use super::{encode_png, ensure_font, RasterImage, FONT_FAMILY};
use crate::toxicity::ToxicityProfile;

const TITLE: &str = "Toxicity Endpoints Confidence Scores";
const Y_DESC: &str = "Confidence Score";
const Y_MAX: f64 = 1.1;
pub(crate) const BAR_COLOR: RGBColor = RGBColor(0x4C, 0xAF, 0x50);
const GRID_COLOR: RGBColor = RGBColor(0xB0, 0xB0, 0xB0);
const AXIS_COLOR: RGBColor = RGBColor(0x30, 0x30, 0x30);

/// One bar per endpoint, in profile order.
pub fn render_confidence_chart(
    profile: &ToxicityProfile,
    width: u32,
    height: u32,
) -> Result<RasterImage, RenderError> {
    if width < 200 || height < 150 {
        return Err(RenderError::InvalidCanvas { width, height });
    }
    let mut pixels = vec![255u8; width as usize * height as usize * 3];
    {
        let root = BitMapBackend::with_buffer(&mut pixels, (width, height)).into_drawing_area();
        draw_chart(&root, profile)?;
    }
    encode_png(pixels, width, height)
}

fn draw_chart<DB: DrawingBackend>(
    root: &DrawingArea<DB, plotters::coord::Shift>,
    profile: &ToxicityProfile,
) -> Result<(), RenderError> {
    ensure_font()?;
    root.fill(&WHITE).map_err(RenderError::backend)?;
    let entries = profile.entries();
    let n = entries.len().max(1) as f64;

    let mut chart = ChartBuilder::on(root)
        .margin(20)
        .x_label_area_size(70)
        .y_label_area_size(80)
        .caption(TITLE, (FONT_FAMILY, 26))
        .build_cartesian_2d(0.0..n, 0.0..Y_MAX)
        .map_err(RenderError::backend)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(0)
        .y_labels(12)
        .y_label_formatter(&|v| format!("{v:.1}"))
        .y_desc(Y_DESC)
        .label_style((FONT_FAMILY, 15))
        .draw()
        .map_err(RenderError::backend)?;

    // Dashed horizontal grid.
    let dash = n / 200.0;
    for step in 1..=5 {
        let y = f64::from(step) * 0.2;
        let mut segments = Vec::new();
        let mut x = 0.0;
        while x < n {
            segments.push(PathElement::new(
                vec![(x, y), ((x + dash).min(n), y)],
                GRID_COLOR.stroke_width(1),
            ));
            x += 2.0 * dash;
        }
        chart.draw_series(segments).map_err(RenderError::backend)?;
    }

    chart
        .draw_series([
            PathElement::new(vec![(0.0, 0.0), (n, 0.0)], AXIS_COLOR.stroke_width(1)),
            PathElement::new(vec![(0.0, 0.0), (0.0, Y_MAX)], AXIS_COLOR.stroke_width(1)),
        ])
        .map_err(RenderError::backend)?;

    chart
        .draw_series(entries.iter().enumerate().map(|(i, e)| {
            let x = i as f64;
            Rectangle::new([(x + 0.15, 0.0), (x + 0.85, e.probability)], BAR_COLOR.filled())
        }))
        .map_err(RenderError::backend)?;

    let value_style = (FONT_FAMILY, 15)
        .into_font()
        .color(&BLACK)
        .pos(Pos::new(HPos::Center, VPos::Bottom));
    chart
        .draw_series(entries.iter().enumerate().map(|(i, e)| {
            Text::new(
                format!("{:.2}", e.probability),
                (i as f64 + 0.5, e.probability + 0.01),
                value_style.clone(),
            )
        }))
        .map_err(RenderError::backend)?;

    // Alternate rows keep long endpoint names from colliding.
    let name_style = (FONT_FAMILY, 14)
        .into_font()
        .color(&BLACK)
        .pos(Pos::new(HPos::Center, VPos::Top));
    for (i, e) in entries.iter().enumerate() {
        let (x, y) = chart.backend_coord(&(i as f64 + 0.5, 0.0));
        let row = if i % 2 == 0 { 8 } else { 28 };
        root.draw(&Text::new(e.endpoint, (x, y + row), name_style.clone()))
            .map_err(RenderError::backend)?;
    }

    root.present().map_err(RenderError::backend)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toxicity::ENDPOINTS;

    fn profile(p: f64) -> ToxicityProfile {
        ToxicityProfile::from_probabilities(&[p; ENDPOINTS.len()]).unwrap()
    }

    fn bar_pixels(image: &RasterImage) -> usize {
        let decoded = image::load_from_memory(image.png()).unwrap().to_rgb8();
        decoded
            .pixels()
            .filter(|p| p.0 == [BAR_COLOR.0, BAR_COLOR.1, BAR_COLOR.2])
            .count()
    }

    #[test]
    fn png_with_requested_size() {
        let chart = render_confidence_chart(&profile(0.3), 1200, 600).unwrap();
        assert_eq!((chart.width(), chart.height()), (1200, 600));
        assert_eq!(&chart.png()[..4], b"\x89PNG");
    }

    #[test]
    fn bars_grow_with_confidence() {
        let low = bar_pixels(&render_confidence_chart(&profile(0.1), 1200, 600).unwrap());
        let high = bar_pixels(&render_confidence_chart(&profile(0.9), 1200, 600).unwrap());
        assert!(low > 0);
        assert!(high > 5 * low);
    }

    /// Pixels darker than every bar, grid and background color.
    fn ink(image: &RasterImage, rows: std::ops::Range<u32>) -> usize {
        let decoded = image::load_from_memory(image.png()).unwrap().to_rgb8();
        rows.flat_map(|y| (0..decoded.width()).map(move |x| (x, y)))
            .filter(|&(x, y)| decoded.get_pixel(x, y).0.iter().all(|&c| c < 0x60))
            .count()
    }

    #[test]
    fn title_and_endpoint_names_are_drawn() {
        let chart = render_confidence_chart(&profile(0.3), 1200, 600).unwrap();
        // Caption band above the plot area.
        assert!(ink(&chart, 0..45) > 200);
        // Endpoint names below the x axis, which sits at row 510.
        assert!(ink(&chart, 514..590) > 500);
    }

    #[test]
    fn value_labels_sit_above_the_bars() {
        // Bars of 0.3 top out near row 385; bars of 0.9 pass through the
        // band, so only the low profile has labels in it.
        let low = render_confidence_chart(&profile(0.3), 1200, 600).unwrap();
        let high = render_confidence_chart(&profile(0.9), 1200, 600).unwrap();
        assert!(ink(&low, 330..384) > ink(&high, 330..384) + 100);
    }

    #[test]
    fn tiny_canvas_is_rejected() {
        assert!(render_confidence_chart(&profile(0.5), 10, 10).is_err());
    }

    #[test]
    fn deterministic() {
        let p = ToxicityProfile::from_probabilities(&[0.05, 0.2, 0.5, 0.51, 0.9, 1.0, 0.0, 0.3, 0.7, 0.6, 0.4, 0.8])
            .unwrap();
        assert_eq!(
            render_confidence_chart(&p, 1200, 600).unwrap(),
            render_confidence_chart(&p, 1200, 600).unwrap()
        );
    }
}
