use std::io::Cursor;
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use plotters::prelude::LineSeries;
use plotters::prelude::*;
use crate::drivers::error::ScanError;
use crate::drivers::history::BandHistory;
use crate::types::Band;
#[derive(Clone, Debug)]
pub struct PlotStyle {
    pub width: u32,
    pub height: u32,
    pub background: RGBColor,
    pub palette: Vec<RGBColor>,
}
impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            background: RGBColor(10, 10, 10),
            palette: vec![BLUE, RED, GREEN, CYAN, MAGENTA],
        }
    }
}
/// Renders the band history (one line per band, oldest epoch on the left) as PNG.
pub fn render_band_history_png(
    history: &BandHistory,
    style: PlotStyle,
) -> Result<Vec<u8>, ScanError> {
    if style.palette.is_empty() {
        return Err(ScanError::Plot("palette has no colors".into()));
    }
    let series: Vec<(Band, Vec<f64>)> = Band::ALL
        .iter()
        .map(|band| (*band, history.series(*band)))
        .collect();
    let finite = || {
        series
            .iter()
            .flat_map(|(_, values)| values.iter().copied())
            .filter(|v| v.is_finite())
    };
    let y_min = finite().fold(0.0f64, f64::min);
    let y_max = finite().fold(0.0f64, f64::max);
    let (y_min, y_max) = if (y_max - y_min).abs() < f64::EPSILON {
        (y_min - 1.0, y_max + 1.0)
    } else {
        (y_min, y_max)
    };
    let mut buffer = vec![0u8; (style.width * style.height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (style.width, style.height))
            .into_drawing_area();
        root.fill(&style.background)?;
        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .caption("Brain Waves", ("sans-serif", 20).into_font().color(&WHITE))
            .set_label_area_size(LabelAreaPosition::Left, 45)
            .set_label_area_size(LabelAreaPosition::Bottom, 40)
            .build_cartesian_2d(0f64..history.epochs().max(2) as f64 - 1.0, y_min..y_max)?;
        chart
            .configure_mesh()
            .x_desc("epoch")
            .y_desc("log10 power")
            .light_line_style(&WHITE.mix(0.1))
            .draw()?;
        for (idx, (band, values)) in series.iter().enumerate() {
            let color = style.palette[idx % style.palette.len()];
            let points = values
                .iter()
                .enumerate()
                .filter(|(_, v)| v.is_finite())
                .map(|(i, v)| (i as f64, *v));
            chart
                .draw_series(LineSeries::new(points, &color))?
                .label(band.label())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &color));
        }
        chart
            .configure_series_labels()
            .border_style(&WHITE.mix(0.2))
            .background_style(&style.background)
            .draw()?;
        root.present()?;
    }
    encode_png(&buffer, style.width, style.height)
}
fn encode_png(buffer: &[u8], width: u32, height: u32) -> Result<Vec<u8>, ScanError> {
    let image = ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, buffer.to_vec())
        .ok_or_else(|| ScanError::Plot("failed to allocate image buffer".into()))?;
    let mut output = Vec::new();
    let dynamic = DynamicImage::ImageRgb8(image);
    dynamic.write_to(&mut Cursor::new(&mut output), ImageFormat::Png)?;
    Ok(output)
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BandPowers;
    #[test]
    fn renders_png_for_history() {
        let mut history = BandHistory::new(21).unwrap();
        for i in 0..10 {
            history.push(&BandPowers([0.1 * i as f64, 0.5, 1.0, -0.2, -0.5]));
        }
        let png = render_band_history_png(&history, PlotStyle::default()).unwrap();
        assert_eq!(&png[1..4], b"PNG");
    }
    #[test]
    fn empty_palette_is_rejected() {
        let history = BandHistory::new(3).unwrap();
        let style = PlotStyle {
            palette: vec![],
            ..PlotStyle::default()
        };
        assert!(render_band_history_png(&history, style).is_err());
    }
}
