// Summary image rendering with plotters
use crate::application::summary_renderer::SummaryRenderer;
use crate::domain::country::Country;
use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use plotters::prelude::*;
use plotters_bitmap::BitMapBackend;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Once;

/// One-time registration of a fallback "sans-serif" font for the `ab_glyph`
/// text path, which does not discover OS fonts.
static INIT_FONTS: Once = Once::new();

fn ensure_fonts_registered() {
    INIT_FONTS.call_once(|| {
        let _ = plotters::style::register_font(
            "sans-serif",
            plotters::style::FontStyle::Normal,
            include_bytes!("../../assets/DejaVuSans.ttf"),
        );
    });
}

const WIDTH: u32 = 800;
const HEIGHT: u32 = 600;
const HEADER_HEIGHT: i32 = 80;
const LEFT_MARGIN: i32 = 50;

const HEADER_COLOR: RGBColor = RGBColor(41, 128, 185);
const TEXT_COLOR: RGBColor = RGBColor(44, 62, 80);

/// Renders the summary PNG to a well-known cache path. The image is drawn
/// into a temp file in the same directory and atomically moved into place,
/// so a previously valid image is never partially overwritten.
#[derive(Debug, Clone)]
pub struct PlottersSummaryRenderer {
    output_path: PathBuf,
}

impl PlottersSummaryRenderer {
    pub fn new(output_path: PathBuf) -> Self {
        Self { output_path }
    }
}

impl SummaryRenderer for PlottersSummaryRenderer {
    fn render(
        &self,
        total_countries: i64,
        last_refreshed_at: Option<DateTime<Utc>>,
        top_gdp_countries: &[Country],
    ) -> Result<()> {
        let dir = self.output_path.parent().unwrap_or(Path::new("."));
        fs::create_dir_all(dir).context("failed to create the image cache directory")?;

        let temp_path = tempfile::Builder::new()
            .prefix("summary-")
            .suffix(".png")
            .tempfile_in(dir)
            .context("failed to create a temp file for the summary image")?
            .into_temp_path();

        draw_summary(&temp_path, total_countries, last_refreshed_at, top_gdp_countries)?;

        temp_path
            .persist(&self.output_path)
            .context("failed to move the summary image into place")?;

        Ok(())
    }
}

fn draw_summary(
    path: &Path,
    total_countries: i64,
    last_refreshed_at: Option<DateTime<Utc>>,
    top_gdp_countries: &[Country],
) -> Result<()> {
    ensure_fonts_registered();

    let path_string = path.to_string_lossy().to_string();
    let root = BitMapBackend::new(path_string.as_str(), (WIDTH, HEIGHT)).into_drawing_area();
    root.fill(&WHITE).map_err(|e| anyhow!("{:?}", e))?;

    let title_style = TextStyle::from((FontFamily::SansSerif, 24u32)).color(&WHITE);
    let heading_style = TextStyle::from((FontFamily::SansSerif, 20u32)).color(&HEADER_COLOR);
    let body_style = TextStyle::from((FontFamily::SansSerif, 18u32)).color(&TEXT_COLOR);

    // Header bar with centered title
    root.draw(&Rectangle::new(
        [(0, 0), (WIDTH as i32, HEADER_HEIGHT)],
        HEADER_COLOR.filled(),
    ))
    .map_err(|e| anyhow!("{:?}", e))?;

    let title = "Country Data Summary";
    let (title_width, title_height) = root
        .estimate_text_size(title, &title_style)
        .map_err(|e| anyhow!("{:?}", e))?;
    let title_x = ((WIDTH.saturating_sub(title_width)) / 2) as i32;
    let title_y = (HEADER_HEIGHT - title_height as i32) / 2;
    root.draw(&Text::new(title, (title_x, title_y), title_style))
        .map_err(|e| anyhow!("{:?}", e))?;

    let refreshed = match last_refreshed_at {
        Some(ts) => ts.to_rfc3339(),
        None => "never".to_string(),
    };

    let mut y = 120;
    root.draw(&Text::new(
        "Last Refreshed:",
        (LEFT_MARGIN, y),
        heading_style.clone(),
    ))
    .map_err(|e| anyhow!("{:?}", e))?;
    y += 30;
    root.draw(&Text::new(
        refreshed.as_str(),
        (LEFT_MARGIN, y),
        body_style.clone(),
    ))
    .map_err(|e| anyhow!("{:?}", e))?;

    y += 60;
    root.draw(&Text::new(
        "Total Countries:",
        (LEFT_MARGIN, y),
        heading_style.clone(),
    ))
    .map_err(|e| anyhow!("{:?}", e))?;
    y += 30;
    root.draw(&Text::new(
        total_countries.to_string(),
        (LEFT_MARGIN, y),
        body_style.clone(),
    ))
    .map_err(|e| anyhow!("{:?}", e))?;

    y += 60;
    root.draw(&Text::new(
        "Top 5 Countries by GDP",
        (LEFT_MARGIN, y),
        heading_style,
    ))
    .map_err(|e| anyhow!("{:?}", e))?;
    y += 40;

    for (position, country) in top_gdp_countries.iter().take(5).enumerate() {
        let gdp = match country.estimated_gdp {
            Some(value) => format!("{value:.2}"),
            None => "N/A".to_string(),
        };
        let line = format!("{}. {} - {}", position + 1, country.name, gdp);
        root.draw(&Text::new(line, (LEFT_MARGIN, y), body_style.clone()))
            .map_err(|e| anyhow!("{:?}", e))?;
        y += 35;
    }

    root.present().map_err(|e| anyhow!("{:?}", e))?;
    Ok(())
}
