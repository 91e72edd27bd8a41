// Renderer trait for the cached summary image
use crate::domain::country::Country;
use chrono::{DateTime, Utc};

pub trait SummaryRenderer: Send + Sync {
    /// Render the summary image (country count, batch timestamp, top five
    /// by GDP) to the well-known cache path.
    fn render(
        &self,
        total_countries: i64,
        last_refreshed_at: Option<DateTime<Utc>>,
        top_gdp_countries: &[Country],
    ) -> anyhow::Result<()>;
}
