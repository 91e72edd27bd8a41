// Application state for HTTP handlers
use crate::application::country_service::CountryService;
use std::path::PathBuf;

#[derive(Clone)]
pub struct AppState {
    pub country_service: CountryService,
    pub summary_image_path: PathBuf,
}
