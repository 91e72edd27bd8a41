// HTTP request handlers
use crate::application::country_service::RefreshSummary;
use crate::application::error::ServiceError;
use crate::domain::country::{Country, CountryStatus, GdpSort};
use crate::presentation::app_state::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

/// Maps service errors onto HTTP statuses: the two upstream failures are
/// 503 (dependency outage), rendering and storage faults are 500, lookups
/// 404, bad sort keys 400.
pub struct ApiError(ServiceError);

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ServiceError::CountryData(_)
            | ServiceError::InvalidCountryPayload(_)
            | ServiceError::ExchangeRate(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::ImageGeneration(_) | ServiceError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ServiceError::NotFound => StatusCode::NOT_FOUND,
            ServiceError::InvalidSort => StatusCode::BAD_REQUEST,
        };

        if status.is_server_error() {
            tracing::error!(error = ?self.0, "request failed");
        }

        // The message never carries source details, only the taxonomy text.
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub region: Option<String>,
    pub currency: Option<String>,
    pub sort: Option<String>,
}

/// `GET /status`
pub async fn get_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CountryStatus>, ApiError> {
    Ok(Json(state.country_service.status().await?))
}

/// `POST /countries/refresh`
pub async fn refresh_countries(
    State(state): State<Arc<AppState>>,
) -> Result<Json<RefreshSummary>, ApiError> {
    let summary = state.country_service.refresh().await?;
    Ok(Json(summary))
}

/// `GET /countries` - all rows, or filtered by exactly one of `region`,
/// `currency` or `sort`. When several are supplied, region wins over
/// currency, which wins over sort.
pub async fn list_countries(
    Query(query): Query<ListQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Country>>, ApiError> {
    let service = &state.country_service;

    let countries = if let Some(region) = query.region {
        service.countries_by_region(&title_case(&region)).await?
    } else if let Some(currency) = query.currency {
        service.countries_by_currency(&currency.to_uppercase()).await?
    } else if let Some(sort) = query.sort {
        let order = sort
            .to_lowercase()
            .parse::<GdpSort>()
            .map_err(|_| ServiceError::InvalidSort)?;
        service.countries_by_gdp(order).await?
    } else {
        service.list_countries().await?
    };

    Ok(Json(countries))
}

/// `GET /countries/{name}` - case-insensitive on name.
pub async fn get_country_by_name(
    Path(name): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Country>, ApiError> {
    Ok(Json(state.country_service.get_country(&name).await?))
}

/// `DELETE /countries/{name}`
pub async fn delete_country(
    Path(name): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<StatusCode, ApiError> {
    state.country_service.delete_country(&name).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /countries/image` - serves the cached summary PNG.
pub async fn serve_summary_image(State(state): State<Arc<AppState>>) -> Response {
    match tokio::fs::read(&state.summary_image_path).await {
        Ok(bytes) => ([(header::CONTENT_TYPE, "image/png")], bytes).into_response(),
        Err(_) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Summary image not found" })),
        )
            .into_response(),
    }
}

/// Title-case every whitespace-separated word ("sub-saharan africa" ->
/// "Sub-saharan Africa"), mirroring how regions are stored upstream.
fn title_case(value: &str) -> String {
    value
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
