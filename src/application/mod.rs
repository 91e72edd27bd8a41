// Application layer - Ports and use cases
pub mod country_repository;
pub mod country_service;
pub mod error;
pub mod summary_renderer;
pub mod upstream_gateway;
