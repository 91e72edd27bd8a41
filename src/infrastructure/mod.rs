// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod sqlite_repository;
pub mod summary_image;
pub mod upstream;
