// Domain layer - Core entities
pub mod country;
