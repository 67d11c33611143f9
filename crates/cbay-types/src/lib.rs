pub mod api;
pub mod filter;
pub mod models;
pub mod money;
pub mod validation;
