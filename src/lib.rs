pub mod app;
pub mod betaseries;
pub mod config;
pub mod error;
pub mod ids;
pub mod lang;
pub mod models;
pub mod resolve;
pub mod select;
pub mod tmdb;
pub mod tvdb;
pub mod utils;
pub mod yify;
