pub mod chart;
pub mod config;
pub mod db;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod session;
pub mod util;
pub mod web;

pub use error::AppError;
