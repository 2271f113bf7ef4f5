pub mod analytics;
pub mod annotation;
pub mod asset;
pub mod chart_analysis;
pub mod news;
pub mod portfolio;
pub mod price;
pub mod projection;
pub mod settings;
