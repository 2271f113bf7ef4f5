pub mod analytics_service;
pub mod market_data_service;
pub mod projection_service;
pub mod render_service;
pub mod render_session;
