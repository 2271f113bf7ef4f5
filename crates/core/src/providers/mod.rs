pub mod registry;
pub mod traits;

// Backend clients
pub mod backend_proxy;
pub mod news;
pub mod technical_analysis;
#[cfg(not(target_arch = "wasm32"))]
pub mod yahoo_finance;
