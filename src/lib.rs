pub mod browser;
pub mod capture;
pub mod config;
pub mod http_client;
pub mod normalize;
pub mod record;
pub mod sources;
pub mod store;
pub mod webdriver;
