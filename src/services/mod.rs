pub mod callback;
pub mod fetcher;
pub mod file_store;
pub mod session_config;
