pub mod callback;
pub mod client_config;
pub mod files;
pub mod health;
pub mod pages;
pub mod sessions;
