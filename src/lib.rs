pub mod config;
pub mod i18n;
pub mod kv;
pub mod server;
pub mod theme;
pub mod values;
