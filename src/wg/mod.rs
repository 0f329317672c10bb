pub mod client;
pub mod conf;
pub mod keys;
pub mod service;
