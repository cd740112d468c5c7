pub mod app_state;
pub mod cache;
pub mod config;
pub mod connectivity;
pub mod db;
pub mod errors;
pub mod models;
pub mod remote;
pub mod repositories;
pub mod services;
pub mod token;
pub mod validation;

#[cfg(test)]
pub mod test_utils;
