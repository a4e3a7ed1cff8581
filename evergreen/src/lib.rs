pub mod api;
pub mod client;
pub mod config;
pub mod db;
pub mod dialogs;
pub mod error;
pub mod hierarchy;
pub mod models;
pub mod services;
pub mod views;
