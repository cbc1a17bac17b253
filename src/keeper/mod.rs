pub mod audit;
pub mod cache;
pub mod config;
pub mod entry;
pub mod extract;
pub mod guard;
pub mod history;
pub mod manifest;
pub mod models;
pub mod mutate;
pub mod paths;
pub mod reconcile;
pub mod scanner;
pub mod scripts;
pub mod usage;
pub mod util;
