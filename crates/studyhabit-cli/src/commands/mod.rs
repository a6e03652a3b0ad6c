pub mod achievement;
pub mod config;
pub mod emotion;
pub mod estimator;
pub mod profile;
pub mod session;
pub mod shop;
pub mod stats;
pub mod subject;
pub mod todo;
