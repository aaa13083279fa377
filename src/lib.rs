pub mod database_ops;
pub mod logging;
pub mod normalization;
pub mod orchestrator;

pub mod util {
    pub mod db;
    pub mod env;
}
