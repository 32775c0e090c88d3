pub mod controller;
pub mod evaluation;
pub mod ingest;
pub mod models;
pub mod rl;
pub mod utils;
