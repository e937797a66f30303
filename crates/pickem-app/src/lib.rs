// Library root: re-exports all modules so integration tests and the binary
// can reach config, persistence, providers and the grading pipeline.

pub mod config;
pub mod db;
pub mod forms_json;
pub mod grading;
pub mod providers;
pub mod results_csv;
