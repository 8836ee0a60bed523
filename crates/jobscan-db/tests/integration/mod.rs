pub mod common;
mod harvest_run_tests;
mod listing_tests;
