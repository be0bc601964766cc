//! Outer adapters: the CSV file formats and the scenario runner behind the CLI.

pub mod csv;
pub mod runner;
