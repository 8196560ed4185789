pub mod config;
pub mod fetch;
pub mod grid;
pub mod nonrev;
pub mod panel;
pub mod triangle;
