//! NovaMart Analytics
//!
//! Data engine behind the NovaMart marketing dashboard: loads the
//! marketing datasets, aggregates them, and prepares renderer-neutral chart
//! descriptions and metric cards for each dashboard page.
//!
//! This crate provides the core implementation for the
//! `novamart` CLI tool.
//!
//! ## Getting Started
//!
//! ```bash
//! novamart --data-dir marketing_dataset render --page executive
//! novamart --help
//! ```
//!
//! Library users go through [`pages::render_page`] or call a page's
//! `build` function with a [`source::TableCache`].

pub mod aggregator;
pub mod chart;
pub mod commands;
pub mod output;
pub mod pages;
pub mod source;
pub mod utils;
