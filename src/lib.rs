#![doc = "auto-reviewer: generate and publish a review report from date-ranged documents."]

//! This crate fetches journal documents from a document-store folder for a
//! date range, sends their text to a language-model completion endpoint, and
//! publishes the generated report as a new document.
//!
//! The pipeline is strictly linear: config → locate → extract → generate →
//! publish, orchestrated by [`review`]. The store and completion endpoints are
//! behind the traits in [`contract`], so every stage is testable with mocks.

pub mod auth;
pub mod cli;
pub mod config;
pub mod contract;
pub mod extract;
pub mod generate;
pub mod google;
pub mod locate;
pub mod openai;
pub mod publish;
pub mod retry;
pub mod review;
