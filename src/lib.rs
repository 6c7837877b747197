//! Event catalog reconciliation library - shared modules for all binaries.

pub mod apply;
pub mod catalog;
pub mod config;
pub mod consistency;
pub mod corpus;
pub mod extract;
pub mod index;
pub mod models;
pub mod normalize;
pub mod progress;
pub mod reconcile;
pub mod report;
pub mod safety;
pub mod scoring;
