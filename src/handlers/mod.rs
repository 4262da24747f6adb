//! HTTP handlers

pub mod health;
pub mod auth;
pub mod analyze;
pub mod reports;
pub mod actions;
pub mod rules;
pub mod metrics;
pub mod export;
pub mod audit;
pub mod catalog;
pub mod uploads;
