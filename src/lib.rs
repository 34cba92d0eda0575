//! Ticket store, report aggregation and staff workflow for a university
//! ombudsman office.

pub mod api;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod models;
pub mod notify;
pub mod report;
