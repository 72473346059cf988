//! Fleet maintenance scheduling service
//!
//! Turns vehicle telemetry into maintenance flags, books flagged vehicles
//! into service-center bays without overbooking, forecasts regional demand
//! and ties the steps together in an orchestration cycle.

pub mod clients;
pub mod config;
pub mod controllers;
pub mod database;
pub mod dto;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;
