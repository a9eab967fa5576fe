//! NightOwl storefront library.
//!
//! This crate provides the storefront server as a library, allowing it to be
//! tested and driven from the CLI.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod settings;
pub mod slack;
pub mod state;
