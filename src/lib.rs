//! RSS Aggregator - a feed scraper with a JSON API
//!
//! Users register, create or follow feeds, and a background scheduler
//! periodically fetches each feed and stores new posts.

pub mod auth;
pub mod config;
pub mod db;
pub mod fetcher;
pub mod ingest;
pub mod routes;
pub mod scheduler;
