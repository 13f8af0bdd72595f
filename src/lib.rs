pub mod api;
pub mod config;
pub mod db;
pub mod docs;
pub mod engine;
pub mod model;
pub mod repo;
pub mod routes;
