pub mod bot;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod input;
pub mod league;
pub mod models;
pub mod ranking;
pub mod repository;
pub mod scoring;
pub mod streak;
