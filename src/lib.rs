//! Productivity tracker bot: daily self-scoring over Telegram.

pub mod bot;
pub mod channels;
pub mod config;
pub mod controller;
pub mod error;
pub mod render;
pub mod scoring;
pub mod session;
pub mod store;
pub mod supervisor;
pub mod web;
