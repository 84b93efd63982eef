//! `ningchat` — client backend for the Ning web-chat protocol.

pub mod account;
pub mod auth;
pub mod config;
pub mod contacts;
pub mod http;
pub mod room;
