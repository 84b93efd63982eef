//! Wire-protocol codec for the Ning web-chat dialect.
//!
//! Ning speaks an ad-hoc JSON dialect over plain HTTP: the login page
//! embeds a JSON profile block inside HTML, chat endpoints answer with
//! loosely-typed JSON objects, and outgoing payloads are JSON strings
//! percent-encoded into form bodies. This crate owns all of that text
//! handling; it never performs I/O.

pub mod chat;
pub mod encode;
pub mod json;
pub mod scrape;
pub mod time;
pub mod user;
