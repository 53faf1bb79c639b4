//! Interface layer - HTTP control API

pub mod api;
