//! Core system components for distance measurement and delivery
pub mod config;
pub mod connection;
pub mod link;
pub mod notification;
pub mod pipeline;
pub mod ranging;
pub mod smoothing;
pub mod transport;
