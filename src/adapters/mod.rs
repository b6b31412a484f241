//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits defined in `crate::ports` with concrete
//! external dependencies (HTTP clients, file I/O, axum). Each
//! sub-module groups adapters by infrastructure concern.
//!
//! Adapter categories:
//! - `api`: consumer and operations HTTP endpoints (axum)
//! - `connectivity`: online/offline detection
//! - `metrics`: Prometheus registry
//! - `persistence`: snapshot cache storage
//! - `sources`: upstream market data APIs

pub mod api;
pub mod connectivity;
pub mod metrics;
pub mod persistence;
pub mod sources;
