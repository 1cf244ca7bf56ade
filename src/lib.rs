//! Zonefinder - point-in-zone lookups over KML boundary documents
//!
//! This library provides the parser, spatial index and query service shared
//! by the ingest and query binaries.

pub mod config;
pub mod error;
pub mod export;
pub mod kml;
pub mod models;
pub mod pip;
pub mod service;

pub use error::{ParseError, ServiceError};
pub use export::render_report;
pub use models::{BoundingBox, Coordinate, QueryResult, Zone};
pub use service::{LoadOutcome, LoadReport, QueryOutcome, QueryService, ServiceStatus};
