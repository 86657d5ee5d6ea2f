//! Presentation layer: event-type registry XML, event output (XML/CSV), and the
//! export pass that ties them together.

pub mod config;
pub mod csv_export;
pub mod events_xml;
pub mod exporter;
pub mod registry_xml;

pub use config::Config;
pub use exporter::export_all;
pub use registry_xml::{read_registry, write_registry};
