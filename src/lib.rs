//! Environmental Assessment Index (EAI) engine.
//!
//! Raw water and sediment readings are normalized per parameter against a
//! [`Profile`](engine::standards::Profile) of standards, combined under the
//! profile's aggregation law, and classified into a severity band.
//!
//! ```
//! use eai_assess::engine::{self, MeasurementSet, Variant, standards::Profile};
//!
//! let mut sample = MeasurementSet::new();
//! sample.insert("ph".to_string(), Some(7.5));
//! sample.insert("nh3".to_string(), Some(1.0));
//!
//! let result = engine::assess(Profile::builtin(Variant::Geometric), &sample);
//! assert!(result.index.is_some());
//! ```

pub mod cli;
pub mod config;
pub mod engine;
pub mod ingest;
pub mod utils;
