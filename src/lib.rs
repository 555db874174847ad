// Enforce at crate level
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]

//! Parcel Tracking Number Extraction
//!
//! Finds shipping tracking numbers in free text and decides which carrier
//! each one belongs to.
//!
//! # Features
//!
//! - Priority-ordered carrier detection for single numbers
//! - Extraction from plain text, HTML fragments and raw email messages
//! - Checksum validation (mod7, mod10, S10, weighted modulo, mod 37/36, Luhn)
//!   driven by a JSON courier catalog, embedded or loaded from a directory
//! - Partner attribution (an S10 number with country code US is USPS)
//! - Per-carrier configuration of strategy, priority and enablement
//!
//! # Example
//!
//! ```rust
//! use parcel_extract::CarrierRegistry;
//!
//! let registry = CarrierRegistry::builtin().unwrap();
//!
//! assert_eq!(registry.detect_carrier_id("1Z999AA10123456784"), Some("UPS"));
//!
//! let found = registry.extract_tracking_numbers("Your package 1Z999AA10123456784 shipped");
//! assert_eq!(found[0].carrier_id, "UPS");
//! assert_eq!(found[0].number, "1Z999AA10123456784");
//! ```

mod carrier;
pub mod carriers;
mod catalog;
pub mod checksum;
mod config;
mod detector;
mod error;
mod message;
mod registry;
mod text;

pub use carrier::*;
pub use catalog::*;
pub use checksum::ChecksumSpec;
pub use config::{CarrierOverride, RegistryConfig};
pub use detector::{Detector, MatchResult, NamedGroups};
pub use error::{Result, TrackingError};
pub use message::{ScannedMessage, scan_message};
pub use registry::{CarrierOption, CarrierRegistry, ExtractedTrackingNumber};
pub use text::*;
