//! # amt-types
//!
//! Shared vocabulary for working with an Australian Medicines Terminology
//! (AMT) release distributed inside SNOMED CT-AU RF2 snapshot files.
//!
//! This crate provides:
//! - **Identifiers**: [`SctId`] and the well-known module, attribute,
//!   reference set and model concept identifiers in [`well_known`]
//! - **Product model**: the seven [`Classification`]s (CTPP, TPP, TPUU, TP,
//!   MPP, MPUU, MP) and the recognised [`AttributeType`]s
//! - **RF2 records**: typed rows built from pre-split, tab-delimited fields
//!   (see [`rf2`])
//!
//! ## Usage
//!
//! ```rust
//! use amt_types::rf2::{split_row, Rf2Concept};
//! use amt_types::{well_known, Classification};
//!
//! let fields = split_row("30537011000036101\t20180430\t1\t900062011000036108\t900000000000074008");
//! let concept = Rf2Concept::from_fields(&fields).unwrap();
//! assert!(concept.active);
//! assert_eq!(concept.module_id, well_known::AMT_MODULE);
//!
//! assert_eq!(
//!     Classification::from_refset_id(well_known::CTPP_REFSET),
//!     Some(Classification::Ctpp)
//! );
//! ```
//!
//! ## Product model quick reference
//!
//! | Tag | Meaning |
//! |-----|---------|
//! | CTPP | Containered trade product pack |
//! | TPP | Trade product pack |
//! | TPUU | Trade product unit of use |
//! | TP | Trade product (brand name) |
//! | MPP | Medicinal product pack |
//! | MPUU | Medicinal product unit of use |
//! | MP | Medicinal product (ingredient level) |

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod attribute;
mod classification;
mod error;
pub mod rf2;
pub mod sctid;
pub mod well_known;

pub use attribute::{AttributeType, LinkKind};
pub use classification::Classification;
pub use error::{Rf2Error, Rf2Result};
pub use sctid::ComponentKind;

/// SNOMED CT Identifier type (64-bit unsigned integer).
pub type SctId = u64;
