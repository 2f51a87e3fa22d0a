//! Well-known SNOMED CT-AU and AMT identifiers.
//!
//! # Examples
//!
//! ```
//! use amt_types::well_known;
//!
//! assert_eq!(well_known::IS_A, 116680003);
//! assert!(well_known::is_historical_association(well_known::REPLACED_BY_REFSET));
//! ```

use crate::SctId;

// =============================================================================
// Modules
// =============================================================================

/// SNOMED CT-AU national release module.
pub const AU_MODULE: SctId = 32506021000036107;

/// Australian Medicines Terminology module (legacy content generation).
pub const AMT_MODULE: SctId = 900062011000036108;

/// SNOMED CT international core module.
pub const INTERNATIONAL_MODULE: SctId = 900000000000207008;

/// SNOMED CT international model component (metadata) module.
pub const INTERNATIONAL_METADATA_MODULE: SctId = 900000000000012004;

/// SNOMED CT-AU metadata module.
pub const AU_METADATA_MODULE: SctId = 161771000036108;

// =============================================================================
// Descriptions and language
// =============================================================================

/// Fully specified name description type.
pub const FSN: SctId = 900000000000003001;

/// Synonym description type.
pub const SYNONYM: SctId = 900000000000013009;

/// Preferred acceptability in a language reference set.
pub const PREFERRED: SctId = 900000000000548007;

// =============================================================================
// Attribute (relationship) types
// =============================================================================

/// IS A (subsumption).
pub const IS_A: SctId = 116680003;
/// Has intended active ingredient (legacy AMT).
pub const HAS_INTENDED_ACTIVE_INGREDIENT: SctId = 30364011000036101;
/// Has active ingredient.
pub const HAS_ACTIVE_INGREDIENT: SctId = 127489000;
/// Has precise active ingredient.
pub const HAS_PRECISE_ACTIVE_INGREDIENT: SctId = 762949000;
/// Has MPUU (legacy AMT).
pub const HAS_MPUU: SctId = 30348011000036104;
/// Has TPUU (legacy AMT).
pub const HAS_TPUU: SctId = 30409011000036107;
/// Contains clinical drug.
pub const CONTAINS_CLINICAL_DRUG: SctId = 774160008;
/// Contains device.
pub const CONTAINS_DEVICE: SctId = 999000081000168101;
/// Contains packaged clinical drug.
pub const CONTAINS_PACKAGED_CLINICAL_DRUG: SctId = 999000011000168107;
/// Has TP (legacy AMT).
pub const HAS_TP: SctId = 700000101000036108;
/// Has product name.
pub const HAS_PRODUCT_NAME: SctId = 774158006;

// =============================================================================
// Product model reference sets
// =============================================================================

/// Containered trade product pack reference set.
pub const CTPP_REFSET: SctId = 929360051000036108;
/// Trade product pack reference set.
pub const TPP_REFSET: SctId = 929360041000036105;
/// Trade product unit of use reference set.
pub const TPUU_REFSET: SctId = 929360031000036100;
/// Trade product reference set.
pub const TP_REFSET: SctId = 929360021000036102;
/// Medicinal product pack reference set.
pub const MPP_REFSET: SctId = 929360081000036101;
/// Medicinal product unit of use reference set.
pub const MPUU_REFSET: SctId = 929360071000036103;
/// Medicinal product reference set.
pub const MP_REFSET: SctId = 929360061000036106;

/// ARTG identifier string reference set.
pub const ARTG_ID_REFSET: SctId = 11000168105;

// =============================================================================
// Product model anchor concepts
// =============================================================================

/// Containered trade product pack model concept.
pub const CTPP: SctId = 30537011000036101;
/// Trade product pack model concept.
pub const TPP: SctId = 30404011000036106;
/// Trade product unit of use model concept.
pub const TPUU: SctId = 30425011000036101;
/// Trade product model concept.
pub const TP: SctId = 30560011000036108;
/// Medicinal product pack model concept.
pub const MPP: SctId = 30513011000036104;
/// Medicinal product unit of use model concept.
pub const MPUU: SctId = 30497011000036103;
/// Medicinal product model concept.
pub const MP: SctId = 30450011000036109;

/// All product model anchor concepts.
pub const MODEL_CONCEPTS: [SctId; 7] = [CTPP, TPP, TPUU, TP, MPP, MPUU, MP];

/// Returns true if the id is one of the product model anchor concepts.
pub fn is_model_concept(id: SctId) -> bool {
    MODEL_CONCEPTS.contains(&id)
}

// =============================================================================
// Historical associations
// =============================================================================

/// POSSIBLY EQUIVALENT TO association reference set.
pub const POSSIBLY_EQUIVALENT_TO_REFSET: SctId = 900000000000523009;
/// ALTERNATIVE association reference set.
pub const ALTERNATIVE_REFSET: SctId = 900000000000530003;
/// MOVED FROM association reference set.
pub const MOVED_FROM_REFSET: SctId = 900000000000525002;
/// MOVED TO association reference set.
pub const MOVED_TO_REFSET: SctId = 900000000000524003;
/// PARTIALLY EQUIVALENT TO association reference set.
pub const PARTIALLY_EQUIVALENT_TO_REFSET: SctId = 1186924009;
/// POSSIBLY REPLACED BY association reference set.
pub const POSSIBLY_REPLACED_BY_REFSET: SctId = 1186921001;
/// REFERS TO association reference set.
pub const REFERS_TO_REFSET: SctId = 900000000000531004;
/// REPLACED BY association reference set.
pub const REPLACED_BY_REFSET: SctId = 900000000000526001;
/// SAME AS association reference set.
pub const SAME_AS_REFSET: SctId = 900000000000527005;
/// SIMILAR TO association reference set.
pub const SIMILAR_TO_REFSET: SctId = 900000000000529008;
/// WAS A association reference set.
pub const WAS_A_REFSET: SctId = 900000000000528000;

/// Historical association reference sets recognised as replacements.
pub const HISTORICAL_ASSOCIATIONS: [SctId; 11] = [
    POSSIBLY_EQUIVALENT_TO_REFSET,
    ALTERNATIVE_REFSET,
    MOVED_FROM_REFSET,
    MOVED_TO_REFSET,
    PARTIALLY_EQUIVALENT_TO_REFSET,
    POSSIBLY_REPLACED_BY_REFSET,
    REFERS_TO_REFSET,
    REPLACED_BY_REFSET,
    SAME_AS_REFSET,
    SIMILAR_TO_REFSET,
    WAS_A_REFSET,
];

/// Returns true if the refset is a recognised historical association.
pub fn is_historical_association(refset_id: SctId) -> bool {
    HISTORICAL_ASSOCIATIONS.contains(&refset_id)
}
