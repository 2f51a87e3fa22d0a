//! Row ingestion: release rows become typed mutations on the release context.
//!
//! Files are folded strictly in order, because later files reference
//! concepts created by earlier ones:
//!
//! | Order | File | Effect |
//! |-------|------|--------|
//! | 1 | Concepts | creates concepts and graph vertices |
//! | 2 | Relationships | IS-A edges and product-model links |
//! | 3 | Language refset | collects preferred description ids |
//! | 4 | Descriptions | sets FSN and preferred term |
//! | 5 | ARTG id refset | adds registration ids |
//! | 6 | Product-model refsets | classifies concepts |
//! | 7 | Historical associations | replacement records |
//!
//! Rows from modules outside the recognised set are skipped.

use std::collections::HashSet;

use amt_types::rf2::{
    Rf2AssociationMember, Rf2Concept, Rf2Description, Rf2LanguageMember, Rf2RefsetMember,
    Rf2Relationship, Rf2StringMember,
};
use amt_types::{sctid, well_known, AttributeType, Classification, Rf2Error, SctId};
use tracing::{debug, info, warn};

use crate::classification::ContentModel;
use crate::error::{FlatFileError, FlatFileResult};
use crate::release::{Release, ReleaseFile, ReleaseFileKind};
use crate::replacement::{parse_effective_time, Replacement};
use crate::report::{Failure, ReportSink};
use crate::store::ReleaseContext;

/// Test case for replacement records that reference missing concepts.
pub const REPLACEMENT_TEST_CASE: &str = "Replacement_missing_concept";

fn is_module(module_id: SctId, modules: &[SctId]) -> bool {
    modules.contains(&module_id)
}

const CONCEPT_MODULES: [SctId; 5] = [
    well_known::AU_MODULE,
    well_known::AMT_MODULE,
    well_known::INTERNATIONAL_MODULE,
    well_known::INTERNATIONAL_METADATA_MODULE,
    well_known::AU_METADATA_MODULE,
];

const RELATIONSHIP_MODULES: [SctId; 3] = [
    well_known::AMT_MODULE,
    well_known::AU_MODULE,
    well_known::INTERNATIONAL_MODULE,
];

const LANGUAGE_MODULES: [SctId; 4] = [
    well_known::AMT_MODULE,
    well_known::AU_MODULE,
    well_known::INTERNATIONAL_METADATA_MODULE,
    well_known::AU_METADATA_MODULE,
];

const DESCRIPTION_MODULES: [SctId; 5] = CONCEPT_MODULES;

const REFSET_MODULES: [SctId; 2] = [well_known::AMT_MODULE, well_known::AU_MODULE];

/// Folds release rows into a [`ReleaseContext`].
pub struct Ingestor<'a> {
    context: ReleaseContext,
    preferred_descriptions: HashSet<SctId>,
    sink: &'a dyn ReportSink,
    exit_on_error: bool,
}

impl<'a> Ingestor<'a> {
    /// Creates an ingestor reporting to `sink`.
    pub fn new(sink: &'a dyn ReportSink, exit_on_error: bool) -> Self {
        Self {
            context: ReleaseContext::new(),
            preferred_descriptions: HashSet::new(),
            sink,
            exit_on_error,
        }
    }

    /// Reads every release file in dependency order.
    pub fn load(mut self, release: &Release) -> FlatFileResult<ReleaseContext> {
        let files = release.files();

        self.ingest_file(
            release,
            required(&files.concept, ReleaseFileKind::Concept)?,
            Self::concept_row,
        )?;
        self.ingest_file(
            release,
            required(&files.relationship, ReleaseFileKind::Relationship)?,
            Self::relationship_row,
        )?;
        self.ingest_file(
            release,
            required(&files.language, ReleaseFileKind::Language)?,
            Self::language_row,
        )?;
        self.ingest_file(
            release,
            required(&files.description, ReleaseFileKind::Description)?,
            Self::description_row,
        )?;
        self.ingest_file(
            release,
            required(&files.artg_id, ReleaseFileKind::ArtgId)?,
            Self::artg_row,
        )?;
        for file in &files.product_refsets {
            self.ingest_file(release, file, Self::product_refset_row)?;
        }
        for file in &files.associations {
            self.ingest_file(release, file, Self::association_row)?;
        }

        Ok(self.finish(files.product_refsets.len()))
    }

    fn ingest_file<F>(
        &mut self,
        release: &Release,
        file: &ReleaseFile,
        mut handle: F,
    ) -> FlatFileResult<()>
    where
        F: FnMut(&mut Self, &[&str]) -> FlatFileResult<bool>,
    {
        let mut kept = 0usize;
        let rows = release.for_each_row(file, |line, fields| match handle(self, fields) {
            Ok(true) => {
                kept += 1;
                Ok(())
            }
            Ok(false) => Ok(()),
            Err(FlatFileError::Parse(source)) => Err(FlatFileError::Row {
                file: file.name.clone(),
                line,
                source,
            }),
            Err(e) => Err(e),
        })?;
        info!(file = %file.name, rows, kept, "Processed release file");
        Ok(())
    }

    /// Finalises the context once all files are read.
    pub fn finish(mut self, product_refset_files: usize) -> ReleaseContext {
        let content_model = ContentModel::from_refset_file_count(product_refset_files);
        info!(%content_model, "Working with {content_model} content model release");
        self.context
            .classifications_mut()
            .set_content_model(content_model);
        self.context.replacements_mut().sort();
        self.context
    }

    /// Concept row: creates the concept if its module is recognised.
    pub fn concept_row(&mut self, fields: &[&str]) -> FlatFileResult<bool> {
        let row = Rf2Concept::from_fields(fields)?;
        if !is_module(row.module_id, &CONCEPT_MODULES) {
            return Ok(false);
        }
        self.context.add_concept(row.id, row.active, row.module_id);
        Ok(true)
    }

    /// Relationship row: adds an edge or a link between known concepts.
    pub fn relationship_row(&mut self, fields: &[&str]) -> FlatFileResult<bool> {
        let row = Rf2Relationship::from_fields(fields)?;
        if !row.active || !is_module(row.module_id, &RELATIONSHIP_MODULES) {
            return Ok(false);
        }
        let Some(attribute) = AttributeType::from_id(row.type_id) else {
            return Ok(false);
        };
        Ok(self
            .context
            .add_link(row.source_id, attribute.link_kind(), row.destination_id))
    }

    /// Language refset row: remembers preferred descriptions.
    pub fn language_row(&mut self, fields: &[&str]) -> FlatFileResult<bool> {
        let row = Rf2LanguageMember::from_fields(fields)?;
        if !row.member.active
            || !is_module(row.member.module_id, &LANGUAGE_MODULES)
            || !row.is_preferred()
        {
            return Ok(false);
        }
        Ok(self
            .preferred_descriptions
            .insert(row.member.referenced_component_id))
    }

    /// Description row: sets the FSN, or the PT for a preferred description.
    pub fn description_row(&mut self, fields: &[&str]) -> FlatFileResult<bool> {
        let row = Rf2Description::from_fields(fields)?;
        if !row.active || !is_module(row.module_id, &DESCRIPTION_MODULES) {
            return Ok(false);
        }
        if row.is_fsn() {
            Ok(self.context.set_fsn(row.concept_id, row.term))
        } else if self.preferred_descriptions.contains(&row.id) {
            Ok(self.context.set_pt(row.concept_id, row.term))
        } else {
            Ok(false)
        }
    }

    /// ARTG id refset row: adds the registration id to the pack.
    pub fn artg_row(&mut self, fields: &[&str]) -> FlatFileResult<bool> {
        let row = Rf2StringMember::from_fields(fields)?;
        if !row.member.active || !is_module(row.member.module_id, &REFSET_MODULES) {
            return Ok(false);
        }
        let concept_id = row.member.referenced_component_id;
        let added = self.context.add_artg_id(concept_id, row.value);
        if !added {
            debug!(concept_id, "ARTG id for a concept that was not loaded");
        }
        Ok(added)
    }

    /// Product-model refset row: classifies the referenced concept.
    pub fn product_refset_row(&mut self, fields: &[&str]) -> FlatFileResult<bool> {
        let row = Rf2RefsetMember::from_fields(fields)?;
        if !row.active || !is_module(row.module_id, &REFSET_MODULES) {
            return Ok(false);
        }
        let Some(classification) = Classification::from_refset_id(row.refset_id) else {
            return Ok(false);
        };
        Ok(self
            .context
            .classify(row.referenced_component_id, classification))
    }

    /// Historical association row: records a replacement.
    ///
    /// All three concepts (inactive, association type, replacement) must be
    /// loaded. A record that references a missing concept is reported; it
    /// aborts in exit-on-error mode and is skipped otherwise.
    pub fn association_row(&mut self, fields: &[&str]) -> FlatFileResult<bool> {
        let row = Rf2AssociationMember::from_fields(fields)?;
        let member = &row.member;
        if !member.active
            || !is_module(member.module_id, &REFSET_MODULES)
            || sctid::is_description_id(member.referenced_component_id)
            || !row.is_historical_association()
        {
            return Ok(false);
        }

        let ids = [
            member.referenced_component_id,
            member.refset_id,
            row.target_component_id,
        ];
        let missing: Vec<SctId> = ids
            .into_iter()
            .filter(|id| !self.context.contains(*id))
            .collect();
        if !missing.is_empty() {
            let detail = format!(
                "Association {} from {} to {} of type {} references missing concept(s) {:?}",
                member.id,
                member.referenced_component_id,
                row.target_component_id,
                member.refset_id,
                missing
            );
            warn!("{detail}");
            self.sink.record(
                Failure::error(REPLACEMENT_TEST_CASE, "Replacement references missing concept")
                    .with_detail(detail)
                    .with_origin(module_path!()),
            );
            if self.exit_on_error {
                return Err(FlatFileError::Replacement {
                    member_id: member.id.clone(),
                });
            }
            return Ok(false);
        }

        let effective_date = parse_effective_time(member.effective_time).ok_or_else(|| {
            Rf2Error::InvalidField {
                column: "effectiveTime",
                value: member.effective_time.to_string(),
            }
        })?;

        self.context.add_replacement(Replacement {
            inactive_id: member.referenced_component_id,
            replacement_type_id: member.refset_id,
            replacement_id: row.target_component_id,
            effective_date,
        });
        Ok(true)
    }
}

fn required(file: &Option<ReleaseFile>, kind: ReleaseFileKind) -> FlatFileResult<&ReleaseFile> {
    file.as_ref()
        .ok_or(FlatFileError::MissingReleaseFile(kind.as_str()))
}
