//! Post-closure validation and auto-repair.
//!
//! Validation runs once, after the graph is closed, in three steps:
//!
//! 1. Inactive CTPPs are reported and removed from the CTPP set.
//! 2. The concept rules in [`Rule::ALL`] run in order. A rule that matches
//!    is reported once with every offending concept. In exit-on-error mode,
//!    or when a rule has no repair, the run aborts. Otherwise the repair is
//!    applied to each offender and the output is flagged unreliable.
//! 3. Hierarchy-shape checks over the pack hierarchy are reported as one
//!    combined advisory failure, fatal only in exit-on-error mode.

use std::collections::BTreeSet;

use amt_types::{well_known, Classification, SctId};
use tracing::{info, warn};

use crate::concept::{summaries, Concept};
use crate::error::{FlatFileError, FlatFileResult};
use crate::report::{Failure, ReportSink};
use crate::store::ReleaseContext;

/// Test case for inactive CTPPs.
pub const INACTIVE_CTPP_TEST_CASE: &str = "Inactive_CTPP";

/// Test case for hierarchy-shape failures.
pub const HIERARCHY_TEST_CASE: &str = "heirarchy_error";

const BANNER: &str = "!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!";

/// Logs a warning framed by banner lines.
pub fn log_banner(message: &str) {
    warn!("{BANNER}");
    warn!("{BANNER}");
    warn!("{message}");
    warn!("{BANNER}");
    warn!("{BANNER}");
}

/// An integrity rule over a single concept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rule {
    /// Inactive concept with direct parents.
    InactiveWithParents,
    /// Inactive concept with trade product links.
    InactiveWithTps,
    /// Inactive concept with units.
    InactiveWithUnits,
    /// Inactive concept with ARTG ids.
    InactiveWithArtgIds,
    /// Empty fully specified name.
    MissingFsn,
    /// Empty preferred term.
    MissingPt,
    /// Active concept with an inactive unit.
    ActiveWithInactiveUnits,
    /// Active concept with an inactive trade product.
    ActiveWithInactiveTps,
    /// Active concept with an inactive parent.
    ActiveWithInactiveParents,
}

/// A change that brings one concept back in line with a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Repair {
    /// Remove all direct parents.
    ClearParents,
    /// Remove all trade product links.
    ClearTps,
    /// Remove all units.
    ClearUnits,
    /// Remove all ARTG ids.
    ClearArtgIds,
    /// Replace the FSN with a placeholder.
    SetFsn(String),
    /// Replace the PT with a placeholder.
    SetPt(String),
    /// Remove these units.
    DropUnits(Vec<SctId>),
    /// Remove these trade product links.
    DropTps(Vec<SctId>),
    /// Remove these parents.
    DropParents(Vec<SctId>),
}

impl Repair {
    /// Applies the change.
    pub fn apply(self, concept: &mut Concept) {
        match self {
            Repair::ClearParents => concept.parents.clear(),
            Repair::ClearTps => concept.tps.clear(),
            Repair::ClearUnits => concept.units.clear(),
            Repair::ClearArtgIds => concept.artg_ids.clear(),
            Repair::SetFsn(name) => concept.fsn = name,
            Repair::SetPt(name) => concept.pt = name,
            Repair::DropUnits(ids) => remove_all(&mut concept.units, &ids),
            Repair::DropTps(ids) => remove_all(&mut concept.tps, &ids),
            Repair::DropParents(ids) => remove_all(&mut concept.parents, &ids),
        }
    }
}

fn remove_all(set: &mut BTreeSet<SctId>, ids: &[SctId]) {
    for id in ids {
        set.remove(id);
    }
}

fn inactive_links(links: &BTreeSet<SctId>, ctx: &ReleaseContext) -> Vec<SctId> {
    links
        .iter()
        .copied()
        .filter(|id| !ctx.is_active(*id))
        .collect()
}

impl Rule {
    /// All rules in evaluation order.
    pub const ALL: [Rule; 9] = [
        Rule::InactiveWithParents,
        Rule::InactiveWithTps,
        Rule::InactiveWithUnits,
        Rule::InactiveWithArtgIds,
        Rule::MissingFsn,
        Rule::MissingPt,
        Rule::ActiveWithInactiveUnits,
        Rule::ActiveWithInactiveTps,
        Rule::ActiveWithInactiveParents,
    ];

    /// Rule code, used as the report test case name.
    pub fn code(self) -> &'static str {
        match self {
            Rule::InactiveWithParents => "Inactive_with_parents",
            Rule::InactiveWithTps => "Inactive_with_TPs",
            Rule::InactiveWithUnits => "Inactive_with_Units",
            Rule::InactiveWithArtgIds => "Inactive_with_ARTGIDs",
            Rule::MissingFsn => "Null_or_empty_FSN",
            Rule::MissingPt => "Null_or_empty_PT",
            Rule::ActiveWithInactiveUnits => "Active_concept_inactive_units",
            Rule::ActiveWithInactiveTps => "Active_concept_inactive_TP",
            Rule::ActiveWithInactiveParents => "Active_concept_inactive_parents",
        }
    }

    /// Human readable description.
    pub fn description(self) -> &'static str {
        match self {
            Rule::InactiveWithParents => "Inactive concepts with parents",
            Rule::InactiveWithTps => "Inactive concepts with TPs",
            Rule::InactiveWithUnits => "Inactive concepts with Units",
            Rule::InactiveWithArtgIds => "Inactive concepts with ARTGIDs",
            Rule::MissingFsn => "Concepts with null or empty FSN",
            Rule::MissingPt => "Concepts with null or empty PT",
            Rule::ActiveWithInactiveUnits => "Active concept with inactive linked unit/s",
            Rule::ActiveWithInactiveTps => "Active concept with inactive linked TP/s",
            Rule::ActiveWithInactiveParents => "Active concept with inactive linked parent/s",
        }
    }

    /// Returns true if the concept violates the rule.
    pub fn matches(self, concept: &Concept, ctx: &ReleaseContext) -> bool {
        let inactive = |links: &BTreeSet<SctId>| links.iter().any(|id| !ctx.is_active(*id));
        match self {
            Rule::InactiveWithParents => !concept.active && !concept.parents.is_empty(),
            Rule::InactiveWithTps => !concept.active && !concept.tps.is_empty(),
            Rule::InactiveWithUnits => !concept.active && !concept.units.is_empty(),
            Rule::InactiveWithArtgIds => !concept.active && !concept.artg_ids.is_empty(),
            Rule::MissingFsn => concept.fsn.is_empty(),
            Rule::MissingPt => concept.pt.is_empty(),
            Rule::ActiveWithInactiveUnits => concept.active && inactive(&concept.units),
            Rule::ActiveWithInactiveTps => concept.active && inactive(&concept.tps),
            Rule::ActiveWithInactiveParents => concept.active && inactive(&concept.parents),
        }
    }

    /// Computes the repair for an offending concept, or `None` if the rule
    /// cannot be repaired.
    pub fn repair(self, concept: &Concept, ctx: &ReleaseContext) -> Option<Repair> {
        let repair = match self {
            Rule::InactiveWithParents => Repair::ClearParents,
            Rule::InactiveWithTps => Repair::ClearTps,
            Rule::InactiveWithUnits => Repair::ClearUnits,
            Rule::InactiveWithArtgIds => Repair::ClearArtgIds,
            Rule::MissingFsn => Repair::SetFsn(format!("Concept {} has no FSN!!!", concept.id)),
            Rule::MissingPt => {
                Repair::SetPt(format!("Concept {} has no Preferred Term!!!", concept.id))
            }
            Rule::ActiveWithInactiveUnits => Repair::DropUnits(inactive_links(&concept.units, ctx)),
            Rule::ActiveWithInactiveTps => Repair::DropTps(inactive_links(&concept.tps, ctx)),
            Rule::ActiveWithInactiveParents => {
                Repair::DropParents(inactive_links(&concept.parents, ctx))
            }
        };
        Some(repair)
    }
}

/// Pack concepts with the wrong shape.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HierarchyIssues {
    /// Packs below MPP without any unit.
    pub packs_without_units: Vec<SctId>,
    /// Generic packs (no TPP ancestor) with a TPUU unit.
    pub mpps_with_tpuus: Vec<SctId>,
    /// Trade packs with a unit that is not a TPUU.
    pub tpps_with_mpuus: Vec<SctId>,
}

impl HierarchyIssues {
    /// Returns true if nothing was found.
    pub fn is_empty(&self) -> bool {
        self.packs_without_units.is_empty()
            && self.mpps_with_tpuus.is_empty()
            && self.tpps_with_mpuus.is_empty()
    }

    /// Total number of offending packs.
    pub fn len(&self) -> usize {
        self.packs_without_units.len() + self.mpps_with_tpuus.len() + self.tpps_with_mpuus.len()
    }

    fn detail(&self, ctx: &ReleaseContext) -> String {
        let list = |ids: &[SctId]| {
            ids.iter()
                .map(|id| ctx.summary(*id))
                .collect::<Vec<_>>()
                .join(", ")
        };
        format!(
            "Detected pack concepts with no units [{}] and/or MPPs with TPUU units [{}] and/or TPP/CTPPs with MPUU units [{}]",
            list(&self.packs_without_units),
            list(&self.mpps_with_tpuus),
            list(&self.tpps_with_mpuus)
        )
    }
}

/// What validation changed or found without aborting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationOutcome {
    /// Inactive CTPPs removed from the CTPP set.
    pub excised_ctpps: Vec<SctId>,
    /// Codes of rules whose repair was applied.
    pub repaired_rules: Vec<&'static str>,
    /// Advisory hierarchy-shape findings.
    pub hierarchy: HierarchyIssues,
}

impl ValidationOutcome {
    /// False if any repair changed the loaded content.
    pub fn is_reliable(&self) -> bool {
        self.repaired_rules.is_empty()
    }
}

/// Runs the validation steps against a closed release context.
pub struct ValidationEngine<'a> {
    sink: &'a dyn ReportSink,
    exit_on_error: bool,
}

impl<'a> ValidationEngine<'a> {
    /// Creates an engine reporting to `sink`.
    pub fn new(sink: &'a dyn ReportSink, exit_on_error: bool) -> Self {
        Self {
            sink,
            exit_on_error,
        }
    }

    /// Runs all validation steps in order.
    pub fn run(&self, ctx: &mut ReleaseContext) -> FlatFileResult<ValidationOutcome> {
        let excised_ctpps = self.excise_inactive_ctpps(ctx)?;
        let repaired_rules = self.apply_rules(ctx)?;
        info!(
            ctpps = ctx.classifications().len(Classification::Ctpp),
            concepts = ctx.concept_count(),
            "Loaded release"
        );
        let hierarchy = self.check_hierarchy(ctx)?;
        info!("Validated cached concepts");

        Ok(ValidationOutcome {
            excised_ctpps,
            repaired_rules,
            hierarchy,
        })
    }

    /// Reports inactive CTPPs and removes them from the CTPP set.
    pub fn excise_inactive_ctpps(&self, ctx: &mut ReleaseContext) -> FlatFileResult<Vec<SctId>> {
        let inactive: Vec<SctId> = ctx
            .classifications()
            .members(Classification::Ctpp)
            .iter()
            .copied()
            .filter(|id| !ctx.is_active(*id))
            .collect();

        for &id in &inactive {
            let summary = ctx.summary(id);
            warn!("Found inactive CTPP! {summary}");
            self.sink.record(
                Failure::error(INACTIVE_CTPP_TEST_CASE, "Inactive CTPP found")
                    .with_detail(summary)
                    .with_origin(module_path!()),
            );
            if self.exit_on_error {
                return Err(FlatFileError::InactivePack(id));
            }
            ctx.classifications_mut().remove(Classification::Ctpp, id);
        }
        Ok(inactive)
    }

    /// Runs every concept rule in order. Returns the codes of repaired rules.
    pub fn apply_rules(&self, ctx: &mut ReleaseContext) -> FlatFileResult<Vec<&'static str>> {
        let mut repaired = Vec::new();
        for rule in Rule::ALL {
            if self.apply_rule(rule, ctx)? > 0 {
                repaired.push(rule.code());
            }
        }
        Ok(repaired)
    }

    /// Runs one rule. Returns the number of repaired concepts.
    pub fn apply_rule(&self, rule: Rule, ctx: &mut ReleaseContext) -> FlatFileResult<usize> {
        let mut offenders: Vec<&Concept> = ctx
            .concepts()
            .filter(|c| rule.matches(c, ctx))
            .collect();
        if offenders.is_empty() {
            return Ok(0);
        }
        offenders.sort_by_key(|c| c.id);

        let detail = summaries(offenders.iter().copied());
        warn!(code = rule.code(), count = offenders.len(), "{} {detail}", rule.description());
        self.sink.record(
            Failure::error(rule.code(), rule.description())
                .with_detail(detail)
                .with_origin(module_path!()),
        );

        let repairs: Option<Vec<(SctId, Repair)>> = offenders
            .iter()
            .map(|c| rule.repair(c, ctx).map(|repair| (c.id, repair)))
            .collect();

        let repairs = match repairs {
            Some(repairs) if !self.exit_on_error => repairs,
            _ => {
                return Err(FlatFileError::Validation {
                    code: rule.code(),
                    count: offenders.len(),
                })
            }
        };

        log_banner(
            "FIX APPLIED FOR ERRONEOUS INPUT DATA - continuing as requested, however RESULTS MAY BE UNRELIABLE AS A RESULT!!!!",
        );
        let count = repairs.len();
        for (id, repair) in repairs {
            if let Some(concept) = ctx.concept_mut(id) {
                repair.apply(concept);
            }
        }
        Ok(count)
    }

    /// Checks the shape of the pack hierarchy.
    ///
    /// Every pack below the MPP model concept needs a unit, a generic pack
    /// must not contain a TPUU, and a trade pack must contain only TPUUs.
    pub fn check_hierarchy(&self, ctx: &ReleaseContext) -> FlatFileResult<HierarchyIssues> {
        let packs_below = |anchor: SctId| {
            let mut packs: Vec<&Concept> = ctx
                .graph()
                .descendants(anchor)
                .into_iter()
                .filter(|id| !well_known::is_model_concept(*id))
                .filter_map(|id| ctx.concept(id))
                .collect();
            packs.sort_by_key(|c| c.id);
            packs
        };
        let is_tpuu = |id: SctId| ctx.is_ancestor_of(well_known::TPUU, id);

        let mpp_packs = packs_below(well_known::MPP);
        let issues = HierarchyIssues {
            packs_without_units: mpp_packs
                .iter()
                .filter(|c| c.units.is_empty())
                .map(|c| c.id)
                .collect(),
            mpps_with_tpuus: mpp_packs
                .iter()
                .filter(|c| !ctx.is_ancestor_of(well_known::TPP, c.id))
                .filter(|c| c.units.iter().any(|u| is_tpuu(*u)))
                .map(|c| c.id)
                .collect(),
            tpps_with_mpuus: packs_below(well_known::TPP)
                .iter()
                .filter(|c| c.units.iter().any(|u| !is_tpuu(*u)))
                .map(|c| c.id)
                .collect(),
        };

        if issues.is_empty() {
            return Ok(issues);
        }

        let detail = issues.detail(ctx);
        warn!(count = issues.len(), "{detail}");
        self.sink.record(
            Failure::error(
                HIERARCHY_TEST_CASE,
                "Detected pack concepts with no units and/or MPPs with TPUU units and/or TPP/CTPPs with MPUU units",
            )
            .with_detail(detail.clone())
            .with_origin(module_path!()),
        );
        if self.exit_on_error {
            return Err(FlatFileError::Hierarchy(detail));
        }
        Ok(issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::JUnitReport;
    use amt_types::LinkKind;

    const MODULE: SctId = well_known::AMT_MODULE;

    fn named(ctx: &mut ReleaseContext, id: SctId, active: bool) {
        ctx.add_concept(id, active, MODULE);
        ctx.set_fsn(id, format!("concept {id} (fsn)"));
        ctx.set_pt(id, format!("concept {id}"));
    }

    /// Two active packs, one inactive unit, one inactive pack with stale links.
    fn stale_context() -> ReleaseContext {
        let mut ctx = ReleaseContext::new();
        for id in [100, 200, 300] {
            named(&mut ctx, id, true);
        }
        named(&mut ctx, 400, false);
        named(&mut ctx, 500, false);

        ctx.add_link(200, LinkKind::Parent, 100);
        ctx.add_link(200, LinkKind::Unit, 400);
        ctx.add_link(200, LinkKind::Unit, 300);
        ctx.add_link(500, LinkKind::Unit, 300);
        ctx.add_link(500, LinkKind::Parent, 100);
        ctx.add_artg_id(500, "999");
        ctx.close(false).unwrap();
        ctx
    }

    #[test]
    fn test_rule_codes_are_unique() {
        let codes: BTreeSet<&str> = Rule::ALL.iter().map(|r| r.code()).collect();
        assert_eq!(codes.len(), Rule::ALL.len());
    }

    #[test]
    fn test_inactive_with_units_repaired() {
        let mut ctx = stale_context();
        let sink = JUnitReport::new();
        let engine = ValidationEngine::new(&sink, false);

        let repaired = engine.apply_rule(Rule::InactiveWithUnits, &mut ctx).unwrap();
        assert_eq!(repaired, 1);
        assert!(ctx.concept(500).unwrap().units.is_empty());

        let case = sink.test_case("Inactive_with_Units").unwrap();
        assert_eq!(case.failures[0].detail, "500 |concept 500|");
    }

    #[test]
    fn test_inactive_with_units_aborts_in_exit_mode() {
        let mut ctx = stale_context();
        let sink = JUnitReport::new();
        let engine = ValidationEngine::new(&sink, true);

        let err = engine.apply_rule(Rule::InactiveWithUnits, &mut ctx).unwrap_err();
        assert!(matches!(
            err,
            FlatFileError::Validation {
                code: "Inactive_with_Units",
                count: 1
            }
        ));
        assert!(sink.contains("Inactive_with_Units"));
        assert!(!ctx.concept(500).unwrap().units.is_empty(), "no repair on abort");
    }

    #[test]
    fn test_active_with_inactive_units_drops_only_inactive() {
        let mut ctx = stale_context();
        let sink = JUnitReport::new();
        let engine = ValidationEngine::new(&sink, false);

        engine.apply_rule(Rule::ActiveWithInactiveUnits, &mut ctx).unwrap();
        let units: Vec<SctId> = ctx.concept(200).unwrap().units.iter().copied().collect();
        assert_eq!(units, vec![300]);
    }

    #[test]
    fn test_missing_names_get_placeholders() {
        let mut ctx = ReleaseContext::new();
        ctx.add_concept(100, true, MODULE);
        let sink = JUnitReport::new();
        let engine = ValidationEngine::new(&sink, false);

        let repaired = engine.apply_rules(&mut ctx).unwrap();
        assert_eq!(repaired, vec!["Null_or_empty_FSN", "Null_or_empty_PT"]);
        let concept = ctx.concept(100).unwrap();
        assert_eq!(concept.fsn, "Concept 100 has no FSN!!!");
        assert_eq!(concept.pt, "Concept 100 has no Preferred Term!!!");
    }

    #[test]
    fn test_repair_pass_is_idempotent() {
        let mut ctx = stale_context();
        let sink = JUnitReport::new();
        let engine = ValidationEngine::new(&sink, false);

        let first = engine.apply_rules(&mut ctx).unwrap();
        assert!(!first.is_empty());
        let failures = sink.failure_count();
        let snapshot: Vec<Concept> = ctx
            .sorted_ids()
            .iter()
            .map(|id| ctx.concept(*id).unwrap().clone())
            .collect();

        let second = engine.apply_rules(&mut ctx).unwrap();
        assert!(second.is_empty());
        assert_eq!(sink.failure_count(), failures);
        let after: Vec<Concept> = ctx
            .sorted_ids()
            .iter()
            .map(|id| ctx.concept(*id).unwrap().clone())
            .collect();
        assert_eq!(snapshot, after);
    }

    #[test]
    fn test_inactive_ctpp_excised() {
        let mut ctx = stale_context();
        ctx.classify(200, Classification::Ctpp);
        ctx.classify(500, Classification::Ctpp);
        let sink = JUnitReport::new();

        let excised = ValidationEngine::new(&sink, false)
            .excise_inactive_ctpps(&mut ctx)
            .unwrap();
        assert_eq!(excised, vec![500]);
        assert!(ctx.classifications().contains(Classification::Ctpp, 200));
        assert!(!ctx.classifications().contains(Classification::Ctpp, 500));
        assert!(sink.contains(INACTIVE_CTPP_TEST_CASE));
    }

    #[test]
    fn test_inactive_ctpp_fatal_in_exit_mode() {
        let mut ctx = stale_context();
        ctx.classify(500, Classification::Ctpp);
        let sink = JUnitReport::new();

        let err = ValidationEngine::new(&sink, true)
            .excise_inactive_ctpps(&mut ctx)
            .unwrap_err();
        assert!(matches!(err, FlatFileError::InactivePack(500)));
    }

    /// Model anchors plus a well-formed TPP/MPP pair and three malformed packs.
    fn hierarchy_context() -> ReleaseContext {
        let mut ctx = ReleaseContext::new();
        for id in [well_known::MPP, well_known::TPP, well_known::MPUU, well_known::TPUU] {
            named(&mut ctx, id, true);
        }
        ctx.add_link(well_known::TPP, LinkKind::Parent, well_known::MPP);
        ctx.add_link(well_known::TPUU, LinkKind::Parent, well_known::MPUU);

        // 10 MPP -> 11 MPUU, 20 TPP -> 21 TPUU
        for id in [10, 11, 20, 21, 30, 40, 50] {
            named(&mut ctx, id, true);
        }
        ctx.add_link(10, LinkKind::Parent, well_known::MPP);
        ctx.add_link(11, LinkKind::Parent, well_known::MPUU);
        ctx.add_link(10, LinkKind::Unit, 11);
        ctx.add_link(20, LinkKind::Parent, well_known::TPP);
        ctx.add_link(21, LinkKind::Parent, well_known::TPUU);
        ctx.add_link(20, LinkKind::Unit, 21);

        // 30: MPP without units; 40: MPP with a TPUU; 50: TPP with an MPUU
        ctx.add_link(30, LinkKind::Parent, well_known::MPP);
        ctx.add_link(40, LinkKind::Parent, well_known::MPP);
        ctx.add_link(40, LinkKind::Unit, 21);
        ctx.add_link(50, LinkKind::Parent, well_known::TPP);
        ctx.add_link(50, LinkKind::Unit, 11);
        ctx.close(false).unwrap();
        ctx
    }

    #[test]
    fn test_check_hierarchy_advisory() {
        let ctx = hierarchy_context();
        let sink = JUnitReport::new();

        let issues = ValidationEngine::new(&sink, false).check_hierarchy(&ctx).unwrap();
        assert_eq!(issues.packs_without_units, vec![30]);
        assert_eq!(issues.mpps_with_tpuus, vec![40]);
        assert_eq!(issues.tpps_with_mpuus, vec![50]);
        assert_eq!(sink.test_case(HIERARCHY_TEST_CASE).unwrap().failures.len(), 1);
    }

    #[test]
    fn test_check_hierarchy_fatal_in_exit_mode() {
        let ctx = hierarchy_context();
        let sink = JUnitReport::new();

        let err = ValidationEngine::new(&sink, true).check_hierarchy(&ctx).unwrap_err();
        assert!(matches!(err, FlatFileError::Hierarchy(_)));
    }

    #[test]
    fn test_run_reports_reliability() {
        let mut ctx = stale_context();
        let sink = JUnitReport::new();
        let outcome = ValidationEngine::new(&sink, false).run(&mut ctx).unwrap();
        assert!(!outcome.is_reliable());
        assert!(outcome.repaired_rules.contains(&"Inactive_with_parents"));
    }
}
