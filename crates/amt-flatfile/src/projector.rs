//! Flat-row projection: one denormalised row per CTPP, unit, MP and ARTG id.
//!
//! For each active CTPP the projector walks
//!
//! ```text
//! CTPP -> TPP -> TP
//!          |      MPP
//!          +-> TPUU -> TP
//!                 +-> MPUU -> MP
//! ```
//!
//! and emits the Cartesian product of the resolved MPs and the CTPP's ARTG
//! ids. The release context is read-only here, so CTPPs can be projected in
//! parallel.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use amt_types::{Classification, SctId};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::FlatFileConfig;
use crate::error::FlatFileResult;
use crate::report::Failure;
use crate::resolver::HierarchyResolver;
use crate::store::ReleaseContext;

/// One row of the flat file.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FlatRow {
    /// CTPP id.
    pub ctpp_id: SctId,
    /// CTPP preferred term.
    pub ctpp_pt: String,
    /// Registration id, empty if the CTPP has none.
    pub artg_id: String,
    /// TPP id, or the CTPP itself when it has no TPP ancestor.
    pub tpp_id: SctId,
    /// TPP preferred term.
    pub tpp_pt: String,
    /// TPUU id.
    pub tpuu_id: SctId,
    /// TPUU preferred term.
    pub tpuu_pt: String,
    /// Trade product of the TPP.
    pub tpp_tp_id: SctId,
    /// Preferred term of the TPP's trade product.
    pub tpp_tp_pt: String,
    /// Trade product of the TPUU.
    pub tpuu_tp_id: SctId,
    /// Preferred term of the TPUU's trade product.
    pub tpuu_tp_pt: String,
    /// MPP, absent when the TPP has no unique MPP ancestor.
    pub mpp_id: Option<SctId>,
    /// MPP preferred term, empty when absent.
    pub mpp_pt: String,
    /// MPUU id.
    pub mpuu_id: SctId,
    /// MPUU preferred term.
    pub mpuu_pt: String,
    /// MP id.
    pub mp_id: SctId,
    /// MP preferred term.
    pub mp_pt: String,
}

struct Progress {
    total: usize,
    interval: usize,
    processed: AtomicUsize,
    lap: Mutex<Instant>,
}

impl Progress {
    fn new(total: usize, interval: usize) -> Self {
        Self {
            total,
            interval,
            processed: AtomicUsize::new(0),
            lap: Mutex::new(Instant::now()),
        }
    }

    fn tick(&self) {
        let processed = self.processed.fetch_add(1, Ordering::Relaxed) + 1;
        if self.interval == 0 || processed % self.interval != 0 {
            return;
        }
        let mut lap = self.lap.lock();
        info!(
            "Processed CTPP {processed} of {}. Time spent processing {} CTPPs is {}ms",
            self.total,
            self.interval,
            lap.elapsed().as_millis()
        );
        *lap = Instant::now();
    }
}

/// Pack-level resolution shared by every unit of a CTPP.
struct PackContext {
    ctpp_id: SctId,
    tpp_id: SctId,
    tpp_tp_id: SctId,
    mpp_id: Option<SctId>,
    artg_ids: Vec<String>,
}

/// Projects a validated release into flat rows.
pub struct FlatFileProjector<'a> {
    resolver: HierarchyResolver<'a>,
    parallel: bool,
    progress_interval: usize,
}

impl<'a> FlatFileProjector<'a> {
    /// Creates a projector over a resolver.
    pub fn new(resolver: HierarchyResolver<'a>, config: &FlatFileConfig) -> Self {
        Self {
            resolver,
            parallel: config.parallel,
            progress_interval: config.progress_interval,
        }
    }

    /// The underlying resolver.
    pub fn resolver(&self) -> &HierarchyResolver<'a> {
        &self.resolver
    }

    fn ctx(&self) -> &'a ReleaseContext {
        self.resolver.context()
    }

    /// Projects every active CTPP, in CTPP id order.
    pub fn project(&self) -> FlatFileResult<Vec<FlatRow>> {
        let start = Instant::now();
        let ctpps: Vec<SctId> = self
            .ctx()
            .classifications()
            .members(Classification::Ctpp)
            .iter()
            .copied()
            .filter(|&id| self.ctx().is_active(id))
            .collect();
        info!(ctpps = ctpps.len(), parallel = self.parallel, "Projecting flat file");

        let progress = Progress::new(ctpps.len(), self.progress_interval);
        let per_ctpp = self.project_all(&ctpps, &progress)?;
        let rows: Vec<FlatRow> = per_ctpp.into_iter().flatten().collect();

        info!(
            rows = rows.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Projection complete"
        );
        if let Some(stats) = self.resolver.cache_stats() {
            debug!(
                entries = stats.entries,
                hit_rate = stats.hit_rate(),
                "Resolver cache"
            );
        }
        Ok(rows)
    }

    #[cfg(feature = "parallel")]
    fn project_all(
        &self,
        ctpps: &[SctId],
        progress: &Progress,
    ) -> FlatFileResult<Vec<Vec<FlatRow>>> {
        use rayon::prelude::*;

        let project = |&id: &SctId| {
            let rows = self.project_ctpp(id);
            progress.tick();
            rows
        };
        if self.parallel {
            ctpps.par_iter().map(project).collect()
        } else {
            ctpps.iter().map(project).collect()
        }
    }

    #[cfg(not(feature = "parallel"))]
    fn project_all(
        &self,
        ctpps: &[SctId],
        progress: &Progress,
    ) -> FlatFileResult<Vec<Vec<FlatRow>>> {
        ctpps
            .iter()
            .map(|&id| {
                let rows = self.project_ctpp(id);
                progress.tick();
                rows
            })
            .collect()
    }

    /// Projects one CTPP.
    ///
    /// Rows are ordered by TPUU id, then MP id, then ARTG id. Units that
    /// cannot be resolved are skipped unless running in exit-on-error mode.
    pub fn project_ctpp(&self, ctpp_id: SctId) -> FlatFileResult<Vec<FlatRow>> {
        let ctx = self.ctx();

        let tpp_id = self
            .resolver
            .unique_ancestor_of_type(ctpp_id, Classification::Tpp)?
            .unwrap_or(ctpp_id);
        let mpp_id = self
            .resolver
            .unique_ancestor_or_report(tpp_id, Classification::Mpp);
        let Some(tpp_tp_id) = self.resolver.trade_product_of_pack(tpp_id)? else {
            return Ok(Vec::new());
        };

        let artg_ids: Vec<String> = match ctx.concept(ctpp_id) {
            Some(ctpp) if !ctpp.artg_ids.is_empty() => ctpp
                .artg_ids
                .iter()
                .map(|id| id.trim().to_string())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect(),
            _ => vec![String::new()],
        };
        let pack = PackContext {
            ctpp_id,
            tpp_id,
            tpp_tp_id,
            mpp_id,
            artg_ids,
        };

        let units = ctx
            .concept(tpp_id)
            .map(|tpp| tpp.units.clone())
            .unwrap_or_default();
        let mut discovered_mpuus = BTreeSet::new();
        let mut rows = Vec::new();

        for tpuu_id in units {
            let tpuu_tp_id = self.resolver.trade_product_of_unit(tpuu_id)?;
            let Some(mpuu_id) = self
                .resolver
                .unique_ancestor_of_type(tpuu_id, Classification::Mpuu)?
            else {
                debug!(ctpp_id, tpuu_id, "Skipping unit without MPUU");
                continue;
            };
            discovered_mpuus.insert(mpuu_id);

            // MPs are resolved even for units that emit no rows.
            let resolution = self.resolver.mp_ancestors(mpuu_id)?;
            let Some(tpuu_tp_id) = tpuu_tp_id else {
                debug!(ctpp_id, tpuu_id, "Skipping unit without TP");
                continue;
            };
            for mp_id in resolution.mps {
                for artg_id in &pack.artg_ids {
                    rows.push(self.row(&pack, artg_id, tpuu_id, tpuu_tp_id, mpuu_id, mp_id));
                }
            }
        }

        if let Some(mpp_id) = mpp_id {
            self.cross_check(mpp_id, &discovered_mpuus);
        }
        Ok(rows)
    }

    fn row(
        &self,
        pack: &PackContext,
        artg_id: &str,
        tpuu_id: SctId,
        tpuu_tp_id: SctId,
        mpuu_id: SctId,
        mp_id: SctId,
    ) -> FlatRow {
        let ctx = self.ctx();
        let pt = |id: SctId| ctx.pt(id).to_string();
        FlatRow {
            ctpp_id: pack.ctpp_id,
            ctpp_pt: pt(pack.ctpp_id),
            artg_id: artg_id.to_string(),
            tpp_id: pack.tpp_id,
            tpp_pt: pt(pack.tpp_id),
            tpuu_id,
            tpuu_pt: pt(tpuu_id),
            tpp_tp_id: pack.tpp_tp_id,
            tpp_tp_pt: pt(pack.tpp_tp_id),
            tpuu_tp_id,
            tpuu_tp_pt: pt(tpuu_tp_id),
            mpp_id: pack.mpp_id,
            mpp_pt: pack.mpp_id.map(pt).unwrap_or_default(),
            mpuu_id,
            mpuu_pt: pt(mpuu_id),
            mp_id,
            mp_pt: pt(mp_id),
        }
    }

    /// Compares the MPUUs reached through the TPP's units with the MPP's own.
    fn cross_check(&self, mpp_id: SctId, discovered: &BTreeSet<SctId>) {
        let ctx = self.ctx();
        let declared = ctx
            .concept(mpp_id)
            .map(|mpp| mpp.units.clone())
            .unwrap_or_default();
        if &declared == discovered {
            return;
        }

        let missing: Vec<String> = declared
            .difference(discovered)
            .map(|id| ctx.summary(*id))
            .collect();
        let extra: Vec<String> = discovered
            .difference(&declared)
            .map(|id| ctx.summary(*id))
            .collect();
        let detail = format!(
            "MPP {} units [{}] not reached from TPP units, reached MPUUs [{}] not units of the MPP",
            ctx.summary(mpp_id),
            missing.join(", "),
            extra.join(", ")
        );
        warn!("{detail}");
        self.resolver.sink().record(
            Failure::warning(format!("MPP mismatch ({mpp_id})"), "Mismatch")
                .with_detail(detail)
                .with_origin(module_path!()),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::JUnitReport;
    use amt_types::{well_known, LinkKind};

    fn add(ctx: &mut ReleaseContext, id: SctId, classification: Classification) {
        ctx.add_concept(id, true, well_known::AMT_MODULE);
        ctx.set_pt(id, format!("pt {id}"));
        ctx.classify(id, classification);
    }

    /// CTPP 1 < TPP 2 < MPP 3; TPP 2 has unit TPUU 4 < MPUU 5 < MP 6;
    /// TPP 2 and TPUU 4 link to TP 7; MPP 3 has unit MPUU 5.
    fn simple_pack() -> ReleaseContext {
        pack(true)
    }

    fn pack(tpuu_has_mpuu: bool) -> ReleaseContext {
        let mut ctx = ReleaseContext::new();
        add(&mut ctx, 1, Classification::Ctpp);
        add(&mut ctx, 2, Classification::Tpp);
        add(&mut ctx, 3, Classification::Mpp);
        add(&mut ctx, 4, Classification::Tpuu);
        add(&mut ctx, 5, Classification::Mpuu);
        add(&mut ctx, 6, Classification::Mp);
        add(&mut ctx, 7, Classification::Tp);

        ctx.add_link(1, LinkKind::Parent, 2);
        ctx.add_link(2, LinkKind::Parent, 3);
        if tpuu_has_mpuu {
            ctx.add_link(4, LinkKind::Parent, 5);
        }
        ctx.add_link(5, LinkKind::Parent, 6);
        ctx.add_link(1, LinkKind::Unit, 4);
        ctx.add_link(2, LinkKind::Unit, 4);
        ctx.add_link(3, LinkKind::Unit, 5);
        ctx.add_link(2, LinkKind::TradeProduct, 7);
        ctx.add_link(4, LinkKind::TradeProduct, 7);
        ctx.add_artg_id(1, "12345");
        ctx.close(false).unwrap();
        ctx
    }

    fn project(
        ctx: &ReleaseContext,
        sink: &JUnitReport,
        exit_on_error: bool,
    ) -> FlatFileResult<Vec<FlatRow>> {
        let config = FlatFileConfig::default();
        let resolver = HierarchyResolver::new(ctx, sink, exit_on_error);
        FlatFileProjector::new(resolver, &config).project()
    }

    #[test]
    fn test_simple_pack() {
        let ctx = simple_pack();
        let sink = JUnitReport::new();
        let rows = project(&ctx, &sink, true).unwrap();

        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.artg_id, "12345");
        assert_eq!((row.ctpp_id, row.tpp_id, row.tpuu_id), (1, 2, 4));
        assert_eq!((row.tpp_tp_id, row.tpuu_tp_id), (7, 7));
        assert_eq!((row.mpp_id, row.mpuu_id, row.mp_id), (Some(3), 5, 6));
        assert_eq!(row.mp_pt, "pt 6");
        assert!(sink.is_empty());
    }

    #[test]
    fn test_missing_artg_id_gives_empty_value() {
        let mut ctx = simple_pack();
        ctx.concept_mut(1).unwrap().artg_ids.clear();
        let sink = JUnitReport::new();

        let rows = project(&ctx, &sink, false).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].artg_id, "");
    }

    #[test]
    fn test_row_cardinality_is_artg_times_mps() {
        let mut ctx = simple_pack();
        add(&mut ctx, 8, Classification::Mp);
        ctx.add_link(5, LinkKind::Parent, 8);
        ctx.add_artg_id(1, "23456");
        ctx.add_artg_id(1, "34567");
        ctx.close(false).unwrap();
        let sink = JUnitReport::new();

        let rows = project(&ctx, &sink, false).unwrap();
        assert_eq!(rows.len(), 3 * 2);
        assert!(sink.contains("Multiple parents (5)"));

        let order: Vec<(SctId, &str)> = rows
            .iter()
            .map(|r| (r.mp_id, r.artg_id.as_str()))
            .collect();
        assert_eq!(order[0], (6, "12345"));
        assert_eq!(order[5], (8, "34567"));
    }

    #[test]
    fn test_tpp_falls_back_to_ctpp() {
        let mut ctx = simple_pack();
        add(&mut ctx, 9, Classification::Ctpp);
        ctx.add_link(9, LinkKind::Unit, 4);
        ctx.add_link(9, LinkKind::TradeProduct, 7);
        ctx.close(false).unwrap();
        let sink = JUnitReport::new();

        let config = FlatFileConfig::default();
        let resolver = HierarchyResolver::new(&ctx, &sink, false);
        let rows = FlatFileProjector::new(resolver, &config).project_ctpp(9).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].tpp_id, 9);
        assert_eq!(rows[0].mpp_id, None);
        assert_eq!(rows[0].mpp_pt, "");
        assert!(sink.contains("No parents (9)"));
    }

    #[test]
    fn test_missing_mpuu_skips_or_aborts() {
        let ctx = pack(false);

        let sink = JUnitReport::new();
        let rows = project(&ctx, &sink, false).unwrap();
        assert!(rows.is_empty());
        assert!(sink.contains("No parents (4)"));

        let sink = JUnitReport::new();
        assert!(project(&ctx, &sink, true).is_err());
        assert!(sink.contains("No parents (4)"));
    }

    #[test]
    fn test_unit_without_tp_still_resolves_mps() {
        let mut ctx = simple_pack();
        ctx.concept_mut(4).unwrap().tps.clear();
        add(&mut ctx, 8, Classification::Mp);
        ctx.add_link(5, LinkKind::Parent, 8);
        ctx.close(false).unwrap();

        let sink = JUnitReport::new();
        assert!(project(&ctx, &sink, false).unwrap().is_empty());
        assert!(sink.contains("TPUU has no TPs (4)"));
        assert!(sink.contains("Multiple parents (5)"));
        assert!(!sink.contains("MPP mismatch (3)"));

        let sink = JUnitReport::new();
        assert!(project(&ctx, &sink, true).is_err());
        assert!(sink.contains("Multiple parents (5)"));
    }

    #[test]
    fn test_mpp_mismatch_is_warning() {
        let mut ctx = simple_pack();
        add(&mut ctx, 10, Classification::Mpuu);
        ctx.add_link(3, LinkKind::Unit, 10);
        ctx.close(false).unwrap();
        let sink = JUnitReport::new();

        let rows = project(&ctx, &sink, true).unwrap();
        assert_eq!(rows.len(), 1);
        let case = sink.test_case("MPP mismatch (3)").unwrap();
        assert_eq!(case.failures[0].message, "Mismatch");
    }

    #[test]
    fn test_tpp_without_tp_skips_ctpp() {
        let mut ctx = simple_pack();
        ctx.concept_mut(2).unwrap().tps.clear();
        let sink = JUnitReport::new();

        assert!(project(&ctx, &sink, false).unwrap().is_empty());
        assert!(sink.contains("TPP has too many TPs (2)"));
        assert!(project(&ctx, &sink, true).is_err());
    }

    #[test]
    fn test_inactive_ctpp_not_projected() {
        let mut ctx = simple_pack();
        ctx.add_concept(1, false, well_known::AMT_MODULE);
        let sink = JUnitReport::new();

        assert!(project(&ctx, &sink, false).unwrap().is_empty());
    }
}
