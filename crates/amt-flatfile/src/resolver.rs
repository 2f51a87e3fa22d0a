//! Hierarchy resolution: nearest ancestors of a given classification.
//!
//! `nearest_ancestors_of_type(c, K)` intersects the closed ancestor set of
//! `c` with the members of `K` and keeps only the minimal frontier: no
//! result is an ancestor of another result. The remaining lookups build on
//! it and decide what a missing or ambiguous answer means.

use std::collections::BTreeSet;

use amt_types::{Classification, SctId};
use tracing::{error, warn};

use crate::cache::{AncestorCache, CacheStats};
use crate::config::ResolverCacheConfig;
use crate::error::{FlatFileError, FlatFileResult};
use crate::report::{Failure, ReportSink};
use crate::store::ReleaseContext;

/// Result of resolving the MPs of an MPUU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MpResolution {
    /// MPs in id order; several only when ambiguous.
    pub mps: Vec<SctId>,
    /// True when the tie-break could not pick a single MP.
    pub ambiguous: bool,
}

/// Answers nearest-ancestor queries against a closed, validated release.
pub struct HierarchyResolver<'a> {
    ctx: &'a ReleaseContext,
    sink: &'a dyn ReportSink,
    exit_on_error: bool,
    cache: Option<AncestorCache>,
}

impl<'a> HierarchyResolver<'a> {
    /// Creates a resolver without memoisation.
    pub fn new(ctx: &'a ReleaseContext, sink: &'a dyn ReportSink, exit_on_error: bool) -> Self {
        Self {
            ctx,
            sink,
            exit_on_error,
            cache: None,
        }
    }

    /// Enables memoisation of nearest-ancestor lookups.
    pub fn with_cache(mut self, config: &ResolverCacheConfig) -> Self {
        self.cache = Some(AncestorCache::new(config));
        self
    }

    /// Cache statistics, if memoisation is enabled.
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(AncestorCache::stats)
    }

    /// The release being resolved against.
    pub fn context(&self) -> &'a ReleaseContext {
        self.ctx
    }

    pub(crate) fn sink(&self) -> &'a dyn ReportSink {
        self.sink
    }

    /// Nearest ancestors of `concept_id` classified as `classification`, in id order.
    pub fn nearest_ancestors_of_type(
        &self,
        concept_id: SctId,
        classification: Classification,
    ) -> Vec<SctId> {
        if let Some(cached) = self
            .cache
            .as_ref()
            .and_then(|cache| cache.get(concept_id, classification))
        {
            return cached;
        }

        let result = self.compute_nearest(concept_id, classification);
        if let Some(cache) = &self.cache {
            cache.set(concept_id, classification, result.clone());
        }
        result
    }

    fn compute_nearest(&self, concept_id: SctId, classification: Classification) -> Vec<SctId> {
        let Some(ancestors) = self.ctx.ancestors(concept_id) else {
            return Vec::new();
        };
        let members = self.ctx.classifications().members(classification);
        let candidates: BTreeSet<SctId> = ancestors
            .iter()
            .copied()
            .filter(|id| members.contains(id))
            .collect();

        candidates
            .iter()
            .copied()
            .filter(|&candidate| {
                !candidates
                    .iter()
                    .any(|&other| other != candidate && self.ctx.is_ancestor_of(candidate, other))
            })
            .collect()
    }

    /// The single nearest ancestor of a classification.
    ///
    /// Zero or several results are reported. In exit-on-error mode that is
    /// fatal; otherwise `None` is returned and the caller degrades.
    pub fn unique_ancestor_of_type(
        &self,
        concept_id: SctId,
        classification: Classification,
    ) -> FlatFileResult<Option<SctId>> {
        self.unique_ancestor(concept_id, classification, self.exit_on_error)
    }

    /// Like [`unique_ancestor_of_type`](Self::unique_ancestor_of_type) but
    /// never fatal.
    pub fn unique_ancestor_or_report(
        &self,
        concept_id: SctId,
        classification: Classification,
    ) -> Option<SctId> {
        self.unique_ancestor(concept_id, classification, false)
            .ok()
            .flatten()
    }

    fn unique_ancestor(
        &self,
        concept_id: SctId,
        classification: Classification,
        escalate: bool,
    ) -> FlatFileResult<Option<SctId>> {
        let found = self.nearest_ancestors_of_type(concept_id, classification);
        if let [single] = found.as_slice() {
            return Ok(Some(*single));
        }

        let message = format!(
            "Expected 1 parent of type {classification} for concept {} but got [{}]",
            self.ctx.summary(concept_id),
            self.summaries(&found)
        );
        let failure = if found.is_empty() {
            Failure::error(format!("No parents ({concept_id})"), "no parents")
        } else {
            Failure::error(format!("Multiple parents ({concept_id})"), "multiple parents")
        };
        self.report(failure.with_detail(message), escalate)?;
        Ok(None)
    }

    /// MPs of an MPUU, with the ingredient-count tie-break.
    ///
    /// Several nearest MPs are narrowed to the one with strictly the most
    /// ingredients. If that still leaves a tie the ambiguity is reported and,
    /// outside exit-on-error mode, every candidate is kept.
    pub fn mp_ancestors(&self, mpuu_id: SctId) -> FlatFileResult<MpResolution> {
        let mps = self.nearest_ancestors_of_type(mpuu_id, Classification::Mp);

        if mps.is_empty() {
            let message = format!("No MP parent for MPUU {mpuu_id}");
            self.report(
                Failure::error(format!("No parents ({mpuu_id})"), "no parents").with_detail(message),
                self.exit_on_error,
            )?;
            return Ok(MpResolution {
                mps,
                ambiguous: false,
            });
        }
        if mps.len() == 1 {
            return Ok(MpResolution {
                mps,
                ambiguous: false,
            });
        }

        let ingredient_count =
            |id: SctId| self.ctx.concept(id).map_or(0, |c| c.ingredients.len());
        let max = mps.iter().map(|&id| ingredient_count(id)).max().unwrap_or(0);
        let best: Vec<SctId> = mps
            .iter()
            .copied()
            .filter(|&id| ingredient_count(id) == max)
            .collect();
        if let [single] = best.as_slice() {
            return Ok(MpResolution {
                mps: vec![*single],
                ambiguous: false,
            });
        }

        let message = format!(
            "Expected 1 MP parent for MPUU {mpuu_id} but got {}. Filtering by ingredients yielded {} not 1 as required. Full set was {}",
            mps.len(),
            best.len(),
            self.summaries(&mps)
        );
        self.report(
            Failure::error(format!("Multiple parents ({mpuu_id})"), "multiple parents")
                .with_detail(message),
            self.exit_on_error,
        )?;
        Ok(MpResolution {
            mps,
            ambiguous: true,
        })
    }

    /// The trade product of a pack, which must be its only direct TP link.
    ///
    /// Any other count is reported; fatal in exit-on-error mode, otherwise
    /// `None` tells the caller to skip the pack.
    pub fn trade_product_of_pack(&self, pack_id: SctId) -> FlatFileResult<Option<SctId>> {
        let tps = self.direct_tps(pack_id);
        if let [single] = tps.as_slice() {
            return Ok(Some(*single));
        }

        let message = format!(
            "TPP {} has too many TPs [{}]",
            self.ctx.summary(pack_id),
            self.summaries(&tps)
        );
        self.report(
            Failure::error(format!("TPP has too many TPs ({pack_id})"), "TPP error")
                .with_detail(message),
            self.exit_on_error,
        )?;
        Ok(None)
    }

    /// The trade product of a unit.
    ///
    /// Legacy releases look for a TP ancestor first. Otherwise, or when
    /// there is none, the unit's direct TP link is used. More than one direct
    /// link is always fatal; none is reported and yields `None`.
    pub fn trade_product_of_unit(&self, unit_id: SctId) -> FlatFileResult<Option<SctId>> {
        if self.ctx.classifications().content_model().is_legacy() {
            if let Some(tp) = self.unique_ancestor_of_type(unit_id, Classification::Tp)? {
                return Ok(Some(tp));
            }
        }

        let tps = self.direct_tps(unit_id);
        match tps.as_slice() {
            [single] => Ok(Some(*single)),
            [] => {
                let message = format!("TPUU has no TPs {}", self.ctx.summary(unit_id));
                error!("{message}");
                self.sink.record(
                    Failure::error(format!("TPUU has no TPs ({unit_id})"), "TPUU error")
                        .with_detail(message)
                        .with_origin(module_path!()),
                );
                Ok(None)
            }
            _ => {
                let message = format!(
                    "TPUU {} has too many TPs [{}]",
                    self.ctx.summary(unit_id),
                    self.summaries(&tps)
                );
                self.sink.record(
                    Failure::error(format!("TPUU has too many TPs ({unit_id})"), "TPUU error")
                        .with_detail(message.clone())
                        .with_origin(module_path!()),
                );
                Err(FlatFileError::Resolution(message))
            }
        }
    }

    fn direct_tps(&self, concept_id: SctId) -> Vec<SctId> {
        self.ctx
            .concept(concept_id)
            .map(|c| c.tps.iter().copied().collect())
            .unwrap_or_default()
    }

    fn summaries(&self, ids: &[SctId]) -> String {
        ids.iter()
            .map(|id| self.ctx.summary(*id))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Records a failure and turns it into an error when `escalate` is set.
    fn report(&self, failure: Failure, escalate: bool) -> FlatFileResult<()> {
        warn!("{}", failure.detail);
        let message = failure.detail.clone();
        self.sink.record(failure.with_origin(module_path!()));
        if escalate {
            return Err(FlatFileError::Resolution(message));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::ContentModel;
    use crate::report::JUnitReport;
    use amt_types::{well_known, LinkKind};

    fn add(ctx: &mut ReleaseContext, id: SctId, classification: Option<Classification>) {
        ctx.add_concept(id, true, well_known::AMT_MODULE);
        ctx.set_pt(id, format!("c{id}"));
        if let Some(classification) = classification {
            ctx.classify(id, classification);
        }
    }

    /// ```text
    ///      10 (MP)        11 (MP)
    ///        |              |
    ///      20 (MP)          |
    ///         \            /
    ///          30 (MPUU) -+
    ///              |
    ///          40 (TPUU)
    /// ```
    fn context() -> ReleaseContext {
        let mut ctx = ReleaseContext::new();
        add(&mut ctx, 10, Some(Classification::Mp));
        add(&mut ctx, 11, Some(Classification::Mp));
        add(&mut ctx, 20, Some(Classification::Mp));
        add(&mut ctx, 30, Some(Classification::Mpuu));
        add(&mut ctx, 40, Some(Classification::Tpuu));
        add(&mut ctx, 50, Some(Classification::Tp));
        add(&mut ctx, 60, Some(Classification::Tp));
        add(&mut ctx, 70, None);

        ctx.add_link(20, LinkKind::Parent, 10);
        ctx.add_link(30, LinkKind::Parent, 20);
        ctx.add_link(30, LinkKind::Parent, 11);
        ctx.add_link(40, LinkKind::Parent, 30);
        ctx.add_link(40, LinkKind::TradeProduct, 50);
        ctx.add_link(20, LinkKind::Ingredient, 70);
        ctx.close(false).unwrap();
        ctx
    }

    #[test]
    fn test_nearest_ancestors_are_minimal() {
        let ctx = context();
        let sink = JUnitReport::new();
        let resolver = HierarchyResolver::new(&ctx, &sink, false);

        assert_eq!(resolver.nearest_ancestors_of_type(30, Classification::Mp), vec![11, 20]);
        assert_eq!(resolver.nearest_ancestors_of_type(40, Classification::Mp), vec![11, 20]);
        assert_eq!(resolver.nearest_ancestors_of_type(40, Classification::Mpuu), vec![30]);
        assert!(resolver.nearest_ancestors_of_type(10, Classification::Mp).is_empty());
        assert!(resolver.nearest_ancestors_of_type(999, Classification::Mp).is_empty());
    }

    #[test]
    fn test_unique_ancestor() {
        let ctx = context();
        let sink = JUnitReport::new();
        let resolver = HierarchyResolver::new(&ctx, &sink, false);

        assert_eq!(resolver.unique_ancestor_of_type(40, Classification::Mpuu).unwrap(), Some(30));
        assert_eq!(resolver.unique_ancestor_of_type(40, Classification::Mp).unwrap(), None);
        assert!(sink.contains("Multiple parents (40)"));
        assert_eq!(resolver.unique_ancestor_of_type(30, Classification::Tpp).unwrap(), None);
        assert!(sink.contains("No parents (30)"));
    }

    #[test]
    fn test_unique_ancestor_fatal_in_exit_mode() {
        let ctx = context();
        let sink = JUnitReport::new();
        let resolver = HierarchyResolver::new(&ctx, &sink, true);

        let err = resolver.unique_ancestor_of_type(40, Classification::Mp).unwrap_err();
        assert!(matches!(err, FlatFileError::Resolution(_)));
        assert_eq!(resolver.unique_ancestor_or_report(40, Classification::Mp), None);
    }

    #[test]
    fn test_mp_tie_break_by_ingredients() {
        let ctx = context();
        let sink = JUnitReport::new();
        let resolver = HierarchyResolver::new(&ctx, &sink, true);

        let resolution = resolver.mp_ancestors(30).unwrap();
        assert_eq!(resolution.mps, vec![20]);
        assert!(!resolution.ambiguous);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_mp_tie_reported_as_ambiguous() {
        let mut ctx = context();
        ctx.add_link(11, LinkKind::Ingredient, 70);
        let sink = JUnitReport::new();

        let resolver = HierarchyResolver::new(&ctx, &sink, false);
        let resolution = resolver.mp_ancestors(30).unwrap();
        assert_eq!(resolution.mps, vec![11, 20]);
        assert!(resolution.ambiguous);
        assert!(sink.contains("Multiple parents (30)"));

        let resolver = HierarchyResolver::new(&ctx, &sink, true);
        assert!(resolver.mp_ancestors(30).is_err());
    }

    #[test]
    fn test_no_mp_reported() {
        let ctx = context();
        let sink = JUnitReport::new();
        let resolver = HierarchyResolver::new(&ctx, &sink, false);

        let resolution = resolver.mp_ancestors(10).unwrap();
        assert!(resolution.mps.is_empty());
        assert!(sink.contains("No parents (10)"));
    }

    #[test]
    fn test_trade_product_of_unit_current_model() {
        let mut ctx = context();
        let sink = JUnitReport::new();
        {
            let resolver = HierarchyResolver::new(&ctx, &sink, false);
            assert_eq!(resolver.trade_product_of_unit(40).unwrap(), Some(50));
            assert_eq!(resolver.trade_product_of_unit(30).unwrap(), None);
            assert!(sink.contains("TPUU has no TPs (30)"));
        }

        ctx.add_link(40, LinkKind::TradeProduct, 60);
        let resolver = HierarchyResolver::new(&ctx, &sink, false);
        let err = resolver.trade_product_of_unit(40).unwrap_err();
        assert!(matches!(err, FlatFileError::Resolution(_)), "always fatal");
    }

    #[test]
    fn test_trade_product_of_unit_legacy_prefers_ancestor() {
        let mut ctx = context();
        add(&mut ctx, 80, Some(Classification::Tp));
        add(&mut ctx, 90, Some(Classification::Tpuu));
        ctx.add_link(90, LinkKind::Parent, 80);
        ctx.add_link(90, LinkKind::TradeProduct, 60);
        ctx.close(false).unwrap();
        ctx.classifications_mut().set_content_model(ContentModel::Legacy);

        let sink = JUnitReport::new();
        let resolver = HierarchyResolver::new(&ctx, &sink, false);
        assert_eq!(resolver.trade_product_of_unit(90).unwrap(), Some(80));
        assert_eq!(resolver.trade_product_of_unit(40).unwrap(), Some(50), "falls back to link");
    }

    #[test]
    fn test_trade_product_of_pack() {
        let mut ctx = context();
        add(&mut ctx, 100, Some(Classification::Tpp));
        let sink = JUnitReport::new();
        {
            let resolver = HierarchyResolver::new(&ctx, &sink, false);
            assert_eq!(resolver.trade_product_of_pack(100).unwrap(), None);
            assert!(sink.contains("TPP has too many TPs (100)"));
        }

        ctx.add_link(100, LinkKind::TradeProduct, 50);
        let resolver = HierarchyResolver::new(&ctx, &sink, true);
        assert_eq!(resolver.trade_product_of_pack(100).unwrap(), Some(50));
    }

    #[test]
    fn test_cache_is_used() {
        let ctx = context();
        let sink = JUnitReport::new();
        let resolver = HierarchyResolver::new(&ctx, &sink, false)
            .with_cache(&ResolverCacheConfig::default());

        let first = resolver.nearest_ancestors_of_type(40, Classification::Mp);
        let second = resolver.nearest_ancestors_of_type(40, Classification::Mp);
        assert_eq!(first, second);

        let stats = resolver.cache_stats().unwrap();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }
}
