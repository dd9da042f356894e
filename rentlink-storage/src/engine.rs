//! Linkage engine: the service boundary over resolution and calculation.
//!
//! A contract-recalculation workflow or report generator supplies an index
//! family, base/target dates, base/target index values and a base rent. The
//! engine resolves chaining, applies linkage, and hands back the result with
//! any missing-factor warning attached. Persisting the adjusted rent is the
//! caller's concern.

use std::sync::Arc;

use rentlink_core::{
    parse_date, ChainingResult, EngineConfig, IndexFamily, LinkageCalculator, LinkageContext,
    LinkageResult, LinkageTerms, MissingChainingFactor, RentlinkResult,
};

use crate::cache::{CacheConfig, ChainingTableCache};
use crate::clock::{Clock, SystemClock};
use crate::resolver::ChainingFactorResolver;
use crate::source::ChainingTableSource;

/// Everything needed to recalculate one contract's rent.
#[derive(Debug, Clone, PartialEq)]
pub struct RecalculationRequest {
    pub index_family: IndexFamily,
    pub context: LinkageContext,
    pub terms: LinkageTerms,
}

impl RecalculationRequest {
    /// Full linkage with no contractual modifiers.
    pub fn new(index_family: IndexFamily, context: LinkageContext) -> Self {
        Self {
            index_family,
            context,
            terms: LinkageTerms::default(),
        }
    }

    pub fn with_terms(mut self, terms: LinkageTerms) -> Self {
        self.terms = terms;
        self
    }
}

/// Outcome of [`LinkageEngine::recalculate`].
#[derive(Debug, Clone, PartialEq)]
pub struct Recalculation {
    pub chaining: ChainingResult,
    pub result: LinkageResult,
    /// Human-readable derivation line.
    pub formula: String,
    /// Present when the chaining factor was a fallback.
    pub warning: Option<MissingChainingFactor>,
}

impl Recalculation {
    /// The figure rests on a guessed chaining factor.
    pub fn is_approximate(&self) -> bool {
        self.result.approximate
    }
}

/// Rent index-linkage engine.
pub struct LinkageEngine<S: ChainingTableSource> {
    resolver: ChainingFactorResolver<S>,
}

impl<S: ChainingTableSource> LinkageEngine<S> {
    /// Build an engine from a validated configuration, using the system clock.
    pub fn new(source: Arc<S>, config: &EngineConfig) -> RentlinkResult<Self> {
        Self::with_clock(source, config, Arc::new(SystemClock))
    }

    /// Build an engine with an injected clock.
    pub fn with_clock(
        source: Arc<S>,
        config: &EngineConfig,
        clock: Arc<dyn Clock>,
    ) -> RentlinkResult<Self> {
        config.validate()?;
        let periods = Arc::new(config.period_table()?);
        let cache_config = CacheConfig::new().with_ttl(config.cache_ttl());
        let cache = Arc::new(ChainingTableCache::with_clock(source, cache_config, clock));

        tracing::debug!(
            periods = periods.boundaries().len(),
            ttl_secs = config.cache_ttl_secs,
            "Linkage engine initialized"
        );
        Ok(Self::from_resolver(ChainingFactorResolver::new(cache, periods)))
    }

    /// Wrap an existing resolver (and its shared cache).
    pub fn from_resolver(resolver: ChainingFactorResolver<S>) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &ChainingFactorResolver<S> {
        &self.resolver
    }

    pub fn cache(&self) -> &ChainingTableCache<S> {
        self.resolver.cache()
    }

    /// `ResolveChaining(indexFamily, baseDate, targetDate)` over raw strings.
    ///
    /// Unknown families are a configuration error; unparseable dates are a
    /// validation error.
    pub async fn resolve_chaining(
        &self,
        index_family: &str,
        base_date: &str,
        target_date: &str,
    ) -> RentlinkResult<ChainingResult> {
        let family: IndexFamily = index_family.parse()?;
        let base_date = parse_date(base_date)?;
        let target_date = parse_date(target_date)?;
        Ok(self.resolver.resolve(family, base_date, target_date).await)
    }

    /// `ApplyLinkage(context, chainingResult)`.
    pub fn apply_linkage(
        &self,
        context: &LinkageContext,
        chaining: &ChainingResult,
    ) -> RentlinkResult<LinkageResult> {
        Ok(LinkageCalculator::apply(context, chaining)?)
    }

    /// Resolve chaining and apply linkage under the request's terms.
    ///
    /// Input is validated before any cache access.
    pub async fn recalculate(&self, request: &RecalculationRequest) -> RentlinkResult<Recalculation> {
        let context = &request.context;
        context.validate()?;
        request.terms.validate()?;

        let chaining = self
            .resolver
            .resolve(request.index_family, context.base_date, context.target_date)
            .await;
        let result = LinkageCalculator::apply_with_terms(context, &chaining, &request.terms)?;
        let formula = LinkageCalculator::formula(context, &chaining, &request.terms, &result);
        let warning = chaining.warning(request.index_family);

        Ok(Recalculation {
            chaining,
            result,
            formula,
            warning,
        })
    }
}
