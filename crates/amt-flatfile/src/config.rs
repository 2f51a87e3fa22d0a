//! Configuration types for flat file generation.

/// Default number of CTPPs between progress log lines.
pub const DEFAULT_PROGRESS_INTERVAL: usize = 1000;

/// Configuration for a generation run.
///
/// # Example
///
/// ```rust
/// use amt_flatfile::{FlatFileConfig, ResolverCacheConfig};
///
/// let config = FlatFileConfig::builder()
///     .with_exit_on_error(true)
///     .with_resolver_cache(ResolverCacheConfig::default())
///     .with_parallel(true)
///     .with_progress_interval(500)
///     .build();
///
/// assert!(config.exit_on_error);
/// ```
#[derive(Debug, Clone)]
pub struct FlatFileConfig {
    /// Abort on the first reported error instead of repairing or skipping.
    pub exit_on_error: bool,
    /// Close the graph and project CTPPs in parallel (requires `parallel` feature).
    pub parallel: bool,
    /// Resolver memoisation (None = disabled).
    pub resolver_cache: Option<ResolverCacheConfig>,
    /// Number of CTPPs between progress log lines.
    pub progress_interval: usize,
}

impl Default for FlatFileConfig {
    fn default() -> Self {
        Self {
            exit_on_error: false,
            parallel: false,
            resolver_cache: Some(ResolverCacheConfig::default()),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

impl FlatFileConfig {
    /// Creates a new builder for FlatFileConfig.
    pub fn builder() -> FlatFileConfigBuilder {
        FlatFileConfigBuilder::default()
    }
}

/// Builder for FlatFileConfig.
#[derive(Debug, Clone)]
pub struct FlatFileConfigBuilder {
    exit_on_error: bool,
    parallel: bool,
    resolver_cache: Option<ResolverCacheConfig>,
    progress_interval: usize,
}

impl Default for FlatFileConfigBuilder {
    fn default() -> Self {
        let defaults = FlatFileConfig::default();
        Self {
            exit_on_error: defaults.exit_on_error,
            parallel: defaults.parallel,
            resolver_cache: defaults.resolver_cache,
            progress_interval: defaults.progress_interval,
        }
    }
}

impl FlatFileConfigBuilder {
    /// Enables or disables exit-on-error mode.
    pub fn with_exit_on_error(mut self, exit_on_error: bool) -> Self {
        self.exit_on_error = exit_on_error;
        self
    }

    /// Enables or disables parallel closure and projection.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Enables resolver memoisation with the given configuration.
    pub fn with_resolver_cache(mut self, cache: ResolverCacheConfig) -> Self {
        self.resolver_cache = Some(cache);
        self
    }

    /// Disables resolver memoisation.
    pub fn without_resolver_cache(mut self) -> Self {
        self.resolver_cache = None;
        self
    }

    /// Sets the number of CTPPs between progress log lines. Zero disables them.
    pub fn with_progress_interval(mut self, interval: usize) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Builds the FlatFileConfig.
    pub fn build(self) -> FlatFileConfig {
        FlatFileConfig {
            exit_on_error: self.exit_on_error,
            parallel: self.parallel,
            resolver_cache: self.resolver_cache,
            progress_interval: self.progress_interval,
        }
    }
}

/// Configuration for the resolver's nearest-ancestor cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverCacheConfig {
    /// Maximum number of cached `(concept, classification)` lookups.
    pub max_entries: usize,
}

impl Default for ResolverCacheConfig {
    fn default() -> Self {
        Self { max_entries: 50_000 }
    }
}
