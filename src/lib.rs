//! # neurgen: Neural-Circuit Network Generator
//!
//! Builds small concrete networks of model neurons from measured pairwise
//! connectivity statistics between morphological cell types.
//!
//! ## Design Principles
//!
//! 1. **Load once, share read-only**: the [`PathwayCatalog`] and [`ETypeIndex`]
//!    are immutable after construction and serve any number of requests
//! 2. **One RNG per request**: every sampling function takes the generator
//!    explicitly, so a fixed seed reproduces a network exactly
//! 3. **All-or-nothing requests**: a request either yields a complete
//!    [`ResolvedNetwork`] or an error, never a partial network
//! 4. **Export is pure**: [`export::emit`] does no sampling and no I/O
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use neurgen::{GenerationRequest, GeneratorConfig, NetworkGenerator, TopologyTemplate, TypeConstraint};
//!
//! # fn example() -> neurgen::Result<()> {
//! let config = GeneratorConfig::load("neurgen.json")?;
//! let generator = NetworkGenerator::open(config)?;
//!
//! let template = TopologyTemplate::builder()
//!     .node("a", TypeConstraint::exact("L1_DAC"))
//!     .node("b", TypeConstraint::pattern("^L23_")?)
//!     .edge("e0", "a", "b")
//!     .stimulus("a", "", 700.0, 2000.0)
//!     .probe("p0", "b", None)
//!     .build()?;
//!
//! let resolution = generator.generate(&GenerationRequest::Template(&template), 42)?;
//! let doc = neurgen::export::emit(&resolution.network)?;
//! println!("{}", doc.to_json_pretty()?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Pipeline
//!
//! ```text
//! anatomy.json ─┐
//!               ├─► PathwayCatalog ─┐
//! physio.json ──┘                   │
//! model library ─► ETypeIndex ──────┼─► Resolver ─► ResolvedNetwork ─► emit ─► JSON
//! template.json ─► TopologyTemplate ┘
//! ```
//!
//! ## Request modes
//!
//! | Mode | Entry point | Input |
//! |------|-------------|-------|
//! | Template | [`NetworkGenerator::resolve`] | a [`TopologyTemplate`] |
//! | Chain | [`NetworkGenerator::generate_chain`] | a length `N` |
//! | Batch | [`NetworkGenerator::generate_batch`] | many of the above, in parallel |

use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;
use tracing::info;

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod catalog;
pub mod etype;
pub mod template;
pub mod resolver;
pub mod export;
pub mod config;
pub mod batch;

// ============================================================================
// Re-exports: Model (the DTOs)
// ============================================================================

pub use model::{
    Anomaly, Cell, CellType, CellTypeId, Edge, Pathway, Polarity, Probe,
    Resolution, ResolvedNetwork, SamplingAnomaly, Stimulus, SynapseClass,
};

// ============================================================================
// Re-exports: Inputs
// ============================================================================

pub use catalog::{CatalogOptions, PathwayCatalog};
pub use etype::ETypeIndex;
pub use template::{TopologyTemplate, TypeConstraint};
pub use config::GeneratorConfig;

// ============================================================================
// Re-exports: Generation and output
// ============================================================================

pub use resolver::{ChainConfig, Resolver, SamplingConfig};
pub use batch::{BatchConfig, BatchOutcome, GenerationRequest};
pub use export::NetworkDocument;

// ============================================================================
// Top-level generator handle
// ============================================================================

/// The primary entry point. A `NetworkGenerator` owns the loaded catalog,
/// the optional variant index and the generation settings.
///
/// It is `Sync`: one instance serves concurrent requests.
#[derive(Debug, Clone)]
pub struct NetworkGenerator {
    catalog: PathwayCatalog,
    etypes: Option<ETypeIndex>,
    sampling: SamplingConfig,
    chain: ChainConfig,
    batch: BatchConfig,
}

impl NetworkGenerator {
    /// Create a generator from already-loaded inputs, with default settings.
    pub fn with_parts(catalog: PathwayCatalog, etypes: Option<ETypeIndex>) -> Self {
        Self {
            catalog,
            etypes,
            sampling: SamplingConfig::default(),
            chain: ChainConfig::default(),
            batch: BatchConfig::default(),
        }
    }

    /// Load the statistics files and scan the model library named by `config`.
    pub fn open(config: GeneratorConfig) -> Result<Self> {
        config.validate()?;
        let catalog = PathwayCatalog::load(&config.anatomy_path, &config.physiology_path, &config.catalog)?;
        let etypes = config.model_library.as_ref().map(ETypeIndex::scan).transpose()?;
        info!(
            types = catalog.type_count(),
            pathways = catalog.pathway_count(),
            variants = etypes.as_ref().map_or(0, ETypeIndex::len),
            "generator ready"
        );
        Ok(Self::with_parts(catalog, etypes)
            .with_sampling(config.sampling)
            .with_chain(config.chain)
            .with_batch(config.batch))
    }

    pub fn with_sampling(mut self, sampling: SamplingConfig) -> Self {
        self.sampling = sampling;
        self
    }

    pub fn with_chain(mut self, chain: ChainConfig) -> Self {
        self.chain = chain;
        self
    }

    pub fn with_batch(mut self, batch: BatchConfig) -> Self {
        self.batch = batch;
        self
    }

    pub fn catalog(&self) -> &PathwayCatalog {
        &self.catalog
    }

    pub fn etypes(&self) -> Option<&ETypeIndex> {
        self.etypes.as_ref()
    }

    pub fn chain_config(&self) -> &ChainConfig {
        &self.chain
    }

    pub fn batch_config(&self) -> &BatchConfig {
        &self.batch
    }

    /// A resolver borrowing this generator's inputs and sampling settings.
    pub fn resolver(&self) -> Resolver<'_> {
        let resolver = Resolver::new(&self.catalog).with_sampling(self.sampling.clone());
        match &self.etypes {
            Some(index) => resolver.with_etypes(index),
            None => resolver,
        }
    }

    /// Resolve a template with a caller-supplied RNG.
    pub fn resolve<R: Rng + ?Sized>(&self, template: &TopologyTemplate, rng: &mut R) -> Result<Resolution> {
        self.resolver().resolve(template, rng)
    }

    /// Generate a linear chain of `length` cells with a caller-supplied RNG.
    pub fn generate_chain<R: Rng + ?Sized>(&self, length: usize, rng: &mut R) -> Result<Resolution> {
        self.resolver().generate_chain(length, &self.chain, rng)
    }

    /// Run one request of either mode.
    pub fn generate_with<R: Rng + ?Sized>(&self, request: &GenerationRequest<'_>, rng: &mut R) -> Result<Resolution> {
        match request {
            GenerationRequest::Template(template) => self.resolve(template, rng),
            GenerationRequest::Chain { length } => self.generate_chain(*length, rng),
        }
    }

    /// Run one request with a fresh RNG seeded from `seed`.
    pub fn generate(&self, request: &GenerationRequest<'_>, seed: u64) -> Result<Resolution> {
        let mut rng = StdRng::seed_from_u64(seed);
        self.generate_with(request, &mut rng)
    }
}

impl<'t> From<&'t TopologyTemplate> for GenerationRequest<'t> {
    fn from(template: &'t TopologyTemplate) -> Self {
        GenerationRequest::Template(template)
    }
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Data integrity error: {0}")]
    DataIntegrity(String),

    #[error("No model variants for cell type '{mtype}'")]
    NoVariantsForType { mtype: String },

    #[error("Unsatisfiable template: {0}")]
    UnsatisfiableTemplate(String),

    #[error("Chain dead end at '{cell_type}' after {attempts} attempt(s)")]
    DeadEnd { cell_type: String, attempts: usize },

    #[error("Invalid template: {0}")]
    InvalidTemplate(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid network document: {0}")]
    Document(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid type pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Failures that abort one request but leave the shared catalog and
    /// index usable, and that a fresh draw may avoid.
    pub fn is_request_scoped(&self) -> bool {
        matches!(
            self,
            Error::NoVariantsForType { .. } | Error::UnsatisfiableTemplate(_) | Error::DeadEnd { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
