//! Graph builders and the registry selecting one by name.
//!
//! A builder populates an empty [`FeatureGraph`] with a fixed set of features
//! and edges. The topology to run is picked at startup from configuration by
//! looking its identifier up in a [`BuilderRegistry`].

use crate::features::{
    BestAsk, BestBid, LastTradePrice, MidPrice, MidPriceVolatility, RelativeSpread, Spread,
};
use crate::graph::FeatureGraph;
use openbook_core::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::info;

/// Populates a graph with features and edges.
pub trait GraphBuilder: Send {
    fn build(&self, graph: &mut FeatureGraph) -> Result<()>;
}

/// Builds a [`GraphBuilder`] from its configuration parameters.
pub type BuilderFactory = fn(&serde_json::Value) -> Result<Box<dyn GraphBuilder>>;

/// Closed set of builders available to the process, keyed by identifier.
#[derive(Clone, Default)]
pub struct BuilderRegistry {
    factories: BTreeMap<String, BuilderFactory>,
}

impl fmt::Debug for BuilderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.ids()).finish()
    }
}

impl BuilderRegistry {
    /// Registry with no builders.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in builders.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.factories.insert(MidPriceBuilder::ID.to_string(), MidPriceBuilder::factory);
        registry.factories.insert(TopOfBookBuilder::ID.to_string(), TopOfBookBuilder::factory);
        registry
    }

    /// Add a builder under `id`; ids are unique.
    pub fn register(&mut self, id: impl Into<String>, factory: BuilderFactory) -> Result<()> {
        let id = id.into();
        if self.factories.contains_key(&id) {
            return Err(Error::config(format!("builder {} registered twice", id)));
        }
        self.factories.insert(id, factory);
        Ok(())
    }

    /// Instantiate the builder called `id` with `params`.
    pub fn create(&self, id: &str, params: &serde_json::Value) -> Result<Box<dyn GraphBuilder>> {
        let factory = self.factories.get(id).ok_or_else(|| {
            Error::BuilderNotFound(format!(
                "{} (known: {})",
                id,
                self.ids().collect::<Vec<_>>().join(", ")
            ))
        })?;
        factory(params)
    }

    /// Registered identifiers, sorted.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.factories.contains_key(id)
    }

    /// Create the builder, run it against a fresh graph and validate the result.
    pub fn build_graph(&self, id: &str, params: &serde_json::Value) -> Result<FeatureGraph> {
        let builder = self.create(id, params)?;
        let mut graph = FeatureGraph::new();
        builder.build(&mut graph)?;
        graph.validate()?;

        info!(
            builder = id,
            features = graph.len(),
            roots = graph.roots().len(),
            "Feature graph built"
        );
        Ok(graph)
    }
}

/// Decode builder parameters; a missing (null) section means defaults.
fn parse_params<P: DeserializeOwned + Default>(id: &str, params: &serde_json::Value) -> Result<P> {
    if params.is_null() {
        return Ok(P::default());
    }
    serde_json::from_value(params.clone())
        .map_err(|e| Error::config(format!("invalid params for builder {}: {}", id, e)))
}

/// BestAsk and BestBid feeding MidPrice.
#[derive(Debug, Clone, Default)]
pub struct MidPriceBuilder;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct NoParams {}

impl MidPriceBuilder {
    pub const ID: &'static str = "mid_price";

    fn factory(params: &serde_json::Value) -> Result<Box<dyn GraphBuilder>> {
        let NoParams {} = parse_params(Self::ID, params)?;
        Ok(Box::new(Self))
    }
}

impl GraphBuilder for MidPriceBuilder {
    fn build(&self, graph: &mut FeatureGraph) -> Result<()> {
        let ask = BestAsk::install(graph)?;
        let bid = BestBid::install(graph)?;
        MidPrice::install(graph, ask, bid)?;
        Ok(())
    }
}

/// Parameters of [`TopOfBookBuilder`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TopOfBookParams {
    /// Number of mid-price log returns in the volatility window.
    pub volatility_window: usize,
    /// Best-price moves of at most this size do not recompute the spread.
    pub price_epsilon: f64,
}

impl Default for TopOfBookParams {
    fn default() -> Self {
        Self {
            volatility_window: 50,
            price_epsilon: 0.0,
        }
    }
}

/// Every built-in feature: book roots, mid, spreads, volatility and last trade.
#[derive(Debug, Clone, Default)]
pub struct TopOfBookBuilder {
    params: TopOfBookParams,
}

impl TopOfBookBuilder {
    pub const ID: &'static str = "top_of_book";

    pub fn new(params: TopOfBookParams) -> Result<Self> {
        if params.volatility_window < 2 {
            return Err(Error::config("volatility_window must be at least 2"));
        }
        if !params.price_epsilon.is_finite() || params.price_epsilon < 0.0 {
            return Err(Error::config("price_epsilon must be finite and non-negative"));
        }
        Ok(Self { params })
    }

    fn factory(params: &serde_json::Value) -> Result<Box<dyn GraphBuilder>> {
        let params = parse_params(Self::ID, params)?;
        Ok(Box::new(Self::new(params)?))
    }
}

impl GraphBuilder for TopOfBookBuilder {
    fn build(&self, graph: &mut FeatureGraph) -> Result<()> {
        let ask = BestAsk::install(graph)?;
        let bid = BestBid::install(graph)?;
        let mid = MidPrice::install(graph, ask, bid)?;
        let spread = Spread::install(graph, ask, bid, self.params.price_epsilon)?;
        RelativeSpread::install(graph, mid, spread)?;
        MidPriceVolatility::install(graph, mid, self.params.volatility_window)?;
        LastTradePrice::install(graph)?;
        Ok(())
    }
}
