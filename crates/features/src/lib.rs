//! Feature graph for the openbook system.
//!
//! This crate handles:
//! - The `Feature` abstraction and edge guards
//! - Registration, validation and incremental propagation (`FeatureGraph`)
//! - Concrete top-of-book features
//! - Graph builders selected by name at startup

pub mod builder;
pub mod feature;
pub mod features;
pub mod graph;
pub mod guard;

pub use builder::{
    BuilderFactory, BuilderRegistry, GraphBuilder, MidPriceBuilder, TopOfBookBuilder,
    TopOfBookParams,
};
pub use feature::{finite, Feature, FeatureId, ParentValues};
pub use graph::{Cascade, FeatureGraph};
pub use guard::Guard;
