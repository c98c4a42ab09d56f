pub mod config;
pub mod corpus;
pub mod error;
pub mod graph;
pub mod logging;
pub mod nlp;
pub mod pipeline;

pub use config::Config;
pub use error::{RelgraphError, Result};
pub use graph::{Edge, Graph, Node, NodeId, SelectionBounds, TopNSelector, traverse_graph};
pub use pipeline::{BuildReport, BuiltGraph, Extractors, GraphBuilder};
