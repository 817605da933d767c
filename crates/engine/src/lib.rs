use thiserror::Error;

pub mod bias;
pub mod decision;
pub mod dedup;
pub mod detector;
pub mod router;
pub mod selector;
pub mod stores;

pub use bias::BiasResolver;
pub use decision::DecisionEngine;
pub use router::TopicRouter;
pub use selector::SignalSelector;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("persistence failure: {0}")]
    Store(String),
}
