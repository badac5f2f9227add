pub mod advisor;
pub mod cache;
pub mod classify;
pub mod cli;
pub mod config;
pub mod model;
pub mod probe;
pub mod report;
pub mod sample;
pub mod telemetry;

pub use crate::advisor::{advise, Advice, AdviseOptions};
pub use crate::model::{DecisionResult, ExecutorKind};
pub use crate::probe::{system_profile, SystemProfile};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetisError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Probe error: {0}")]
    Probe(String),

    #[error("Sampling error: {0}")]
    Sampling(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, MetisError>;
