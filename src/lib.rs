//! Difference-in-Differences dashboard: loads a pre-aggregated survey table,
//! shows weighted income trends by group and a weighted regression estimate of
//! the policy effect with region-clustered standard errors.

pub mod chart;
mod coef;
mod config;
mod dashboard;
pub mod design;
mod error;
mod estimator;
pub mod frame;
mod loader;
pub mod pages;
pub mod report;
pub mod server;
mod summary;
pub mod trends;
mod wls;

pub use crate::{
    coef::Coef,
    config::*,
    dashboard::Dashboard,
    error::Error,
    estimator::{DidModel, EffectEstimator},
    frame::Frame,
    loader::DataLoader,
    summary::Summary,
    wls::{Wls, CONFIDENCE},
};
