use std::sync::Arc;

use tracing::debug;

use crate::{
    chart::{render_trends, ChartConfig},
    estimator::{DidModel, EffectEstimator},
    loader::DataLoader,
    pages::{self, Page},
    trends::Trends,
    Config, Error, Frame,
};

/// Shared state of a running dashboard: the configuration plus the two
/// memoization caches. Each view reloads and recomputes what it needs
/// independently.
#[derive(Debug, Default)]
pub struct Dashboard {
    config: Config,
    loader: DataLoader,
    estimator: EffectEstimator,
}

impl Dashboard {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            loader: DataLoader::new(),
            estimator: EffectEstimator::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn data(&self) -> Result<Arc<Frame>, Error> {
        self.loader.load(&self.config.data_path)
    }

    pub fn trends(&self) -> Result<Trends, Error> {
        Trends::from_frame(&*self.data()?)
    }

    pub fn model(&self) -> Result<Arc<DidModel>, Error> {
        self.estimator.estimate(&self.data()?)
    }

    fn chart_config(&self) -> ChartConfig {
        ChartConfig::default().with_policy_boundary(self.config.policy_boundary)
    }

    pub fn trends_svg(&self) -> Result<String, Error> {
        Ok(render_trends(&self.trends()?, &self.chart_config()))
    }

    /// Render a page. Failures are returned so the caller can show them.
    pub fn render(&self, page: Page) -> Result<String, Error> {
        debug!(?page, "Rendering page");
        match page {
            Page::Home => Ok(pages::home()),
            Page::Trends => Ok(pages::trends(&self.trends()?, &self.chart_config())),
            Page::Effect => pages::effect(&*self.model()?, self.config.significance_level),
        }
    }

    /// Forget the cached table and model.
    pub fn clear_cache(&self) {
        self.loader.clear();
        self.estimator.clear();
    }
}
