use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use crate::{
    coef::Coef,
    design::{Design, FORMULA, INTERACTION},
    frame::columns,
    wls::Wls,
    Error, Frame,
};

/// The fitted Difference-in-Differences model.
#[derive(Debug, Clone)]
pub struct DidModel {
    wls: Wls,
    dropped: usize,
}

impl DidModel {
    #[tracing::instrument(skip(frame))]
    pub fn fit(frame: &Frame) -> Result<Self, Error> {
        let design = Design::did(frame)?;
        let wls = Wls::fit(
            design.x(),
            design.y(),
            design.weights(),
            design.clusters(),
            design.colnames(),
        )?;
        let model = Self {
            wls,
            dropped: design.dropped(),
        };
        let did = model.interaction()?;
        info!(
            coef = did.coef(),
            std_err = did.std_err(),
            p = did.p(),
            nobs = model.wls.nobs(),
            clusters = model.wls.n_clusters(),
            "Fitted DiD model"
        );
        Ok(model)
    }

    /// The `treat:post` estimate.
    pub fn interaction(&self) -> Result<&Coef, Error> {
        self.wls
            .coef(INTERACTION)
            .ok_or_else(|| Error::TermNotFound(INTERACTION.to_string()))
    }

    pub fn wls(&self) -> &Wls {
        &self.wls
    }

    pub fn formula(&self) -> &'static str {
        FORMULA
    }

    pub fn dependent(&self) -> &'static str {
        columns::LOG_INCOME
    }

    pub fn cluster_column(&self) -> &'static str {
        columns::REGION
    }

    /// Rows excluded from the fit because of missing values.
    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

/// Fits the model once per loaded table. A different table (for example after
/// the loader picked up a changed file) is refitted.
#[derive(Debug, Default)]
pub struct EffectEstimator {
    cache: Mutex<Option<(Arc<Frame>, Arc<DidModel>)>>,
}

impl EffectEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn estimate(&self, frame: &Arc<Frame>) -> Result<Arc<DidModel>, Error> {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        if let Some((cached, model)) = cache.as_ref() {
            if Arc::ptr_eq(cached, frame) {
                debug!("Using cached model");
                return Ok(Arc::clone(model));
            }
        }
        let model = Arc::new(DidModel::fit(frame)?);
        *cache = Some((Arc::clone(frame), Arc::clone(&model)));
        Ok(model)
    }

    pub fn clear(&self) {
        *self.cache.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
}
