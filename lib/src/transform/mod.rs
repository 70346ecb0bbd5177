//! Stages that rewrite the assets flowing through a [`Pipeline`].
//!
//! A [`Transform`] sees the whole [`Batch`] and may merge, split, or drop
//! assets. Most stages work file by file; those implement [`Map`] instead and
//! get a [`Transform`] for free that runs them in parallel, drops any file
//! whose mapping fails, and records the failure in the batch.
//!
//! [`Pipeline`]: crate::pipeline::Pipeline

mod command;
mod concat;
mod css;
mod js;
mod lint;
mod rename;
#[cfg(feature = "sass")]
mod sass;
mod templates;

pub use command::*;
pub use concat::*;
pub use css::*;
pub use js::*;
pub use lint::*;
pub use rename::*;
#[cfg(feature = "sass")]
pub use sass::*;
pub use templates::*;

use rayon::prelude::*;

use crate::asset::Asset;
use crate::error::Result;
use crate::report::Failure;

/// The assets in flight and the failures recorded while producing them.
#[derive(Debug, Default)]
pub struct Batch {
    pub assets: Vec<Asset>,
    pub failures: Vec<Failure>,
}

impl Batch {
    pub fn new(assets: Vec<Asset>) -> Self {
        Batch { assets, failures: vec![] }
    }

    /// Records a failure, logging it as it happens.
    pub fn fail(&mut self, failure: Failure) {
        failure.log();
        self.failures.push(failure);
    }
}

pub trait Transform: Send + Sync {
    fn name(&self) -> &str;

    fn apply(&self, batch: Batch) -> Batch;
}

pub trait Map: Send + Sync {
    fn name(&self) -> &str;

    fn map(&self, asset: Asset) -> Result<Asset>;
}

impl<M: Map> Transform for M {
    fn name(&self) -> &str {
        Map::name(self)
    }

    fn apply(&self, batch: Batch) -> Batch {
        let Batch { assets, mut failures } = batch;
        let results: Vec<(std::path::PathBuf, Result<Asset>)> = assets.into_par_iter()
            .map(|asset| (asset.path(), self.map(asset)))
            .collect();

        let mut batch = Batch { assets: Vec::with_capacity(results.len()), failures: vec![] };
        batch.failures.append(&mut failures);
        for (path, result) in results {
            match result {
                Ok(asset) => batch.assets.push(asset),
                Err(e) => batch.fail(Failure::new(Map::name(self), path, e)),
            }
        }

        batch
    }
}
