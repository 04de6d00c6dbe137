pub mod accumulator;
pub mod bootstrap;
pub mod zscore;

pub use accumulator::{EnsembleAccumulator, NoDataPolicy};
pub use bootstrap::{
    realization, BootstrapEstimator, BootstrapParams, CancellationToken, ResultSet, Sampling,
};
pub use zscore::zscore;
