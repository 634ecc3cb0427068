use crate::{RawCycleData, Result};

/// Supplies the flat record set the pipeline is built from.
pub trait CycleDataSource {
    /// Short label used in logs.
    fn name(&self) -> &str;

    fn fetch(&self) -> Result<RawCycleData>;
}
