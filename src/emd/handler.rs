use crate::Distance;

/// Observer for pairwise results as they complete.
///
/// Workers call observe concurrently and in completion order, never in
/// pair order. Implementations own their synchronization; the driver
/// adds none, so an embarrassingly parallel sweep stays one. Failed
/// pairs are never observed, whatever the failure policy.
pub trait Handler: Sync {
    /// account one computed emd value
    fn observe(&self, emd: Distance);
}

/// lets a caller register a shared handle and keep one to read back
impl<H: Handler + Send + ?Sized> Handler for std::sync::Arc<H> {
    fn observe(&self, emd: Distance) {
        (**self).observe(emd)
    }
}
