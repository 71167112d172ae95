/// Counters and gauges the watcher reports. Implementations must be cheap
/// and non-blocking; updates are never retried.
pub trait Metrics: Send + Sync {
    fn set_missed_blocks_threshold(&self, value: usize);
    fn set_sleep(&self, seconds: u64);
    fn blocks_signed_inc(&self);
    fn blocks_missed_inc(&self);
    fn set_blocks_missed_current(&self, value: usize);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl Metrics for NoopMetrics {
    fn set_missed_blocks_threshold(&self, _value: usize) {}
    fn set_sleep(&self, _seconds: u64) {}
    fn blocks_signed_inc(&self) {}
    fn blocks_missed_inc(&self) {}
    fn set_blocks_missed_current(&self, _value: usize) {}
}
