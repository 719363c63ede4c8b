use serde::Serialize;

/// Scheduler operational counters.
///
/// Counter-based only; the scheduler never reads wall-clock time.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchedulerMetrics {
    /// Update ticks driven so far.
    pub ticks: u64,
    /// Tasks dispatched to their handlers.
    pub tasks_dispatched: u64,
    /// Dispatches that requested a repeat.
    pub tasks_repeated: u64,
    /// Ticks whose task drain was stopped early by a validator veto.
    pub validator_vetoes: u64,
    /// Deferred operations applied at tick start.
    pub deferred_ops_run: u64,
    /// Tasks removed by cancel operations.
    pub tasks_cancelled: u64,
}
