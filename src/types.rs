use serde::Deserialize;

/// Behaviour when a watch event re-triggers a task whose previous run is
/// still in flight.
///
/// - `Queue`: remember the trigger and run the task once more when the
///   current run finishes. Any number of triggers collapse into one rerun
///   (default behaviour).
/// - `Parallel`: start another run immediately. Overlapping runs write the
///   same destination files; the last write wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TriggerWhileRunningBehaviour {
    #[default]
    Queue,
    Parallel,
}
