// src/engine/queue.rs

use tracing::debug;

use crate::engine::TaskName;
use crate::types::TriggerWhileRunningBehaviour;

/// Triggers that arrived while the same task was already running.
///
/// In `Queue` mode, any number of triggers for a running task collapse into
/// a single pending rerun, started when the current run finishes. In
/// `Parallel` mode nothing is ever queued; the core dispatches immediately.
#[derive(Debug)]
pub struct TriggerQueue {
    behaviour: TriggerWhileRunningBehaviour,
    /// Pending reruns in arrival order, each task at most once.
    pending: Vec<TaskName>,
}

impl TriggerQueue {
    pub fn new(behaviour: TriggerWhileRunningBehaviour) -> Self {
        Self {
            behaviour,
            pending: Vec::new(),
        }
    }

    pub fn behaviour(&self) -> TriggerWhileRunningBehaviour {
        self.behaviour
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn contains(&self, task: &str) -> bool {
        self.pending.iter().any(|t| t == task)
    }

    /// Remember a trigger for a running task. Returns false when a rerun
    /// was already pending (the trigger was coalesced).
    pub fn record_trigger(&mut self, task: &str) -> bool {
        if self.contains(task) {
            debug!(task = %task, "trigger coalesced into pending rerun");
            return false;
        }
        debug!(task = %task, "queued rerun for running task");
        self.pending.push(task.to_string());
        true
    }

    /// Remove the pending rerun of `task`, if any.
    pub fn take(&mut self, task: &str) -> bool {
        match self.pending.iter().position(|t| t == task) {
            Some(idx) => {
                self.pending.remove(idx);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_triggers_coalesce() {
        let mut q = TriggerQueue::new(TriggerWhileRunningBehaviour::Queue);
        assert!(q.record_trigger("less"));
        assert!(!q.record_trigger("less"));
        assert!(q.record_trigger("js"));

        assert!(q.take("less"));
        assert!(!q.take("less"));
        assert!(q.take("js"));
        assert!(q.is_empty());
    }
}
