use crate::types::RunId;

/// Structural change inside the engine, reported as it happens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The oldest memory runs were merged into a new level-0 run.
    BufferFlushed {
        mem_runs: usize,
        entries: usize,
        run: RunId,
    },
    /// A disk level was allocated for the first time.
    LevelCreated { level: usize, run_capacity: usize },
    /// Runs from level `from` are about to be merged into level `to`.
    CascadeStarted { from: usize, to: usize },
    /// A cascade wrote a new run into `level`.
    RunMerged {
        level: usize,
        run: RunId,
        sources: usize,
        entries: usize,
    },
}

/// Receives engine events synchronously on the inserting thread.
pub trait EventListener {
    fn on_event(&self, event: &Event);
}

impl<F: Fn(&Event)> EventListener for F {
    fn on_event(&self, event: &Event) {
        self(event)
    }
}

/// Fan-out point used inside the engine: logs every event and forwards it
/// to the registered listener, if any.
#[derive(Clone, Copy)]
pub(crate) struct Events<'a> {
    listener: Option<&'a dyn EventListener>,
}

impl<'a> Events<'a> {
    pub(crate) fn new(listener: Option<&'a dyn EventListener>) -> Self {
        Events { listener }
    }

    pub(crate) fn emit(&self, event: Event) {
        match &event {
            Event::BufferFlushed {
                mem_runs,
                entries,
                run,
            } => tracing::debug!(mem_runs, entries, run = %run, "Flushed buffer tier"),
            Event::LevelCreated {
                level,
                run_capacity,
            } => tracing::info!(level, run_capacity, "Created disk level"),
            Event::CascadeStarted { from, to } => {
                tracing::debug!(from, to, "Starting cascade")
            }
            Event::RunMerged {
                level,
                run,
                sources,
                entries,
            } => tracing::debug!(level, run = %run, sources, entries, "Merged runs"),
        }
        if let Some(listener) = self.listener {
            listener.on_event(&event);
        }
    }
}
