// Stage notifications
//
// The orchestrator reports progress through an injected observer instead of
// printing, so callers decide how (and whether) to render it.

use camino::Utf8PathBuf;
use tokio::sync::broadcast;

use crate::models::Stage;

/// Lifecycle notifications emitted while a pipeline runs
#[derive(Clone, Debug, PartialEq)]
pub enum PipelineEvent {
    /// A stage's output directory exists and its tool is about to run
    StageStarted { stage: Stage, output_dir: Utf8PathBuf },

    /// A stage was skipped on request
    StageSkipped { stage: Stage },

    /// A stage's tool has finished
    StageFinished {
        stage: Stage,
        success: bool,
        error: Option<String>,
    },

    /// The pipeline stopped, either after the last stage or at a failure
    PipelineFinished { success: bool },
}

/// Receiver of [`PipelineEvent`]s.
#[cfg_attr(test, mockall::automock)]
pub trait PipelineObserver {
    fn notify(&self, event: PipelineEvent);
}

/// Observer that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {
    fn notify(&self, _event: PipelineEvent) {}
}

/// Fan events out to any number of subscribers.
impl PipelineObserver for broadcast::Sender<PipelineEvent> {
    fn notify(&self, event: PipelineEvent) {
        // Ignore send errors - it's OK if no one is listening
        let _ = self.send(event);
    }
}

impl<T: PipelineObserver + ?Sized> PipelineObserver for &T {
    fn notify(&self, event: PipelineEvent) {
        (**self).notify(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcast_observer_delivers_events() {
        let (tx, mut rx) = broadcast::channel(16);

        tx.notify(PipelineEvent::StageSkipped {
            stage: Stage::QualityControl,
        });
        tx.notify(PipelineEvent::PipelineFinished { success: true });

        assert_eq!(
            rx.try_recv().unwrap(),
            PipelineEvent::StageSkipped {
                stage: Stage::QualityControl
            }
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            PipelineEvent::PipelineFinished { success: true }
        );
    }

    #[test]
    fn test_broadcast_observer_without_subscribers() {
        let (tx, rx) = broadcast::channel::<PipelineEvent>(4);
        drop(rx);

        // Must not panic
        tx.notify(PipelineEvent::PipelineFinished { success: false });
    }

    #[test]
    fn test_reference_observer_forwards() {
        let mut mock = MockPipelineObserver::new();
        mock.expect_notify()
            .withf(|event| matches!(event, PipelineEvent::PipelineFinished { success: true }))
            .times(1)
            .return_const(());

        fn finish<O: PipelineObserver>(observer: O) {
            observer.notify(PipelineEvent::PipelineFinished { success: true });
        }

        finish(&mock);
    }
}
