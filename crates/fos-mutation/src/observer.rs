//! Summary Observer
//!
//! Subscription facade over the reconciliation engine. Owns at most one
//! observing session; each delivered batch reaches the callback at most
//! once, and never when nothing effectively changed.

use crate::{
    MutationSource, MutationSummary, ObserveOptions, ReconcileError, Reconciler, RawMutation,
    SetupError, ShadowSnapshot,
};

struct Session<S: MutationSource> {
    engine: Reconciler<S::Node>,
    subscription: S::Subscription,
}

/// Delivers one `MutationSummary` per non-empty batch to a callback
pub struct SummaryObserver<S, F>
where
    S: MutationSource,
    F: FnMut(MutationSummary<S::Node>),
{
    callback: F,
    session: Option<Session<S>>,
}

impl<S, F> SummaryObserver<S, F>
where
    S: MutationSource,
    F: FnMut(MutationSummary<S::Node>),
{
    pub fn new(callback: F) -> Self {
        Self {
            callback,
            session: None,
        }
    }

    /// Mirror `root` and subscribe to its mutations.
    ///
    /// An existing session is disconnected first.
    pub fn observe(
        &mut self,
        source: &mut S,
        root: S::Node,
        options: ObserveOptions,
    ) -> Result<(), SetupError> {
        self.disconnect(source);

        let subscription = source.subscribe(root, &options)?;
        let engine = match Reconciler::build(&*source, root, options) {
            Ok(engine) => engine,
            Err(err) => {
                source.unsubscribe(subscription);
                return Err(err);
            }
        };
        self.session = Some(Session {
            engine,
            subscription,
        });
        Ok(())
    }

    /// Pull the pending batch from `source` and reconcile it.
    ///
    /// Returns whether the callback ran. Idle observers return `Ok(false)`.
    pub fn deliver(&mut self, source: &mut S) -> Result<bool, ReconcileError> {
        let Some(session) = self.session.as_ref() else {
            return Ok(false);
        };
        let batch = source.take_batch(&session.subscription);
        self.handle_batch(&*source, batch)
    }

    /// Reconcile a batch obtained from the source by other means
    pub fn handle_batch(
        &mut self,
        tree: &S,
        batch: Vec<RawMutation<S::Node>>,
    ) -> Result<bool, ReconcileError> {
        let Some(session) = self.session.as_mut() else {
            return Ok(false);
        };
        let summary = session.engine.reconcile(tree, batch)?;
        if summary.is_empty() {
            return Ok(false);
        }
        (self.callback)(summary);
        Ok(true)
    }

    /// Stop observing and release the shadow tree; no-op when idle
    pub fn disconnect(&mut self, source: &mut S) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        source.unsubscribe(session.subscription);
        let released = session.engine.release_all();
        tracing::debug!("Disconnected, released {} shadow nodes", released);
    }

    pub fn is_observing(&self) -> bool {
        self.session.is_some()
    }

    /// Current shadow mirror, if observing
    pub fn shadow_snapshot(&self) -> Option<ShadowSnapshot<S::Node>> {
        self.session
            .as_ref()
            .and_then(|session| session.engine.snapshot().ok())
    }
}
