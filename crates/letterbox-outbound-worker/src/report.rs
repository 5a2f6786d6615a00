use letterbox_delivery::RouteKind;

/// Outcome counts for one processing pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Records the pass acted on.
    pub fetched: usize,
    /// Written into a recipient store on this host.
    pub delivered: usize,
    /// Answered with a loop-back acknowledgment.
    pub looped_back: usize,
    /// Handed to a fallback transport.
    pub via_fallback: usize,
    /// No route; discarded.
    pub dropped: usize,
    /// Errored, or gave up after the last confirmed attempt.
    pub failed: usize,
    /// Left for a later confirmed attempt.
    pub retried: usize,
}

impl PassReport {
    pub fn is_empty(&self) -> bool {
        self.fetched == 0
    }

    pub(crate) fn record_route(&mut self, kind: RouteKind) {
        match kind {
            RouteKind::Direct => self.delivered += 1,
            RouteKind::Loopback => self.looped_back += 1,
            RouteKind::Fallback => self.via_fallback += 1,
        }
    }
}
