use super::event::DomainEvent;

// ============================================================================
// Aggregate Root Pattern - Event Sourcing Core
// ============================================================================
//
// Key Principles:
// 1. State is derived from events (not stored directly)
// 2. Events represent facts that have already happened
// 3. The fold runs in timestamp order; ties keep append order
//
// Aggregates here only replay. Whether a new event is legal is a decision
// for whoever emits it.
//
// ============================================================================

pub trait Aggregate: Sized + Send + Sync {
    type Event: DomainEvent;
    type Error: std::fmt::Display;

    /// Create new aggregate from first event
    fn apply_first_event(event: &Self::Event) -> Result<Self, Self::Error>;

    /// Apply subsequent events to update state
    fn apply_event(&mut self, event: &Self::Event) -> Result<(), Self::Error>;

    /// Reconstruct from history. Returns `Ok(None)` when there is no history.
    fn load_from_events(mut events: Vec<Self::Event>) -> Result<Option<Self>, Self::Error> {
        // sort_by_key is stable, so equal timestamps keep their append order
        events.sort_by_key(|event| event.timestamp());

        let mut iter = events.iter();
        let Some(first) = iter.next() else {
            return Ok(None);
        };

        let mut aggregate = Self::apply_first_event(first)?;
        for event in iter {
            aggregate.apply_event(event)?;
        }

        Ok(Some(aggregate))
    }
}
