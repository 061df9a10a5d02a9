//! Daily visit counting

use crate::core::{AggregatedMetric, ResolvedEvent};
use crate::indexing::CatalogIndex;
use chrono::NaiveDate;
use std::collections::HashMap;

/// Counts resolved events per (date, canonical id).
///
/// Memory grows with the number of distinct pairs, not with the number of
/// events, so spooled events can be streamed through it.
#[derive(Debug, Default)]
pub struct Aggregator {
    counts: HashMap<(NaiveDate, String), u64>,
    events: u64,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, event: ResolvedEvent) {
        *self.counts.entry((event.date, event.canonical_id)).or_insert(0) += 1;
        self.events += 1;
    }

    /// Number of events added so far.
    pub fn event_count(&self) -> u64 {
        self.events
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Join owner ids from `owners` and sort by visit count, highest first.
    ///
    /// Equal counts are ordered by date then id so the output is reproducible.
    pub fn finish(self, owners: &CatalogIndex) -> Vec<AggregatedMetric> {
        let mut rows: Vec<AggregatedMetric> = self
            .counts
            .into_iter()
            .map(|((date, entity_id), visit_count)| {
                let owner = owners.owner(&entity_id);
                AggregatedMetric {
                    date,
                    dataset_id: owner.and_then(|o| o.dataset_id.clone()),
                    organization_id: owner.and_then(|o| o.organization_id.clone()),
                    entity_id,
                    visit_count,
                }
            })
            .collect();

        rows.sort_by(|a, b| {
            b.visit_count
                .cmp(&a.visit_count)
                .then_with(|| a.date.cmp(&b.date))
                .then_with(|| a.entity_id.cmp(&b.entity_id))
        });
        rows
    }
}

/// Group, count, join and sort a batch of resolved events in one call.
pub fn aggregate<I>(events: I, owners: &CatalogIndex) -> Vec<AggregatedMetric>
where
    I: IntoIterator<Item = ResolvedEvent>,
{
    let mut aggregator = Aggregator::new();
    for event in events {
        aggregator.add(event);
    }
    aggregator.finish(owners)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::EntityType;
    use crate::indexing::CatalogEntry;

    fn resolved(date: NaiveDate, id: &str) -> ResolvedEvent {
        ResolvedEvent { date, entity_type: EntityType::DatasetSlug, canonical_id: id.to_string() }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn test_counts_and_sorts_descending() {
        let owners = CatalogIndex::build(vec![
            CatalogEntry::new("I", "i").with_organization("OI"),
            CatalogEntry::new("J", "j"),
        ]);
        let mut events = Vec::new();
        events.extend((0..3).map(|_| resolved(day(1), "I")));
        events.extend((0..7).map(|_| resolved(day(1), "J")));

        let rows = aggregate(events, &owners);
        assert_eq!(rows.len(), 2);
        assert_eq!((rows[0].entity_id.as_str(), rows[0].visit_count), ("J", 7));
        assert_eq!((rows[1].entity_id.as_str(), rows[1].visit_count), ("I", 3));
        assert_eq!(rows[1].organization_id.as_deref(), Some("OI"));
        assert_eq!(rows[0].organization_id, None);
    }

    #[test]
    fn test_dates_are_kept_apart() {
        let rows = aggregate(
            vec![resolved(day(1), "I"), resolved(day(2), "I"), resolved(day(2), "I")],
            &CatalogIndex::default(),
        );
        assert_eq!(rows.len(), 2);
        assert_eq!((rows[0].date, rows[0].visit_count), (day(2), 2));
        assert_eq!((rows[1].date, rows[1].visit_count), (day(1), 1));
    }

    #[test]
    fn test_ties_have_a_stable_order() {
        let events = vec![resolved(day(2), "B"), resolved(day(1), "C"), resolved(day(1), "A")];
        let rows = aggregate(events, &CatalogIndex::default());
        let order: Vec<_> = rows.iter().map(|r| (r.date, r.entity_id.as_str())).collect();
        assert_eq!(order, vec![(day(1), "A"), (day(1), "C"), (day(2), "B")]);
    }

    #[test]
    fn test_resource_owner_join() {
        let owners = CatalogIndex::build(vec![CatalogEntry::new("R1", "https://example.org/r1")
            .with_dataset("D1")
            .with_organization("O1")]);
        let rows = aggregate(vec![resolved(day(1), "R1")], &owners);
        assert_eq!(rows[0].dataset_id.as_deref(), Some("D1"));
        assert_eq!(rows[0].organization_id.as_deref(), Some("O1"));
    }

    #[test]
    fn test_empty_input_yields_no_rows() {
        let aggregator = Aggregator::new();
        assert!(aggregator.is_empty());
        assert!(aggregator.finish(&CatalogIndex::default()).is_empty());
    }
}
