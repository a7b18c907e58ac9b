//! Ordered, uid-keyed event collection.

use std::collections::HashMap;

use serde_json::Value;

use crate::event::CalendarEvent;

/// Events keyed by uid, in insertion order.
///
/// Re-inserting an existing uid replaces the event in place, keeping its
/// position. Removed slots are tombstoned and compacted once they make up
/// half of the backing storage.
#[derive(Debug, Clone, Default)]
pub struct EventCollection {
    entries: Vec<Option<(String, CalendarEvent)>>,
    index: HashMap<String, usize>,
}

/// Key accepted by [`EventCollection::remove`].
pub enum EventKey<'a> {
    Uid(&'a str),
    Event(&'a CalendarEvent),
}

impl<'a> From<&'a str> for EventKey<'a> {
    fn from(uid: &'a str) -> Self {
        EventKey::Uid(uid)
    }
}

impl<'a> From<&'a String> for EventKey<'a> {
    fn from(uid: &'a String) -> Self {
        EventKey::Uid(uid)
    }
}

impl<'a> From<&'a CalendarEvent> for EventKey<'a> {
    fn from(event: &'a CalendarEvent) -> Self {
        EventKey::Event(event)
    }
}

impl EventCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an event under its own uid.
    pub fn add(&mut self, event: CalendarEvent) -> &mut Self {
        let uid = event.uid().to_string();
        self.set(uid, event)
    }

    /// Insert every event of `other`, in order; existing uids are replaced.
    pub fn add_events(&mut self, other: &EventCollection) -> &mut Self {
        for (uid, event) in other {
            self.set(uid.to_string(), event.clone());
        }
        self
    }

    /// Insert `event` under `uid`, replacing in place when the key exists.
    pub fn set(&mut self, uid: impl Into<String>, event: CalendarEvent) -> &mut Self {
        let uid = uid.into();
        match self.index.get(&uid) {
            Some(&slot) => self.entries[slot] = Some((uid, event)),
            None => {
                self.index.insert(uid.clone(), self.entries.len());
                self.entries.push(Some((uid, event)));
            }
        }
        self
    }

    /// Remove by uid or by the event's uid. Absent keys are a no-op.
    pub fn remove<'a>(&mut self, key: impl Into<EventKey<'a>>) -> Option<CalendarEvent> {
        let uid = match key.into() {
            EventKey::Uid(uid) => uid.to_string(),
            EventKey::Event(event) => event.uid().to_string(),
        };
        let slot = self.index.remove(&uid)?;
        let removed = self.entries[slot].take().map(|(_, event)| event);
        self.compact_if_sparse();
        removed
    }

    /// Remove the first event equal to `event`. Returns whether one was found.
    pub fn remove_element(&mut self, event: &CalendarEvent) -> bool {
        let found = self
            .iter()
            .find(|(_, candidate)| *candidate == event)
            .map(|(uid, _)| uid.to_string());

        match found {
            Some(uid) => self.remove(uid.as_str()).is_some(),
            None => false,
        }
    }

    pub fn get(&self, uid: &str) -> Option<&CalendarEvent> {
        let slot = *self.index.get(uid)?;
        self.entries[slot].as_ref().map(|(_, event)| event)
    }

    pub fn get_mut(&mut self, uid: &str) -> Option<&mut CalendarEvent> {
        let slot = *self.index.get(uid)?;
        self.entries[slot].as_mut().map(|(_, event)| event)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn count(&self) -> usize {
        self.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains_key(&self, uid: &str) -> bool {
        self.index.contains_key(uid)
    }

    /// Equality scan over all events.
    pub fn contains(&self, event: &CalendarEvent) -> bool {
        self.values().any(|candidate| candidate == event)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.iter().map(|(uid, _)| uid)
    }

    pub fn values(&self) -> impl Iterator<Item = &CalendarEvent> {
        self.iter().map(|(_, event)| event)
    }

    pub fn iter(&self) -> Iter<'_> {
        Iter {
            inner: self.entries.iter(),
        }
    }

    /// Shallow field maps keyed by uid, in collection order.
    pub fn to_array(&self) -> Vec<(String, Value)> {
        self.iter()
            .map(|(uid, event)| (uid.to_string(), Value::Object(event.to_map())))
            .collect()
    }

    fn compact_if_sparse(&mut self) {
        if self.entries.len() < 16 || self.index.len() * 2 > self.entries.len() {
            return;
        }
        self.entries.retain(Option::is_some);
        for (slot, entry) in self.entries.iter().enumerate() {
            if let Some((uid, _)) = entry {
                self.index.insert(uid.clone(), slot);
            }
        }
    }
}

pub struct Iter<'a> {
    inner: std::slice::Iter<'a, Option<(String, CalendarEvent)>>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a str, &'a CalendarEvent);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .by_ref()
            .flatten()
            .next()
            .map(|(uid, event)| (uid.as_str(), event))
    }
}

impl<'a> IntoIterator for &'a EventCollection {
    type Item = (&'a str, &'a CalendarEvent);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl FromIterator<CalendarEvent> for EventCollection {
    fn from_iter<I: IntoIterator<Item = CalendarEvent>>(iter: I) -> Self {
        let mut collection = EventCollection::new();
        for event in iter {
            collection.add(event);
        }
        collection
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use crate::options::Options;
    use std::sync::Arc;

    fn event(id: i64, title: &str) -> CalendarEvent {
        let mut event = CalendarEvent::new(id, Arc::new(EventKind::default()), Options::new());
        event.set_title(title);
        event
    }

    #[test]
    fn test_add_get_count() {
        let mut collection = EventCollection::new();
        collection.add(event(1, "one")).add(event(2, "two"));

        assert_eq!(collection.count(), 2);
        assert_eq!(collection.get("1").and_then(|e| e.title()), Some("one"));
        assert!(collection.get("3").is_none());
    }

    #[test]
    fn test_readd_replaces_in_place() {
        let mut collection = EventCollection::new();
        collection.add(event(1, "one")).add(event(2, "two"));
        collection.add(event(1, "one again"));

        assert_eq!(collection.count(), 2, "re-adding a uid must not grow the collection");
        let keys: Vec<&str> = collection.keys().collect();
        assert_eq!(keys, vec!["1", "2"], "replacement keeps the original position");
        assert_eq!(collection.get("1").and_then(|e| e.title()), Some("one again"));
    }

    #[test]
    fn test_remove_by_key_and_event() {
        let mut collection = EventCollection::new();
        let second = event(2, "two");
        collection.add(event(1, "one")).add(second.clone());

        assert!(collection.remove("1").is_some());
        assert!(collection.remove("1").is_none(), "removing an absent key is a no-op");
        assert!(collection.remove(&second).is_some());
        assert!(collection.is_empty());
    }

    #[test]
    fn test_remove_element_and_contains() {
        let mut collection = EventCollection::new();
        let one = event(1, "one");
        collection.add(one.clone());

        let mut other = one.clone();
        other.set_description("different");
        assert!(collection.contains(&one));
        assert!(!collection.contains(&other));

        assert!(!collection.remove_element(&other));
        assert!(collection.remove_element(&one));
        assert!(!collection.contains(&one));
    }

    #[test]
    fn test_iteration_reflects_current_state() {
        let mut collection: EventCollection = (1..=20).map(|i| event(i, "x")).collect();
        for i in 1..=15 {
            collection.remove(i.to_string().as_str());
        }
        collection.add(event(21, "y"));

        let keys: Vec<&str> = collection.keys().collect();
        assert_eq!(keys, vec!["16", "17", "18", "19", "20", "21"]);
        assert_eq!(collection.iter().count(), 6, "iteration is restartable");
        assert_eq!(collection.get("18").map(|e| e.uid()), Some("18"));
    }

    #[test]
    fn test_add_events_overwrites_by_uid() {
        let mut a = EventCollection::new();
        a.add(event(1, "a1")).add(event(2, "a2"));
        let mut b = EventCollection::new();
        b.add(event(2, "b2")).add(event(3, "b3"));

        a.add_events(&b);
        let titles: Vec<&str> = a.values().filter_map(|e| e.title()).collect();
        assert_eq!(titles, vec!["a1", "b2", "b3"]);
    }

    #[test]
    fn test_to_array_and_clear() {
        let mut collection = EventCollection::new();
        collection.add(event(7, "seven"));

        let array = collection.to_array();
        assert_eq!(array.len(), 1);
        assert_eq!(array[0].0, "7");
        assert_eq!(array[0].1["title"], "seven");

        collection.clear();
        assert_eq!(collection.len(), 0);
    }
}
