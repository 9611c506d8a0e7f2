//! Object and event contracts
//!
//! Every kind stored by the engine implements [`Object`]: a stable id, a
//! deep copy, a monotonically increasing version, and typed change events.
//! The store never hands out references into its own state - it stores a
//! deep copy on write and returns a deep copy on read, so caller mutation
//! cannot leak into committed data.
//!
//! [`Event`] doubles as the subscription topic type: a topic is an event
//! value whose `matches` method gates delivery. Matching is by concrete
//! event kind plus whatever check predicates the topic carries.

use std::any::Any;
use std::fmt::Debug;
use std::sync::Arc;

/// A value stored by the engine.
///
/// Implementations are plain owned structs; `#[derive(Clone)]` on a
/// cycle-free struct is a deep copy, which is what `copy_object` is expected
/// to return. Channels and synchronization primitives must not appear in
/// stored records.
pub trait Object: Debug + Send + Sync + 'static {
    /// Stable, non-empty identifier, unique within the object's table.
    fn id(&self) -> &str;

    /// Return an independently owned deep copy of this object.
    fn copy_object(&self) -> Box<dyn Object>;

    /// Event describing the creation of this object.
    fn event_create(&self) -> Box<dyn Event>;

    /// Event describing an update to this object.
    fn event_update(&self) -> Box<dyn Event>;

    /// Event describing the deletion of this object.
    fn event_delete(&self) -> Box<dyn Event>;

    /// Current version. Incremented by exactly one per successful update.
    fn version(&self) -> u64;

    /// Overwrite the version. Called by the transaction layer when an
    /// update commits, so the caller's object can chain further updates.
    fn set_version(&mut self, version: u64);

    /// Downcast support for typed adapters.
    fn as_any(&self) -> &dyn Any;
}

/// A typed change notification, and at the same time a subscription topic.
///
/// When used as a topic, `matches(observed)` must return true iff `observed`
/// is the same concrete event kind and every check predicate the topic
/// carries accepts the (topic payload, observed payload) pair. Observed
/// events are published with an empty check list.
pub trait Event: Debug + Send + Sync + 'static {
    /// Whether `observed` should be delivered to a subscriber watching
    /// this topic.
    fn matches(&self, observed: &dyn Event) -> bool;

    /// Downcast support for typed subscribers.
    fn as_any(&self) -> &dyn Any;
}

/// Shared handle to a published event.
///
/// One allocation fans out to every subscriber channel.
pub type EventRef = Arc<dyn Event>;

#[cfg(test)]
mod tests {
    use super::*;

    static_assertions::assert_obj_safe!(Object, Event);

    #[derive(Debug, Clone)]
    struct Widget {
        id: String,
        version: u64,
    }

    #[derive(Debug)]
    struct WidgetTouched;

    impl Event for WidgetTouched {
        fn matches(&self, observed: &dyn Event) -> bool {
            observed.as_any().is::<WidgetTouched>()
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    impl Object for Widget {
        fn id(&self) -> &str {
            &self.id
        }
        fn copy_object(&self) -> Box<dyn Object> {
            Box::new(self.clone())
        }
        fn event_create(&self) -> Box<dyn Event> {
            Box::new(WidgetTouched)
        }
        fn event_update(&self) -> Box<dyn Event> {
            Box::new(WidgetTouched)
        }
        fn event_delete(&self) -> Box<dyn Event> {
            Box::new(WidgetTouched)
        }
        fn version(&self) -> u64 {
            self.version
        }
        fn set_version(&mut self, version: u64) {
            self.version = version;
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn test_copy_is_independent() {
        let w = Widget {
            id: "w1".to_string(),
            version: 3,
        };
        let mut copy = w.copy_object();
        copy.set_version(4);
        assert_eq!(w.version(), 3);
        assert_eq!(copy.version(), 4);
        assert_eq!(copy.id(), "w1");
    }

    #[test]
    fn test_event_matches_by_kind() {
        let topic = WidgetTouched;
        assert!(topic.matches(&WidgetTouched));
    }

    #[test]
    fn test_object_downcast() {
        let w = Widget {
            id: "w1".to_string(),
            version: 0,
        };
        let boxed: Box<dyn Object> = Box::new(w);
        assert!(boxed.as_any().downcast_ref::<Widget>().is_some());
    }
}
