//! End-to-end tests of the watch bus through the store surface: topic
//! filtering, buffering, the drop policy for slow subscribers, and close
//! semantics.

use std::time::Duration;

use berth::{
    create_container, match_container_id, new_store_with_config, update_container, Container,
    EventContainerCreate, EventContainerUpdate, StoreConfig, WatchConfig,
};

fn tight_config() -> StoreConfig {
    StoreConfig {
        watch: WatchConfig {
            buffer: 1,
            send_timeout: Duration::from_millis(5),
        },
    }
}

#[test]
fn test_slow_subscriber_only_loses_its_own_events() {
    let store = new_store_with_config(tight_config());

    let slow = store.subscribe_events(Vec::new());
    let fast = store.subscribe_events_with_buffer(16, Vec::new());

    for i in 0..4 {
        store
            .update(|tx| create_container(tx, &Container::new(&format!("c{i}"), &format!("n{i}"))))
            .unwrap();
    }

    // Each commit published a create and a commit marker; the roomy
    // subscriber holds all eight.
    let mut fast_events = 0;
    while fast.recv_timeout(Duration::from_millis(50)).is_some() {
        fast_events += 1;
    }
    assert_eq!(fast_events, 8);

    // The slow subscriber kept only what fit its one-slot buffer.
    let mut slow_events = 0;
    while slow.recv_timeout(Duration::from_millis(50)).is_some() {
        slow_events += 1;
    }
    assert_eq!(slow_events, 1);
}

#[test]
fn test_topics_see_only_their_container() {
    let store = new_store_with_config(StoreConfig::default());
    let watched = Container::new("c1", "one");
    let sub = store.subscribe_events(vec![Box::new(EventContainerUpdate {
        container: watched.clone(),
        checks: vec![match_container_id],
    })]);

    store.update(|tx| create_container(tx, &watched)).unwrap();
    store
        .update(|tx| create_container(tx, &Container::new("c2", "two")))
        .unwrap();
    store
        .update(|tx| {
            let mut other = berth::get_container(tx, "c2").unwrap();
            update_container(tx, &mut other)
        })
        .unwrap();
    store
        .update(|tx| {
            let mut target = berth::get_container(tx, "c1").unwrap();
            update_container(tx, &mut target)
        })
        .unwrap();

    let event = sub
        .recv_timeout(Duration::from_secs(5))
        .expect("expected the watched container's update");
    let update = event
        .as_any()
        .downcast_ref::<EventContainerUpdate>()
        .unwrap();
    assert_eq!(update.container.id, "c1");
    assert!(sub.recv_timeout(Duration::from_millis(50)).is_none());
}

#[test]
fn test_events_arrive_in_commit_order() {
    let store = new_store_with_config(StoreConfig::default());
    let sub = store.subscribe_events(vec![Box::new(EventContainerCreate::default())]);

    for i in 0..10 {
        store
            .update(|tx| create_container(tx, &Container::new(&format!("c{i:02}"), &format!("n{i}"))))
            .unwrap();
    }

    let mut seen = Vec::new();
    for _ in 0..10 {
        let event = sub.recv_timeout(Duration::from_secs(5)).unwrap();
        let created = event
            .as_any()
            .downcast_ref::<EventContainerCreate>()
            .unwrap();
        seen.push(created.container.id.clone());
    }
    let mut sorted = seen.clone();
    sorted.sort();
    assert_eq!(seen, sorted);
}

#[test]
fn test_close_then_subscribe_yields_a_closed_channel() {
    let store = new_store_with_config(StoreConfig::default());
    store.close();

    let sub = store.subscribe_events(Vec::new());
    assert!(sub.recv().is_none());

    // Updates after close still commit, just without notifications.
    store
        .update(|tx| create_container(tx, &Container::new("c1", "one")))
        .unwrap();
    assert!(store.view(|tx| berth::get_container(tx, "c1")).is_some());
}
