mod common;

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use common::{builder, handle, names, FakeDriver, OnConnect};
use driverscope::engine::same_driver;
use driverscope::{CatalogDiscovery, ConnectionProperties, DriverHandle, EngineError, Scope};

fn all_distinct(drivers: &[DriverHandle]) -> bool {
    drivers.iter().enumerate().all(|(i, a)| {
        drivers[i + 1..].iter().all(|b| !same_driver(a, b))
    })
}

#[test]
fn registering_twice_keeps_one_entry() {
    let manager = builder(Scope::root("system")).build();
    let driver = Arc::new(FakeDriver::new("a", Some("a:"), OnConnect::Open));

    manager.register_driver(Some(handle(&driver))).expect("first");
    manager.register_driver(Some(handle(&driver))).expect("second");

    assert_eq!(manager.get_drivers(None).len(), 1);
}

#[test]
fn child_scope_lists_own_drivers_before_inherited_ones() {
    let parent = Scope::root("parent");
    let child = parent.child("child");
    let catalog = Arc::new(CatalogDiscovery::new());
    catalog.provide_instance(
        &child,
        handle(&Arc::new(FakeDriver::new("X", Some("x:"), OnConnect::Open))),
    );
    let manager = builder(parent.clone()).discovery(catalog).build();

    for name in ["A", "B"] {
        let driver = Arc::new(FakeDriver::new(name, Some("p:"), OnConnect::Open));
        manager.register_driver(Some(handle(&driver))).expect("register");
    }

    assert_eq!(names(&manager.get_drivers(Some(&child))), vec!["X", "A", "B"]);
    assert_eq!(names(&manager.get_drivers(Some(&parent))), vec!["A", "B"]);
}

#[test]
fn get_driver_returns_first_match() {
    let manager = builder(Scope::root("system")).build();
    let a = Arc::new(FakeDriver::new("A", None, OnConnect::Open));
    let b = Arc::new(FakeDriver::new("B", Some("jdbc:test:"), OnConnect::Open));
    let c = Arc::new(FakeDriver::new("C", Some("jdbc:test:"), OnConnect::Open));
    for driver in [&a, &b, &c] {
        manager.register_driver(Some(handle(driver))).expect("register");
    }

    let found = manager
        .get_driver("jdbc:test:db", None)
        .ok()
        .expect("B accepts");

    assert!(same_driver(&found, &handle(&b)));
    assert_eq!(c.accept_calls(), 0);
}

#[test]
fn get_driver_without_match_fails() {
    let manager = builder(Scope::root("system")).build();
    let a = Arc::new(FakeDriver::new("A", Some("pg:"), OnConnect::Open));
    manager.register_driver(Some(handle(&a))).expect("register");

    let err = manager
        .get_driver("mysql://db", None)
        .err()
        .expect("no match");
    assert!(matches!(err, EngineError::NoSuitableDriver { .. }));
    assert_eq!(err.sql_state(), Some("08001"));
}

#[tokio::test]
async fn connection_falls_back_and_aggregates_errors() {
    let manager = builder(Scope::root("system")).build();
    let a = Arc::new(FakeDriver::new("A", Some("db:"), OnConnect::Fail("E1")));
    let b = Arc::new(FakeDriver::new("B", Some("db:"), OnConnect::Decline));
    let c = Arc::new(FakeDriver::new("C", Some("db:"), OnConnect::Open));
    for driver in [&a, &b, &c] {
        manager.register_driver(Some(handle(driver))).expect("register");
    }
    let props = ConnectionProperties::new();

    let conn = manager
        .get_connection(Some("db:main"), &props, None)
        .await
        .ok()
        .expect("C connects");
    assert_eq!(conn.driver_name(), "C");

    manager
        .deregister_driver(Some(&handle(&c)), None)
        .expect("deregister C");

    let err = manager
        .get_connection(Some("db:main"), &props, None)
        .await
        .err()
        .expect("nobody connects");
    match err {
        EngineError::ConnectionFailed { ref primary, .. } => {
            assert_eq!(primary.message, "E1");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn null_url_consults_no_driver() {
    let manager = builder(Scope::root("system")).build();
    let a = Arc::new(FakeDriver::new("A", Some("db:"), OnConnect::Open));
    manager.register_driver(Some(handle(&a))).expect("register");

    let err = manager
        .get_connection(None, &ConnectionProperties::new(), None)
        .await
        .err()
        .expect("null url");

    assert!(matches!(err, EngineError::InvalidUrl));
    assert_eq!(a.accept_calls(), 0);
    assert_eq!(a.connect_calls(), 0);
}

#[test]
fn deregistration_runs_callback_once() {
    let manager = builder(Scope::root("system")).build();
    let driver = handle(&Arc::new(FakeDriver::new("D", Some("d:"), OnConnect::Open)));
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    manager
        .register_driver_with_action(
            Some(Arc::clone(&driver)),
            Some(Arc::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })),
        )
        .expect("register");

    manager.deregister_driver(Some(&driver), None).expect("first");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(manager.get_drivers(None).is_empty());

    manager.deregister_driver(Some(&driver), None).expect("second");
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let unknown = handle(&Arc::new(FakeDriver::new("U", None, OnConnect::Open)));
    manager.deregister_driver(Some(&unknown), None).expect("unknown");
    manager.deregister_driver(None, None).expect("none");
}

#[test]
fn concurrent_registrations_are_all_kept() {
    const N: usize = 32;
    let system = Scope::root("system");
    let catalog = Arc::new(CatalogDiscovery::new());
    catalog.provide_instance(
        &system,
        handle(&Arc::new(FakeDriver::new("discovered", None, OnConnect::Open))),
    );
    let manager = builder(system).discovery(catalog).build();
    let discovered = manager.get_drivers(None).len();

    let drivers: Vec<DriverHandle> = (0..N)
        .map(|i| handle(&Arc::new(FakeDriver::new(&format!("d{i}"), None, OnConnect::Open))))
        .collect();

    thread::scope(|s| {
        for driver in &drivers {
            let manager = &manager;
            s.spawn(move || {
                manager
                    .register_driver(Some(Arc::clone(driver)))
                    .expect("register");
            });
        }
    });

    let listed = manager.get_drivers(None);
    assert_eq!(listed.len(), N + discovered);
    assert!(all_distinct(&listed));
    let unique: HashSet<_> = names(&listed).into_iter().collect();
    assert_eq!(unique.len(), listed.len());
}

#[test]
fn concurrent_deregistrations_run_the_callback_once() {
    const THREADS: usize = 8;
    let manager = builder(Scope::root("system")).build();

    for round in 0..50 {
        let driver = handle(&Arc::new(FakeDriver::new(
            &format!("d{round}"),
            None,
            OnConnect::Open,
        )));
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        manager
            .register_driver_with_action(
                Some(Arc::clone(&driver)),
                Some(Arc::new(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                })),
            )
            .expect("register");

        let start = Barrier::new(THREADS);
        thread::scope(|s| {
            for _ in 0..THREADS {
                let (manager, driver, start) = (&manager, &driver, &start);
                s.spawn(move || {
                    start.wait();
                    manager
                        .deregister_driver(Some(driver), None)
                        .expect("deregister");
                });
            }
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1, "round {round}");
        assert!(manager.get_drivers(None).is_empty());
    }
}

#[test]
fn blocked_deregistration_callback_does_not_block_readers_or_registration() {
    let manager = builder(Scope::root("system")).build();
    let slow = handle(&Arc::new(FakeDriver::new("slow", None, OnConnect::Open)));
    let entered = Arc::new(Barrier::new(2));
    let release = Arc::new(Barrier::new(2));
    let (in_callback, resume) = (Arc::clone(&entered), Arc::clone(&release));
    manager
        .register_driver_with_action(
            Some(Arc::clone(&slow)),
            Some(Arc::new(move || {
                in_callback.wait();
                resume.wait();
            })),
        )
        .expect("register");
    // Initialize the scope up front; only the callback may hold its lock.
    assert_eq!(names(&manager.get_drivers(None)), vec!["slow"]);

    thread::scope(|s| {
        let (manager, slow) = (&manager, &slow);
        let deregistration = s.spawn(move || manager.deregister_driver(Some(slow), None));

        entered.wait();
        let other = handle(&Arc::new(FakeDriver::new("other", None, OnConnect::Open)));
        manager.register_driver(Some(other)).expect("register while blocked");
        assert_eq!(names(&manager.get_drivers(None)), vec!["slow", "other"]);
        release.wait();

        deregistration
            .join()
            .expect("deregistration thread")
            .expect("deregister");
    });

    assert_eq!(names(&manager.get_drivers(None)), vec!["other"]);
}

#[test]
fn child_discovered_driver_is_deregistered_from_its_scope() {
    let system = Scope::root("system");
    let child = system.child("plugin");
    let catalog = Arc::new(CatalogDiscovery::new());
    let x = handle(&Arc::new(FakeDriver::new("X", Some("x:"), OnConnect::Open)));
    catalog.provide_instance(&child, Arc::clone(&x));
    let manager = builder(system).discovery(catalog).build();
    assert_eq!(names(&manager.get_drivers(Some(&child))), vec!["X"]);

    manager
        .deregister_driver(Some(&x), Some(&child))
        .expect("deregister");

    assert!(manager.get_drivers(Some(&child)).is_empty());
}
