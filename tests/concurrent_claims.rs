use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::thread;

use lotkeeper::construct::{Facility, PersistenceMode, SpotType};
use lotkeeper::error::LotError;
use lotkeeper::fare::FareSchedule;
use lotkeeper::session::Session;

#[test]
fn concurrent_claims_yield_distinct_spots() {
    let capacity = 8;
    let facility =
        Arc::new(Facility::new(PersistenceMode::InMemory, capacity, 0).expect("facility"));
    let barrier = Arc::new(Barrier::new(capacity as usize));

    let handles: Vec<_> = (0..capacity)
        .map(|_| {
            let facility = Arc::clone(&facility);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                facility.claim_spot(SpotType::Car).expect("claim")
            })
        })
        .collect();

    let mut claimed = HashSet::new();
    for handle in handles {
        let spot = handle.join().expect("thread");
        assert!(claimed.insert(spot), "spot {spot} was handed out twice");
    }
    assert_eq!(claimed.len(), capacity as usize);
    assert_eq!(facility.free_by_type(SpotType::Car).expect("free"), 0);
}

#[test]
fn an_exhausted_pool_never_returns_a_stale_id() {
    let capacity = 4;
    let callers = 10;
    let facility =
        Arc::new(Facility::new(PersistenceMode::InMemory, capacity, 0).expect("facility"));
    let barrier = Arc::new(Barrier::new(callers));

    let handles: Vec<_> = (0..callers)
        .map(|_| {
            let facility = Arc::clone(&facility);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                facility.claim_spot(SpotType::Car)
            })
        })
        .collect();

    let mut won = 0;
    let mut lost = 0;
    for handle in handles {
        match handle.join().expect("thread") {
            Ok(_) => won += 1,
            Err(LotError::NotAvailable {
                spot_type: SpotType::Car,
            }) => lost += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(won, capacity as usize);
    assert_eq!(lost, callers - capacity as usize);
}

#[test]
fn only_one_of_two_concurrent_entries_wins() {
    let facility = Arc::new(Facility::new(PersistenceMode::InMemory, 4, 0).expect("facility"));
    let session = Arc::new(Session::new(Arc::clone(&facility), FareSchedule::default()));
    let barrier = Arc::new(Barrier::new(2));

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let session = Arc::clone(&session);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                session.process_entry("AB-123-CD", SpotType::Car)
            })
        })
        .collect();

    let results: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().expect("thread"))
        .collect();

    let winners = results.iter().filter(|r| r.is_ok()).count();
    let duplicates = results
        .iter()
        .filter(|r| matches!(r, Err(LotError::DuplicateOpenTicket { .. })))
        .count();
    assert_eq!(winners, 1);
    assert_eq!(duplicates, 1);
    // the loser's compensating release leaves exactly one spot taken
    assert_eq!(facility.free_by_type(SpotType::Car).expect("free"), 3);
}

#[test]
fn unrelated_vehicles_park_concurrently_without_interference() {
    let facility = Arc::new(Facility::new(PersistenceMode::InMemory, 5, 5).expect("facility"));
    let session = Arc::new(Session::new(Arc::clone(&facility), FareSchedule::default()));
    let barrier = Arc::new(Barrier::new(10));

    let handles: Vec<_> = (0..10)
        .map(|i| {
            let session = Arc::clone(&session);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let spot_type = if i % 2 == 0 {
                    SpotType::Car
                } else {
                    SpotType::Bike
                };
                barrier.wait();
                session.process_entry(&format!("REG-{i}"), spot_type)
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("thread").expect("entry");
    }
    assert_eq!(facility.free_by_type(SpotType::Car).expect("free"), 0);
    assert_eq!(facility.free_by_type(SpotType::Bike).expect("free"), 0);
}
