//! Concurrent claim races must produce exactly one winner.

use std::sync::{Arc, Barrier};
use std::thread;

use qgate_core::{QualityGateError, QualityGateManager, TestType, Vote};

const RACERS: usize = 8;

fn seed(gm: &QualityGateManager) -> String {
    for i in 0..RACERS {
        gm.register_resident(&format!("qa_{i}"), "QA", ["qa"], None)
            .unwrap();
    }
    let id = gm.submit_change_for_vote("race", "d", "author").unwrap();
    gm.record_change_vote(&id, Vote::Approved).unwrap();
    id
}

fn tally(results: Vec<Result<String, QualityGateError>>) -> String {
    let winners: Vec<&String> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(winners.len(), 1, "expected exactly one winner");
    for r in &results {
        if let Err(e) = r {
            assert!(matches!(e, QualityGateError::AlreadyClaimed { .. }), "{e}");
        }
    }
    winners[0].clone()
}

#[test]
fn shared_manager_has_single_claim_winner() {
    let dir = tempfile::tempdir().unwrap();
    let gm = Arc::new(QualityGateManager::open(dir.path().join("state.json")).unwrap());
    let change_id = seed(&gm);
    let barrier = Arc::new(Barrier::new(RACERS));

    let handles: Vec<_> = (0..RACERS)
        .map(|i| {
            let gm = Arc::clone(&gm);
            let barrier = Arc::clone(&barrier);
            let change_id = change_id.clone();
            thread::spawn(move || {
                let resident = format!("qa_{i}");
                barrier.wait();
                gm.claim_qa(&change_id, &resident).map(|_| resident)
            })
        })
        .collect();
    let results = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let winner = tally(results);
    let change = gm.get_change(&change_id).unwrap();
    assert_eq!(change.qa.assigned_to.as_deref(), Some(winner.as_str()));
}

#[test]
fn separate_stores_on_one_path_have_single_claim_winner() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let change_id = seed(&QualityGateManager::open(&path).unwrap());
    let barrier = Arc::new(Barrier::new(RACERS));

    // One manager per thread stands in for independent worker processes;
    // only the advisory file lock serialises them.
    let handles: Vec<_> = (0..RACERS)
        .map(|i| {
            let path = path.clone();
            let barrier = Arc::clone(&barrier);
            let change_id = change_id.clone();
            thread::spawn(move || {
                let gm = QualityGateManager::open(&path).unwrap();
                let resident = format!("qa_{i}");
                barrier.wait();
                gm.claim_qa(&change_id, &resident).map(|_| resident)
            })
        })
        .collect();
    let results = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let winner = tally(results);
    let gm = QualityGateManager::open(&path).unwrap();
    assert_eq!(
        gm.get_change(&change_id).unwrap().qa.assigned_to,
        Some(winner)
    );
}

#[test]
fn concurrent_batch_creation_assigns_each_change_once() {
    let dir = tempfile::tempdir().unwrap();
    let gm = Arc::new(QualityGateManager::open(dir.path().join("state.json")).unwrap());
    gm.register_resident("qa", "QA", ["qa"], None).unwrap();
    for i in 0..6 {
        let id = gm
            .submit_change_for_vote(&format!("c{i}"), "", "author")
            .unwrap();
        gm.record_change_vote(&id, Vote::Approved).unwrap();
        gm.claim_qa(&id, "qa").unwrap();
        gm.record_test_result(&id, TestType::Unit, true).unwrap();
    }

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let gm = Arc::clone(&gm);
            thread::spawn(move || gm.create_integration_batches(2).unwrap())
        })
        .collect();
    let created: Vec<_> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();

    let mut members: Vec<String> = created.iter().flat_map(|b| b.change_ids.clone()).collect();
    assert_eq!(created.len(), 3);
    members.sort();
    members.dedup();
    assert_eq!(members.len(), 6);
}
