#![no_main]

//! Fuzz target for the status workflow.
//!
//! Applies an arbitrary sequence of status changes to one ticket and checks
//! that the completion time only moves on an edge into DONE, never goes
//! backwards and never disappears once set.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tempfile::tempdir;

use ouvidoria::db::Database;
use ouvidoria::models::{Status, ALL_STATUSES};

#[derive(Arbitrary, Debug)]
struct StatusInput {
    steps: Vec<u8>,
}

fuzz_target!(|input: StatusInput| {
    let dir = match tempdir() {
        Ok(d) => d,
        Err(_) => return,
    };
    let db = match Database::open(&dir.path().join("tickets.db")) {
        Ok(d) => d,
        Err(_) => return,
    };
    let category = match db.create_category("Fuzz") {
        Ok(id) => id,
        Err(_) => return,
    };
    let id = match db.create_ticket("fuzz", None, category) {
        Ok(id) => id,
        Err(_) => return,
    };

    let mut previous = Status::Waiting;
    let mut stamped = None;
    for step in input.steps.iter().take(50) {
        let status = ALL_STATUSES[*step as usize % ALL_STATUSES.len()];
        let change = db.update_status(&id, status).unwrap().unwrap();
        assert_eq!(change.status, status);

        let entered_done = status == Status::Done && previous != Status::Done;
        match (stamped, change.finished_at) {
            (None, Some(t)) => {
                assert!(entered_done);
                stamped = Some(t);
            }
            (None, None) => assert_ne!(status, Status::Done),
            (Some(before), Some(t)) if entered_done => {
                assert!(t >= before);
                stamped = Some(t);
            }
            (Some(before), Some(t)) => assert_eq!(before, t),
            (Some(_), None) => panic!("completion time cleared"),
        }
        previous = status;
    }
});
