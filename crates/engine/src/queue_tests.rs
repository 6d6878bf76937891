// SPDX-License-Identifier: MIT

use super::*;

fn id(n: u64) -> JobId {
    JobId::new(n)
}

#[test]
fn orders_by_priority_then_id() {
    let mut queue = JobQueue::new();
    queue.insert(id(1), 5);
    queue.insert(id(2), 5);
    queue.insert(id(3), 9);
    queue.insert(id(4), 1);

    let order: Vec<JobId> = queue.iter().collect();
    assert_eq!(order, vec![id(3), id(1), id(2), id(4)]);
}

#[test]
fn peek_does_not_remove() {
    let mut queue = JobQueue::new();
    queue.insert(id(1), 0);
    assert_eq!(queue.peek(), Some(id(1)));
    assert_eq!(queue.peek(), Some(id(1)));
    assert_eq!(queue.len(), 1);
}

#[test]
fn advance_removes_the_head() {
    let mut queue = JobQueue::new();
    queue.insert(id(1), 0);
    queue.insert(id(2), 0);
    queue.advance();
    assert_eq!(queue.peek(), Some(id(2)));

    queue.advance();
    assert!(queue.is_empty());
    // Advancing an empty queue is a no-op
    queue.advance();
}

#[test]
fn requeued_job_rejoins_its_priority_class_by_id() {
    let mut queue = JobQueue::new();
    queue.insert(id(5), 3);
    queue.insert(id(8), 3);
    // Job 2 failed its spawn and comes back; it is older than 5 and 8
    queue.insert(id(2), 3);

    let order: Vec<JobId> = queue.iter().collect();
    assert_eq!(order, vec![id(2), id(5), id(8)]);
}

#[test]
fn remove_by_id() {
    let mut queue = JobQueue::new();
    queue.insert(id(1), 0);
    queue.insert(id(2), 0);
    queue.remove(id(1));
    assert!(!queue.contains(id(1)));
    assert_eq!(queue.peek(), Some(id(2)));
}
