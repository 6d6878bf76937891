// SPDX-License-Identifier: MIT

use super::*;

crate::define_id! {
    /// Test-only ID type.
    pub struct TestId;
}

#[test]
fn display_and_as_str_agree() {
    let id = TestId::new("agent-42");
    assert_eq!(id.as_str(), "agent-42");
    assert_eq!(id.to_string(), "agent-42");
}

#[test]
fn eq_against_str() {
    let id = TestId::from("host-a");
    assert_eq!(id, "host-a");
    assert_eq!(id, *"host-a");
}

#[test]
fn sequential_gen_is_monotonic() {
    let idgen = SequentialIdGen::new("agent");
    assert_eq!(idgen.next(), "agent-1");
    assert_eq!(idgen.next(), "agent-2");

    // Clones share the counter
    let clone = idgen.clone();
    assert_eq!(clone.next(), "agent-3");
}
