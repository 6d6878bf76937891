// SPDX-License-Identifier: MIT

use super::*;

fn snapshot() -> StatusSnapshot {
    StatusSnapshot {
        closing: false,
        startup: false,
        lockout: false,
        queued: 1,
        jobs: vec![
            JobLine {
                id: JobId::new(4),
                agent_type: "scan".to_string(),
                status: JobStatus::Started,
                children: 1,
                remaining_chunks: 2,
                message: None,
            },
            JobLine {
                id: JobId::new(9),
                agent_type: "pack".to_string(),
                status: JobStatus::Failed,
                children: 0,
                remaining_chunks: 0,
                message: Some("agent crashed".to_string()),
            },
        ],
        agents: vec![AgentLine {
            id: "agent-1".to_string(),
            pid: 1212,
            kind: "scan".to_string(),
            host: "localhost".to_string(),
            state: AgentState::Busy,
            items_processed: 14,
        }],
    }
}

#[test]
fn full_dump_lists_everything_and_terminates_with_end() {
    let dump = snapshot().render(None);
    assert!(dump.starts_with("scheduler: queued:1 running:1 closing:false\n"));
    assert!(dump.contains("job:4 type:scan status:started agents:1 remaining:2\n"));
    assert!(dump.contains("job:9 message:agent crashed\n"));
    assert!(dump.contains("agent:agent-1 pid:1212 kind:scan host:localhost state:busy items:14\n"));
    assert!(dump.ends_with("end\n"));
}

#[test]
fn single_job_dump_filters_other_jobs() {
    let dump = snapshot().render(Some(JobId::new(9)));
    assert!(!dump.contains("job:4"));
    assert!(dump.contains("job:9 type:pack status:failed"));
    assert!(dump.ends_with("end\n"));
}
