// SPDX-License-Identifier: MIT

//! The scheduler: registries, event handlers, and the placement tick.
//!
//! One value owns everything. Handlers run to completion on the loop
//! thread and never unwind it — errors are logged by the loop after the
//! affected entity has been moved to a terminal state.

use crate::agent::Agent;
use crate::agent_io;
use crate::error::EngineError;
use crate::event_loop::{EventLoop, EventQueue};
use crate::hosts::HostRegistry;
use crate::metas::MetaRegistry;
use crate::queue::JobQueue;
use crate::signals::{ReapTable, SignalBridge};
use crate::status::{AgentLine, JobLine, StatusShare, StatusSnapshot};
use crate::store_bridge::StoreHandle;
use dispatch_adapters::{ConfigLoader, JobUpdate, Notifier, SpawnTransport};
use dispatch_core::config::{ConfigSnapshot, SchedulerKnobs};
use dispatch_core::{
    AgentId, AgentMessage, AgentState, Clock, Event, ExitStatus, IdGen, Job, JobId, JobRecord,
    JobStatus, MetaAgent, SequentialIdGen, WorkOrder, LOCAL_HOST,
};
use nix::sys::signal::Signal;
use std::collections::HashMap;
use std::sync::Arc;

/// Failure message for a job pinned to a host the registry does not know.
pub const HOST_NOT_IN_LIST: &str = "ERROR: jq_host not in the agent list!";

/// An exclusive job waiting for the system to drain before it may run.
#[derive(Debug, Clone)]
struct HeldJob {
    job: JobId,
    host: String,
}

/// External dependencies handed to the scheduler at construction.
pub struct SchedulerDeps<T, N, C> {
    pub transport: Arc<T>,
    pub notifier: N,
    pub clock: C,
    pub store: StoreHandle,
    pub loader: Box<dyn ConfigLoader>,
    pub events: EventQueue,
    pub reaps: ReapTable,
    pub status: StatusShare,
}

/// The supervision engine. Owned by exactly one loop thread.
pub struct Scheduler<T, N, C: Clock> {
    knobs: SchedulerKnobs,
    hosts: HostRegistry,
    metas: MetaRegistry,
    jobs: HashMap<JobId, Job>,
    queue: JobQueue,
    agents: HashMap<AgentId, Agent>,
    pids: HashMap<i32, AgentId>,
    held: Option<HeldJob>,
    lockout: bool,
    closing: bool,
    startup: bool,
    pause: bool,
    terminated: bool,
    idgen: SequentialIdGen,
    transport: Arc<T>,
    notifier: N,
    clock: C,
    store: StoreHandle,
    loader: Box<dyn ConfigLoader>,
    events: EventQueue,
    reaps: ReapTable,
    status: StatusShare,
}

impl<T, N, C> Scheduler<T, N, C>
where
    T: SpawnTransport,
    N: Notifier,
    C: Clock,
{
    pub fn new(deps: SchedulerDeps<T, N, C>) -> Self {
        Self {
            knobs: SchedulerKnobs::default(),
            hosts: HostRegistry::new(),
            metas: MetaRegistry::new(),
            jobs: HashMap::new(),
            queue: JobQueue::new(),
            agents: HashMap::new(),
            pids: HashMap::new(),
            held: None,
            lockout: false,
            closing: false,
            startup: false,
            // Matches the boot sequence: the first tick converts the pause
            // into the startup drain, so the first store poll waits for the
            // config-time test spawns to finish.
            pause: true,
            terminated: false,
            idgen: SequentialIdGen::new("agent"),
            transport: deps.transport,
            notifier: deps.notifier,
            clock: deps.clock,
            store: deps.store,
            loader: deps.loader,
            events: deps.events,
            reaps: deps.reaps,
            status: deps.status,
        }
    }

    pub fn knobs(&self) -> &SchedulerKnobs {
        &self.knobs
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Swap in a validated config snapshot.
    ///
    /// With `validate` set, every agent kind gets one ownerless test spawn;
    /// the startup flag stays up until that round drains, which is what
    /// delays the first store poll.
    pub fn apply_config(&mut self, snapshot: ConfigSnapshot, validate: bool) {
        self.knobs = snapshot.knobs;
        self.hosts.replace_all(snapshot.hosts);
        self.metas.replace_all(snapshot.agents);
        tracing::info!(
            hosts = self.hosts.len(),
            "configuration applied"
        );
        if validate {
            self.test_agents();
        }
    }

    /// Spawn one ownerless agent per kind to prove the command works.
    fn test_agents(&mut self) {
        if self.hosts.get(LOCAL_HOST).is_none() {
            tracing::warn!("no localhost entry, skipping agent validation");
            self.startup = true;
            return;
        }
        let metas: Vec<Arc<MetaAgent>> = self
            .metas
            .iter()
            .map(|entry| Arc::clone(&entry.meta))
            .collect();
        for meta in metas {
            if meta.max_run == 0 {
                tracing::debug!(meta = %meta.name, "max_run is 0, skipping test spawn");
                continue;
            }
            if let Err(e) = self.spawn_agent(&meta, LOCAL_HOST, None) {
                tracing::warn!(meta = %meta.name, error = %e, "test spawn failed");
                self.metas.set_valid(&meta.name, false);
            }
        }
        self.startup = true;
    }

    // ── event dispatch ──────────────────────────────────────────────────

    pub fn handle_event(&mut self, event: Event) -> Result<(), EngineError> {
        match event {
            Event::AgentMessage { agent, message } => self.on_agent_message(agent, message),
            Event::AgentStderr { agent, line } => {
                self.on_agent_stderr(agent, line);
                Ok(())
            }
            Event::AgentDeath { agent, pid, status } => self.on_agent_death(agent, pid, status),
            Event::AgentUpdate => {
                self.on_agent_update();
                Ok(())
            }
            Event::JobPause { id } => self.on_job_pause(id),
            Event::JobRestart { id } => self.on_job_restart(id),
            Event::JobKill { id, message } => self.on_job_kill(id, message),
            Event::StorePoll => {
                self.store.poll();
                Ok(())
            }
            Event::JobsPolled { records } => {
                self.on_jobs_polled(records);
                Ok(())
            }
            Event::Close { force } => {
                self.on_close(force);
                Ok(())
            }
            Event::ConfigReload => self.on_config_reload(),
        }
    }

    // ── agent handlers ──────────────────────────────────────────────────

    fn on_agent_message(&mut self, id: AgentId, message: AgentMessage) -> Result<(), EngineError> {
        let now = self.clock.now();
        match message {
            AgentMessage::Ok => self.on_agent_ok(id),
            AgentMessage::Bye { code } => {
                let agent = self.require_agent(&id)?;
                tracing::debug!(agent = %id, code, "agent said BYE");
                agent.set_state(AgentState::Finished);
                Ok(())
            }
            AgentMessage::Item { count } => {
                let agent = self.require_agent(&id)?;
                agent.items_processed += count;
                agent.touch_heartbeat(now);
                Ok(())
            }
            AgentMessage::Heartbeat { done, total } => {
                let agent = self.require_agent(&id)?;
                agent.items_processed = done;
                if let Some(total) = total {
                    agent.total_items = total;
                }
                agent.touch_heartbeat(now);
                Ok(())
            }
            AgentMessage::Email { text } => {
                let subject = {
                    let agent = self.require_agent(&id)?;
                    format!("message from {} agent", agent.meta.name)
                };
                if let Err(e) = self.notifier.notify(&subject, &text) {
                    tracing::warn!(agent = %id, error = %e, "notification failed");
                }
                Ok(())
            }
            AgentMessage::Log { text } => {
                tracing::info!(target: "dispatch::agent", agent = %id, "{}", text);
                Ok(())
            }
            AgentMessage::Verbose { text } => {
                tracing::debug!(target: "dispatch::agent", agent = %id, "{}", text);
                Ok(())
            }
            AgentMessage::Counter { key, value, extra } => {
                tracing::debug!(agent = %id, key, value, ?extra, "agent counter");
                Ok(())
            }
        }
    }

    /// `OK`: handshake from a fresh agent, or "ready for more" after work.
    fn on_agent_ok(&mut self, id: AgentId) -> Result<(), EngineError> {
        let now = self.clock.now();
        let (state, owner) = {
            let agent = self.require_agent(&id)?;
            agent.touch_heartbeat(now);
            (agent.state, agent.owner)
        };

        match state {
            AgentState::Spawned => {
                // Handshake: hand over the job's data blob first, then work.
                let data = owner
                    .and_then(|job| self.jobs.get(&job))
                    .map(|job| job.data.clone())
                    .unwrap_or_default();
                let agent = self.require_agent(&id)?;
                agent.set_state(AgentState::Ready);
                if owner.is_some() && !data.is_empty() {
                    agent.send_line(&data)?;
                    agent.set_state(AgentState::Busy);
                    return Ok(());
                }
                self.assign_work(&id)
            }
            AgentState::Busy => {
                let agent = self.require_agent(&id)?;
                agent.set_state(AgentState::Ready);
                self.assign_work(&id)
            }
            AgentState::Ready => self.assign_work(&id),
            // A draining, paused, or dead agent gets no more work
            _ => Ok(()),
        }
    }

    /// Hand the next chunk to a READY agent, or ask it to drain.
    fn assign_work(&mut self, id: &AgentId) -> Result<(), EngineError> {
        let owner = self.require_agent(id)?.owner;
        let Some(job_id) = owner else {
            // Config-time test spawn: the handshake is all it had to prove.
            let agent = self.require_agent(id)?;
            agent.send(&WorkOrder::Close)?;
            agent.set_state(AgentState::Closing);
            return Ok(());
        };

        let chunk = self.jobs.get_mut(&job_id).and_then(Job::next_chunk);
        let agent = self.require_agent(id)?;
        match chunk {
            Some(chunk) => {
                agent.send(&WorkOrder::Chunk { id: chunk })?;
                agent.set_state(AgentState::Busy);
            }
            None => {
                agent.send(&WorkOrder::Close)?;
                agent.set_state(AgentState::Closing);
            }
        }
        Ok(())
    }

    fn on_agent_stderr(&mut self, id: AgentId, line: String) {
        tracing::info!(target: "dispatch::agent", agent = %id, "stderr: {}", line);
        if let Some(agent) = self.agents.get_mut(&id) {
            agent.push_stderr(line);
        }
    }

    fn on_agent_death(
        &mut self,
        id: AgentId,
        pid: i32,
        status: ExitStatus,
    ) -> Result<(), EngineError> {
        let Some(mut agent) = self.agents.remove(&id) else {
            // Repeated deaths for one pid are no-ops after the first.
            tracing::debug!(agent = %id, pid, "death for an agent already reaped");
            return Ok(());
        };
        self.pids.remove(&pid);
        agent.alive = false;
        agent.close_stdin();
        self.hosts.decrement(&agent.host);
        if agent.owner.is_some() {
            self.metas.decrement(&agent.meta.name);
        }

        let success = agent.state == AgentState::Finished && status.success();
        if !success {
            agent.set_state(AgentState::Failed);
        }
        tracing::info!(agent = %id, pid, success, ?status, "agent reaped");

        match agent.owner {
            None => {
                self.metas.set_valid(&agent.meta.name, success);
                if !success {
                    tracing::warn!(meta = %agent.meta.name, "agent failed validation");
                }
            }
            Some(job_id) => {
                if success {
                    self.on_job_progress(job_id, &agent.id);
                } else {
                    self.on_agent_crash(job_id, &agent, status);
                }
            }
        }
        Ok(())
    }

    /// A child finished cleanly; advance or complete its job.
    fn on_job_progress(&mut self, job_id: JobId, agent_id: &AgentId) {
        let Some(job) = self.jobs.get_mut(&job_id) else {
            return;
        };
        job.children.remove(agent_id);
        if job.is_active() {
            return;
        }
        if job.status.is_terminal() {
            self.cleanup_job(job_id);
            return;
        }
        if job.id_list.is_empty() {
            job.status = JobStatus::Complete;
            let agent_type = job.agent_type.clone();
            self.store
                .update(JobUpdate::status(job_id, JobStatus::Complete));
            tracing::info!(job = %job_id, "job complete");
            self.notify_job(&agent_type, &format!("job {} complete", job_id), "");
            self.jobs.remove(&job_id);
            self.store.release(job_id);
        } else {
            // Chunks remain; the job goes back for a fresh agent.
            job.status = JobStatus::Queued;
            let priority = job.priority;
            self.queue.insert(job_id, priority);
        }
    }

    /// A child crashed, was killed, or died without a clean BYE.
    fn on_agent_crash(&mut self, job_id: JobId, agent: &Agent, status: ExitStatus) {
        let reason = match (status.code, status.signal) {
            (Some(code), _) => format!("agent exited with code {}", code),
            (None, Some(signal)) => format!("agent killed by signal {}", signal),
            (None, None) => "agent died".to_string(),
        };
        tracing::warn!(job = %job_id, agent = %agent.id, reason, "agent crash");
        if let Some(job) = self.jobs.get_mut(&job_id) {
            job.children.remove(&agent.id);
        }
        self.fail_job(job_id, agent.stderr_message());
    }

    /// Watchdog pass plus periodic persistence of job progress.
    fn on_agent_update(&mut self) {
        let now = self.clock.now();
        let mut unresponsive = Vec::new();
        for agent in self.agents.values() {
            if agent.state == AgentState::Paused || agent.state.is_terminal() {
                continue;
            }
            if now.duration_since(agent.last_heartbeat) >= agent.meta.heartbeat_timeout {
                if agent.meta.flags.nokill {
                    tracing::warn!(agent = %agent.id, "agent unresponsive but flagged NOKILL");
                } else {
                    unresponsive.push(agent.id.clone());
                }
            }
        }
        for id in unresponsive {
            tracing::warn!(agent = %id, "agent unresponsive, terminating");
            self.signal_agent(&id, Signal::SIGTERM);
            if let Some(agent) = self.agents.get_mut(&id) {
                agent.set_state(AgentState::Closing);
            }
        }

        // Persist progress for every active job.
        let mut progress = Vec::new();
        for job in self.jobs.values() {
            if !job.is_active() {
                continue;
            }
            let items: u64 = job
                .children
                .iter()
                .filter_map(|id| self.agents.get(id))
                .map(|a| a.items_processed)
                .sum();
            progress.push(JobUpdate {
                id: job.id,
                status: job.status,
                message: None,
                items_processed: Some(items),
            });
        }
        for update in progress {
            self.store.update(update);
        }
    }

    // ── job handlers ────────────────────────────────────────────────────

    fn on_jobs_polled(&mut self, records: Vec<JobRecord>) {
        for record in records {
            if self.jobs.contains_key(&record.id) {
                tracing::debug!(job = %record.id, "poll returned a job already known");
                continue;
            }
            tracing::info!(job = %record.id, agent_type = %record.agent_type, "job enqueued");
            let job = Job::from_record(record);
            self.queue.insert(job.id, job.priority);
            self.jobs.insert(job.id, job);
        }
    }

    fn on_job_pause(&mut self, id: JobId) -> Result<(), EngineError> {
        let job = self.jobs.get_mut(&id).ok_or(EngineError::JobNotFound(id))?;
        if job.status.is_terminal() {
            return Ok(());
        }
        job.status = JobStatus::Paused;
        let children: Vec<AgentId> = job.children.iter().cloned().collect();
        self.queue.remove(id);
        self.store.update(JobUpdate::status(id, JobStatus::Paused));
        for child in children {
            self.signal_agent(&child, Signal::SIGSTOP);
            if let Some(agent) = self.agents.get_mut(&child) {
                agent.resume_state = Some(agent.state);
                agent.set_state(AgentState::Paused);
            }
        }
        tracing::info!(job = %id, "job paused");
        Ok(())
    }

    fn on_job_restart(&mut self, id: JobId) -> Result<(), EngineError> {
        let job = self.jobs.get_mut(&id).ok_or(EngineError::JobNotFound(id))?;
        if job.status != JobStatus::Paused && job.status != JobStatus::Restart {
            return Ok(());
        }
        let children: Vec<AgentId> = job.children.iter().cloned().collect();
        if children.is_empty() {
            job.status = JobStatus::Queued;
            let priority = job.priority;
            self.queue.insert(id, priority);
            self.store.update(JobUpdate::status(id, JobStatus::Queued));
        } else {
            job.status = JobStatus::Started;
            self.store.update(JobUpdate::status(id, JobStatus::Started));
            let now = self.clock.now();
            let mut to_assign = Vec::new();
            for child in children {
                self.signal_agent(&child, Signal::SIGCONT);
                if let Some(agent) = self.agents.get_mut(&child) {
                    let restored = agent.resume_state.take().unwrap_or(AgentState::Ready);
                    agent.set_state(restored);
                    agent.touch_heartbeat(now);
                    if restored == AgentState::Ready {
                        to_assign.push(child);
                    }
                }
            }
            for child in to_assign {
                self.assign_work(&child)?;
            }
        }
        tracing::info!(job = %id, "job restarted");
        Ok(())
    }

    fn on_job_kill(&mut self, id: JobId, message: String) -> Result<(), EngineError> {
        if !self.jobs.contains_key(&id) {
            return Err(EngineError::JobNotFound(id));
        }
        tracing::info!(job = %id, message, "job killed by operator");
        self.fail_job(id, message);
        Ok(())
    }

    /// Move a job to FAILED, signal its children, and clean up when the
    /// last child is gone.
    fn fail_job(&mut self, job_id: JobId, message: impl Into<String>) {
        let message = message.into();
        let Some(job) = self.jobs.get_mut(&job_id) else {
            return;
        };
        let children: Vec<AgentId> = job.children.iter().cloned().collect();
        if job.status != JobStatus::Failed {
            job.fail(message.clone());
            let agent_type = job.agent_type.clone();
            self.queue.remove(job_id);
            self.store
                .update(JobUpdate::status(job_id, JobStatus::Failed).with_message(message.clone()));
            self.notify_job(
                &agent_type,
                &format!("job {} failed", job_id),
                &message,
            );
        }
        for child in children {
            let nokill = self
                .agents
                .get(&child)
                .map(|a| a.meta.flags.nokill)
                .unwrap_or(true);
            if nokill {
                continue;
            }
            let _ = self
                .agents
                .get_mut(&child)
                .map(|a| a.send(&WorkOrder::End));
            self.signal_agent(&child, Signal::SIGTERM);
            if let Some(agent) = self.agents.get_mut(&child) {
                agent.set_state(AgentState::Closing);
            }
        }
        self.cleanup_job(job_id);
    }

    fn cleanup_job(&mut self, job_id: JobId) {
        let done = self
            .jobs
            .get(&job_id)
            .is_some_and(|job| job.status.is_terminal() && job.children.is_empty());
        if done {
            self.jobs.remove(&job_id);
            self.store.release(job_id);
        }
    }

    // ── scheduler control ───────────────────────────────────────────────

    fn on_close(&mut self, force: bool) {
        tracing::info!(force, "closing");
        self.closing = true;
        if force {
            let victims: Vec<AgentId> = self
                .agents
                .values()
                .filter(|a| !a.meta.flags.nokill && !a.state.is_terminal())
                .map(|a| a.id.clone())
                .collect();
            for id in victims {
                self.signal_agent(&id, Signal::SIGTERM);
                if let Some(agent) = self.agents.get_mut(&id) {
                    agent.set_state(AgentState::Closing);
                }
            }
        }
    }

    fn on_config_reload(&mut self) -> Result<(), EngineError> {
        let raw = self
            .loader
            .load()
            .map_err(|e| EngineError::Reload(e.to_string()))?;
        let snapshot = ConfigSnapshot::from_maps(&raw.platform, &raw.agents)
            .map_err(|e| EngineError::Reload(e.to_string()))?;
        self.apply_config(snapshot, true);
        tracing::info!("configuration reloaded");
        Ok(())
    }

    // ── the tick ────────────────────────────────────────────────────────

    /// The placement pass, run after every event.
    pub fn tick(&mut self) {
        let n_agents = self.agents.len();
        let n_jobs = self.active_jobs();

        // Leave the startup state once the validation round drains.
        if self.startup && n_agents == 0 {
            self.events.send(Event::StorePoll);
            self.startup = false;
        }

        if self.closing && n_agents == 0 && n_jobs == 0 {
            self.terminated = true;
            return;
        }

        if self.lockout && n_agents == 0 && n_jobs == 0 {
            self.lockout = false;
        }

        if self.held.is_none() && !self.lockout && !self.closing && !self.startup {
            self.place_jobs();
        }

        // Exclusive dispatch once the system is fully drained.
        if let Some(held) = self.held.clone() {
            if !self.closing && self.agents.is_empty() && self.active_jobs() == 0 {
                tracing::info!(job = %held.job, "dispatching exclusive job");
                self.agent_init(&held.host, held.job);
                self.lockout = true;
                self.held = None;
            }
        }

        if self.pause {
            self.startup = true;
            self.pause = false;
        }
    }

    /// The placement loop. A full meta or host breaks rather than skips,
    /// which preserves priority-FIFO and prevents starvation of the head
    /// by later, smaller jobs.
    fn place_jobs(&mut self) {
        loop {
            let Some(job_id) = self.queue.peek() else {
                break;
            };
            let Some(job) = self.jobs.get(&job_id) else {
                // Stale queue entry for a job that no longer exists
                self.queue.advance();
                continue;
            };
            let agent_type = job.agent_type.clone();
            let required_host = job.required_host.clone();

            let Some(entry) = self.metas.lookup(&agent_type) else {
                self.queue.advance();
                self.fail_job(job_id, format!("no agent of type {}", agent_type));
                continue;
            };
            if !entry.meta.valid {
                self.queue.advance();
                self.fail_job(job_id, format!("agent {} failed validation", agent_type));
                continue;
            }
            if entry.is_max_reached() {
                tracing::debug!(job = %job_id, meta = %agent_type, "max_run reached, holding the queue");
                break;
            }
            let exclusive = entry.meta.flags.exclusive;
            let local = entry.meta.flags.local;

            let host = if local {
                match self.hosts.get(LOCAL_HOST) {
                    Some(host) if host.has_capacity() => LOCAL_HOST.to_string(),
                    Some(_) => break,
                    None => {
                        self.queue.advance();
                        self.fail_job(job_id, HOST_NOT_IN_LIST);
                        continue;
                    }
                }
            } else if let Some(required) = required_host {
                match self.hosts.get(&required) {
                    Some(host) if host.has_capacity() => required,
                    Some(_) => break,
                    None => {
                        self.queue.advance();
                        self.fail_job(job_id, HOST_NOT_IN_LIST);
                        continue;
                    }
                }
            } else {
                match self.hosts.next_free() {
                    Some(host) => host,
                    None => break,
                }
            };

            self.queue.advance();
            if exclusive {
                tracing::info!(job = %job_id, "exclusive job held until the system drains");
                self.held = Some(HeldJob { job: job_id, host });
                self.lockout = true;
                break;
            }
            self.agent_init(&host, job_id);
        }
    }

    /// Instantiate an agent for a job on a chosen host.
    fn agent_init(&mut self, host: &str, job_id: JobId) {
        let Some(job) = self.jobs.get(&job_id) else {
            return;
        };
        let Some(meta) = self.metas.arc(&job.agent_type) else {
            self.fail_job(job_id, format!("no agent of type {}", job.agent_type));
            return;
        };

        match self.spawn_agent(&meta, host, Some(job_id)) {
            Ok(agent_id) => {
                tracing::info!(job = %job_id, agent = %agent_id, host, "starting job");
                if let Some(job) = self.jobs.get_mut(&job_id) {
                    job.children.insert(agent_id);
                    job.status = JobStatus::Started;
                }
                self.store
                    .update(JobUpdate::status(job_id, JobStatus::Started));
            }
            Err(e) => {
                let attempts = {
                    let Some(job) = self.jobs.get_mut(&job_id) else {
                        return;
                    };
                    job.spawn_attempts += 1;
                    job.spawn_attempts
                };
                tracing::warn!(job = %job_id, attempts, error = %e, "spawn failed");
                if attempts < self.knobs.spawn_retries {
                    if let Some(job) = self.jobs.get_mut(&job_id) {
                        job.status = JobStatus::Queued;
                        let priority = job.priority;
                        self.queue.insert(job_id, priority);
                    }
                } else {
                    self.fail_job(job_id, format!("spawn failed: {}", e));
                }
            }
        }
    }

    /// Create the child, wire its I/O, and register the bookkeeping.
    fn spawn_agent(
        &mut self,
        meta: &Arc<MetaAgent>,
        host_name: &str,
        owner: Option<JobId>,
    ) -> Result<AgentId, EngineError> {
        let host = self
            .hosts
            .get(host_name)
            .ok_or_else(|| EngineError::HostNotFound(host_name.to_string()))?
            .clone();
        let child = self.transport.spawn(&host, &meta.command)?;
        let pid = child.pid;
        let agent_id = AgentId::new(self.idgen.next());
        let stdin = agent_io::attach(agent_id.clone(), child, &self.events, &self.reaps);

        self.pids.insert(pid, agent_id.clone());
        self.hosts.increment(host_name);
        if owner.is_some() {
            self.metas.increment(&meta.name);
        }
        let agent = Agent::new(
            agent_id.clone(),
            Arc::clone(meta),
            host_name,
            owner,
            pid,
            stdin,
            self.clock.now(),
        );
        self.agents.insert(agent_id.clone(), agent);
        Ok(agent_id)
    }

    // ── helpers ─────────────────────────────────────────────────────────

    fn require_agent(&mut self, id: &AgentId) -> Result<&mut Agent, EngineError> {
        self.agents
            .get_mut(id)
            .ok_or_else(|| EngineError::AgentNotFound(id.clone()))
    }

    /// Jobs with at least one live agent.
    fn active_jobs(&self) -> usize {
        self.jobs.values().filter(|job| job.is_active()).count()
    }

    fn signal_agent(&self, id: &AgentId, signal: Signal) {
        let Some(agent) = self.agents.get(id) else {
            return;
        };
        if !agent.alive {
            return;
        }
        if let Err(e) = self.transport.signal(agent.pid, signal as i32) {
            tracing::warn!(agent = %id, pid = agent.pid, %signal, error = %e, "kill failed");
        }
    }

    fn notify_job(&self, agent_type: &str, subject: &str, body: &str) {
        let noemail = self
            .metas
            .arc(agent_type)
            .map(|meta| meta.flags.noemail)
            .unwrap_or(false);
        if noemail {
            return;
        }
        if let Err(e) = self.notifier.notify(subject, body) {
            tracing::warn!(error = %e, "notification failed");
        }
    }

    /// Publish the status snapshot for the control listener.
    pub fn publish_status(&self) {
        let snapshot = self.snapshot();
        *self.status.lock() = snapshot;
    }

    fn snapshot(&self) -> StatusSnapshot {
        let mut jobs: Vec<JobLine> = self
            .jobs
            .values()
            .map(|job| JobLine {
                id: job.id,
                agent_type: job.agent_type.clone(),
                status: job.status,
                children: job.children.len(),
                remaining_chunks: job.id_list.len(),
                message: job.message.clone(),
            })
            .collect();
        jobs.sort_by_key(|line| line.id);
        let mut agents: Vec<AgentLine> = self
            .agents
            .values()
            .map(|agent| AgentLine {
                id: agent.id.to_string(),
                pid: agent.pid,
                kind: agent.meta.name.clone(),
                host: agent.host.clone(),
                state: agent.state,
                items_processed: agent.items_processed,
            })
            .collect();
        agents.sort_by(|a, b| a.id.cmp(&b.id));
        StatusSnapshot {
            closing: self.closing,
            startup: self.startup,
            lockout: self.lockout,
            queued: self.queue.len(),
            jobs,
            agents,
        }
    }

    // ── the loop ────────────────────────────────────────────────────────

    /// Run until shutdown completes. Owns the calling thread.
    pub fn run(&mut self, mut events: EventLoop, mut signals: SignalBridge) {
        tracing::info!("scheduler loop running");
        self.tick();
        self.publish_status();
        while !self.terminated {
            if let Some(event) = events.next_due() {
                tracing::debug!(event = %event.log_summary(), "event");
                if let Err(e) = self.handle_event(event) {
                    tracing::error!(error = %e, "event handler failed");
                }
            }
            for event in signals.drain(self.clock.now()) {
                self.events.send(event);
            }
            self.tick();
            self.publish_status();
        }
        // Jobs that never reached a terminal state go back to the store.
        let leftover: Vec<JobId> = self.jobs.keys().copied().collect();
        for id in leftover {
            self.store.release(id);
        }
        tracing::info!("scheduler loop terminated");
    }
}

#[cfg(test)]
impl<T, N, C> Scheduler<T, N, C>
where
    T: SpawnTransport,
    N: Notifier,
    C: Clock,
{
    pub(crate) fn job_status(&self, id: JobId) -> Option<JobStatus> {
        self.jobs.get(&id).map(|job| job.status)
    }

    pub(crate) fn agent_state(&self, id: &AgentId) -> Option<AgentState> {
        self.agents.get(id).map(|agent| agent.state)
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
