//! Process supervisor - launches hosted applications as subprocesses and
//! keeps the registry and the live-process table in lockstep
//!
//! Features:
//! - Non-blocking start: returns as soon as the process is spawned
//! - stdout/stderr capture into a bounded per-process log
//! - Fire-and-forget stop with SIGTERM -> SIGKILL escalation
//! - One exit notification per process, applied on a serialized event loop
//!
//! Every mutation (start, stop, remove, exit) takes the same lock and
//! persists the registry before releasing it.

use crate::command::LaunchCommand;
use crate::log::{LogEntry, LogStream, OutputLog, SharedOutputLog};
use crate::record::{HostingInfo, HostingRecord, HostingState};
use crate::registry::Registry;
use crate::workspace::WorkspaceStore;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{broadcast, mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use unicloud_foundation::{Error, HostingConfig, Result};
use uuid::Uuid;

/// Broadcast channel capacity for supervisor events
const EVENT_CAPACITY: usize = 256;

/// Target used when forwarding application output to the operational log
const APP_LOG_TARGET: &str = "unicloud::app";

/// Supervisor settings
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Captured lines kept per live process
    pub log_capacity: usize,

    /// Time between SIGTERM and SIGKILL on stop
    pub stop_grace: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            log_capacity: crate::log::DEFAULT_LOG_CAPACITY,
            stop_grace: Duration::from_secs(10),
        }
    }
}

impl From<&HostingConfig> for SupervisorConfig {
    fn from(config: &HostingConfig) -> Self {
        Self {
            log_capacity: config.log_capacity,
            stop_grace: Duration::from_secs(config.stop_grace_secs),
        }
    }
}

/// Lifecycle notifications published by the supervisor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorEvent {
    /// A process was spawned and its record persisted as running
    Started { identity: String, pid: Option<u32> },

    /// `stop` was requested; the process may still be shutting down
    Stopped { identity: String },

    /// A process terminated and the registry reflects it
    Exited {
        identity: String,
        exit_code: Option<i32>,
    },
}

impl SupervisorEvent {
    pub fn identity(&self) -> &str {
        match self {
            SupervisorEvent::Started { identity, .. }
            | SupervisorEvent::Stopped { identity }
            | SupervisorEvent::Exited { identity, .. } => identity,
        }
    }
}

/// Exit notification posted by a monitor task
#[derive(Debug)]
struct ExitNotice {
    identity: String,
    run_id: Uuid,
    exit_code: Option<i32>,
}

/// In-memory state of one supervised process
struct LiveProcess {
    /// Distinguishes successive runs of the same identity
    run_id: Uuid,

    pid: Option<u32>,

    workspace_path: PathBuf,

    command: LaunchCommand,

    output: SharedOutputLog,

    started_at: DateTime<Utc>,

    /// Fires the termination sequence in the monitor task
    kill_tx: Option<oneshot::Sender<()>>,

    monitor: JoinHandle<()>,
}

#[derive(Default)]
struct State {
    live: HashMap<String, LiveProcess>,

    /// Runs terminated by `shutdown`; their exits leave the record running
    drained: HashSet<Uuid>,
}

struct Inner {
    state: Mutex<State>,
    registry: Registry,
    workspaces: WorkspaceStore,
    config: SupervisorConfig,
    events: broadcast::Sender<SupervisorEvent>,
    exits: mpsc::UnboundedSender<ExitNotice>,
}

/// Process supervisor. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Supervisor {
    inner: Arc<Inner>,
}

impl Supervisor {
    /// Create a supervisor. Must be called inside a Tokio runtime: the exit
    /// event loop is spawned here.
    pub fn new(registry: Registry, workspaces: WorkspaceStore, config: SupervisorConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (exits, exit_rx) = mpsc::unbounded_channel();

        let inner = Arc::new(Inner {
            state: Mutex::new(State::default()),
            registry,
            workspaces,
            config,
            events,
            exits,
        });

        tokio::spawn(run_exit_loop(Arc::downgrade(&inner), exit_rx));

        Self { inner }
    }

    /// Build registry, workspace store and settings from a data directory
    pub fn from_config(data_dir: &Path, config: &HostingConfig) -> Self {
        Self::new(
            Registry::new(data_dir, config.registry_file.clone()),
            WorkspaceStore::new(config.workspace_root(data_dir)),
            SupervisorConfig::from(config),
        )
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    pub fn workspaces(&self) -> &WorkspaceStore {
        &self.inner.workspaces
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.inner.config
    }

    /// Subscribe to lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<SupervisorEvent> {
        self.inner.events.subscribe()
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Launch `command` in `workspace_path` for `identity` and persist the
    /// record as running. Returns once the process is spawned.
    ///
    /// An identity that already has a record only starts when the record
    /// names the same workspace and command (a relaunch); anything else is
    /// `AlreadyHosting` and leaves the record untouched.
    pub async fn start(
        &self,
        identity: &str,
        workspace_path: &Path,
        command: &LaunchCommand,
    ) -> Result<()> {
        let mut state = self.inner.state.lock().await;

        if let Some(record) = self.inner.registry.get(identity)? {
            let same_workspace = record.workspace_name == workspace_name_of(workspace_path);
            let same_command = LaunchCommand::parse(&record.launch_command)
                .map(|stored| stored == *command)
                .unwrap_or(false);
            if !(same_workspace && same_command) {
                return Err(Error::AlreadyHosting(identity.to_string()));
            }
        }

        self.start_locked(&mut state, identity, workspace_path, command)
    }

    /// Onboard a new application: unpack `archive` into a fresh workspace
    /// and start it. Fails with `AlreadyHosting` when the identity already
    /// has a record. The workspace is removed again if the start fails.
    pub async fn onboard(
        &self,
        identity: &str,
        base_name: &str,
        archive: Vec<u8>,
        command: &LaunchCommand,
    ) -> Result<HostingRecord> {
        let mut state = self.inner.state.lock().await;

        if state.live.contains_key(identity) || self.inner.registry.get(identity)?.is_some() {
            return Err(Error::AlreadyHosting(identity.to_string()));
        }

        let workspaces = self.inner.workspaces.clone();
        let base = base_name.to_string();
        let workspace = tokio::task::spawn_blocking(move || workspaces.materialize(&base, &archive))
            .await
            .map_err(|e| Error::Internal(format!("workspace task failed: {}", e)))??;

        if let Err(e) = self.start_locked(&mut state, identity, &workspace.path, command) {
            if let Err(cleanup) = self.inner.workspaces.remove(&workspace.path) {
                warn!(identity, error = %cleanup, "Failed to clean up workspace after failed start");
            }
            return Err(e);
        }

        info!(identity, workspace = %workspace.name, "Application onboarded");
        Ok(HostingRecord::running(workspace.name, command.to_string()))
    }

    /// Start a stopped application again from its registry record
    pub async fn resume(&self, identity: &str) -> Result<()> {
        let mut state = self.inner.state.lock().await;

        let record = self
            .inner
            .registry
            .get(identity)?
            .ok_or_else(|| Error::NotHosted(identity.to_string()))?;
        let command = LaunchCommand::parse(&record.launch_command)?;
        let path = self.inner.workspaces.path_for(&record.workspace_name);

        self.start_locked(&mut state, identity, &path, &command)
    }

    /// Send the termination signal and forget the process. The record is
    /// marked stopped right away; the exit handler repeats that when the
    /// process actually goes away.
    pub async fn stop(&self, identity: &str) -> Result<()> {
        let mut state = self.inner.state.lock().await;

        let mut process = state
            .live
            .remove(identity)
            .ok_or_else(|| Error::NotRunning(identity.to_string()))?;

        if let Some(kill_tx) = process.kill_tx.take() {
            // the monitor may already be reporting an exit
            let _ = kill_tx.send(());
        }

        if !self
            .inner
            .registry
            .set_status(identity, HostingState::Stopped)?
        {
            warn!(identity, "Stopped a process with no registry record");
        }

        info!(identity, pid = ?process.pid, "Application stop requested");
        self.publish(SupervisorEvent::Stopped {
            identity: identity.to_string(),
        });
        Ok(())
    }

    /// Delete a stopped application's workspace and record
    pub async fn remove(&self, identity: &str) -> Result<()> {
        let state = self.inner.state.lock().await;

        let mut records = self.inner.registry.load()?;
        let record = records
            .get(identity)
            .ok_or_else(|| Error::NotHosted(identity.to_string()))?;
        if record.is_running() || state.live.contains_key(identity) {
            return Err(Error::StillRunning(identity.to_string()));
        }

        let path = self.inner.workspaces.path_for(&record.workspace_name);
        self.inner.workspaces.remove(&path)?;
        records.remove(identity);
        self.inner.registry.save(&records)?;

        info!(identity, workspace = %path.display(), "Hosting removed");
        Ok(())
    }

    /// Terminate every live process without touching the registry, so the
    /// next boot relaunches them. Waits up to the stop grace period (plus a
    /// second) for each monitor to finish.
    pub async fn shutdown(&self) {
        let processes: Vec<(String, LiveProcess)> = {
            let mut state = self.inner.state.lock().await;
            let processes: Vec<(String, LiveProcess)> = state.live.drain().collect();
            let run_ids: Vec<Uuid> = processes.iter().map(|(_, p)| p.run_id).collect();
            state.drained.extend(run_ids);
            processes
        };

        let mut monitors = Vec::with_capacity(processes.len());
        for (identity, mut process) in processes {
            debug!(identity = %identity, pid = ?process.pid, "Terminating for shutdown");
            if let Some(kill_tx) = process.kill_tx.take() {
                let _ = kill_tx.send(());
            }
            monitors.push((identity, process.monitor));
        }

        let wait = self.inner.config.stop_grace + Duration::from_secs(1);
        for (identity, monitor) in monitors {
            if tokio::time::timeout(wait, monitor).await.is_err() {
                warn!(identity = %identity, "Process did not exit during shutdown");
            }
        }
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    /// Most recent `count` captured lines, oldest first
    pub async fn tail(&self, identity: &str, count: usize) -> Result<Vec<LogEntry>> {
        let output = {
            let state = self.inner.state.lock().await;
            let process = state
                .live
                .get(identity)
                .ok_or_else(|| Error::NotRunning(identity.to_string()))?;
            Arc::clone(&process.output)
        };
        let entries = output.lock().tail(count);
        Ok(entries)
    }

    pub async fn is_running(&self, identity: &str) -> bool {
        self.inner.state.lock().await.live.contains_key(identity)
    }

    /// Identities with a live process, sorted
    pub async fn live_identities(&self) -> Vec<String> {
        let state = self.inner.state.lock().await;
        let mut identities: Vec<String> = state.live.keys().cloned().collect();
        identities.sort();
        identities
    }

    pub async fn live_count(&self) -> usize {
        self.inner.state.lock().await.live.len()
    }

    /// Record plus live state for one identity
    pub async fn status(&self, identity: &str) -> Result<HostingInfo> {
        let state = self.inner.state.lock().await;
        let record = self
            .inner
            .registry
            .get(identity)?
            .ok_or_else(|| Error::NotHosted(identity.to_string()))?;
        Ok(hosting_info(&state, identity.to_string(), record))
    }

    /// Every registry record with its live state, ordered by identity
    pub async fn list(&self) -> Result<Vec<HostingInfo>> {
        let state = self.inner.state.lock().await;
        let records = self.inner.registry.load()?;
        Ok(records
            .into_iter()
            .map(|(identity, record)| hosting_info(&state, identity, record))
            .collect())
    }

    /// Where and how a live process was started, with its start time
    pub async fn describe(&self, identity: &str) -> Result<(PathBuf, LaunchCommand, DateTime<Utc>)> {
        let state = self.inner.state.lock().await;
        let process = state
            .live
            .get(identity)
            .ok_or_else(|| Error::NotRunning(identity.to_string()))?;
        Ok((
            process.workspace_path.clone(),
            process.command.clone(),
            process.started_at,
        ))
    }

    /// Flip a record to stopped without touching live state
    pub(crate) async fn mark_stopped(&self, identity: &str) -> Result<bool> {
        let _state = self.inner.state.lock().await;
        self.inner
            .registry
            .set_status(identity, HostingState::Stopped)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn start_locked(
        &self,
        state: &mut State,
        identity: &str,
        workspace_path: &Path,
        command: &LaunchCommand,
    ) -> Result<()> {
        if state.live.contains_key(identity) {
            return Err(Error::AlreadyHosting(identity.to_string()));
        }
        if !self.inner.workspaces.contains(workspace_path) {
            return Err(Error::ForeignWorkspace(workspace_path.to_path_buf()));
        }
        if !workspace_path.is_dir() {
            return Err(Error::WorkspaceMissing(workspace_path.to_path_buf()));
        }

        let mut child = Command::new(command.program())
            .args(command.args())
            .current_dir(workspace_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::spawn(command.program(), e.to_string()))?;
        let pid = child.id();

        let workspace_name = workspace_name_of(workspace_path);
        let persisted = self.inner.registry.update(|records| {
            records.insert(
                identity.to_string(),
                HostingRecord::running(workspace_name.clone(), command.to_string()),
            );
        });
        if let Err(e) = persisted {
            error!(identity, error = %e, "Failed to persist record; killing fresh process");
            let _ = child.start_kill();
            return Err(e);
        }

        let output = OutputLog::shared(self.inner.config.log_capacity);
        if let Some(stdout) = child.stdout.take() {
            spawn_reader(identity.to_string(), LogStream::Stdout, stdout, Arc::clone(&output));
        }
        if let Some(stderr) = child.stderr.take() {
            spawn_reader(identity.to_string(), LogStream::Stderr, stderr, Arc::clone(&output));
        }

        let run_id = Uuid::new_v4();
        let (kill_tx, kill_rx) = oneshot::channel();
        let monitor = tokio::spawn(monitor_process(
            identity.to_string(),
            run_id,
            child,
            kill_rx,
            self.inner.config.stop_grace,
            self.inner.exits.clone(),
        ));

        state.live.insert(
            identity.to_string(),
            LiveProcess {
                run_id,
                pid,
                workspace_path: workspace_path.to_path_buf(),
                command: command.clone(),
                output,
                started_at: Utc::now(),
                kill_tx: Some(kill_tx),
                monitor,
            },
        );

        info!(
            identity,
            pid = ?pid,
            workspace = %workspace_name,
            command = %command,
            "Application started"
        );
        self.publish(SupervisorEvent::Started {
            identity: identity.to_string(),
            pid,
        });
        Ok(())
    }

    fn publish(&self, event: SupervisorEvent) {
        self.inner.publish(event);
    }
}

impl Inner {
    fn publish(&self, event: SupervisorEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }

    /// Terminal bookkeeping for one process run
    async fn handle_exit(&self, notice: ExitNotice) {
        let ExitNotice {
            identity,
            run_id,
            exit_code,
        } = notice;

        let mut state = self.state.lock().await;

        let superseded = match state.live.get(&identity) {
            Some(process) if process.run_id == run_id => {
                state.live.remove(&identity);
                false
            }
            // a newer run owns the identity now
            Some(_) => true,
            // already removed by stop
            None => false,
        };

        info!(identity = %identity, exit_code = ?exit_code, "Application exited");

        let drained = state.drained.remove(&run_id);

        if !superseded && !drained {
            match self.registry.set_status(&identity, HostingState::Stopped) {
                Ok(true) => {}
                Ok(false) => debug!(identity = %identity, "No record to update on exit"),
                Err(e) => error!(identity = %identity, error = %e, "Failed to persist exit"),
            }
        }
        drop(state);

        self.publish(SupervisorEvent::Exited {
            identity,
            exit_code,
        });
    }
}

/// Applies exit notices one at a time
async fn run_exit_loop(inner: Weak<Inner>, mut exits: mpsc::UnboundedReceiver<ExitNotice>) {
    while let Some(notice) = exits.recv().await {
        match inner.upgrade() {
            Some(inner) => inner.handle_exit(notice).await,
            None => debug!(identity = %notice.identity, "Supervisor gone; dropping exit notice"),
        }
    }
}

/// Wait for the process to end, by itself or on request, and report it
async fn monitor_process(
    identity: String,
    run_id: Uuid,
    mut child: Child,
    mut kill_rx: oneshot::Receiver<()>,
    grace: Duration,
    exits: mpsc::UnboundedSender<ExitNotice>,
) {
    let status = tokio::select! {
        status = child.wait() => status,
        Ok(()) = &mut kill_rx => terminate(&identity, &mut child, grace).await,
    };

    let exit_code = match status {
        Ok(status) => exit_code_of(&status),
        Err(e) => {
            error!(identity = %identity, error = %e, "Failed to wait for process");
            None
        }
    };

    let _ = exits.send(ExitNotice {
        identity,
        run_id,
        exit_code,
    });
}

/// SIGTERM, then SIGKILL once `grace` runs out
async fn terminate(identity: &str, child: &mut Child, grace: Duration) -> std::io::Result<ExitStatus> {
    if let Err(e) = send_sigterm(child) {
        warn!(identity, error = %e, "Failed to send termination signal");
    }

    match tokio::time::timeout(grace, child.wait()).await {
        Ok(status) => status,
        Err(_) => {
            warn!(identity, grace_secs = grace.as_secs_f64(), "Grace period expired - killing process");
            child.start_kill()?;
            child.wait().await
        }
    }
}

#[cfg(unix)]
fn send_sigterm(child: &mut Child) -> std::io::Result<()> {
    let Some(pid) = child.id() else {
        // already reaped
        return Ok(());
    };
    // SAFETY: kill(2) has no memory-safety preconditions; the pid belongs to
    // a child we have not reaped yet, so it cannot have been recycled.
    let rc = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
    if rc == -1 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(not(unix))]
fn send_sigterm(child: &mut Child) -> std::io::Result<()> {
    child.start_kill()
}

/// Exit code, or `128 + signal` for signal deaths on Unix
fn exit_code_of(status: &ExitStatus) -> Option<i32> {
    if let Some(code) = status.code() {
        return Some(code);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return Some(128 + signal);
        }
    }
    None
}

/// Forward every line of `reader` to the output log and the operational log
fn spawn_reader<R>(identity: String, stream: LogStream, reader: R, output: SharedOutputLog)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let text = String::from_utf8_lossy(&buf);
                    let line = text.trim_end_matches(['\n', '\r']);
                    match stream {
                        LogStream::Stdout => info!(target: APP_LOG_TARGET, identity = %identity, "{}", line),
                        LogStream::Stderr => warn!(target: APP_LOG_TARGET, identity = %identity, "{}", line),
                    }
                    output.lock().push(stream, line);
                }
                Err(e) => {
                    debug!(identity = %identity, stream = stream.as_str(), error = %e, "Output stream closed");
                    break;
                }
            }
        }
    });
}

fn workspace_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn hosting_info(state: &State, identity: String, record: HostingRecord) -> HostingInfo {
    let process = state.live.get(&identity);
    HostingInfo {
        live: process.is_some(),
        pid: process.and_then(|p| p.pid),
        identity,
        record,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Records;
    use tempfile::TempDir;

    fn supervisor(temp: &TempDir) -> Supervisor {
        Supervisor::new(
            Registry::new(temp.path(), "usersdata.json"),
            WorkspaceStore::new(temp.path().join("hospedagem")),
            SupervisorConfig::default(),
        )
    }

    #[test]
    fn test_workspace_name_of() {
        assert_eq!(workspace_name_of(Path::new("/ws/u1")), "u1");
        assert_eq!(workspace_name_of(Path::new("/ws/alice_42k/")), "alice_42k");
    }

    #[test]
    fn test_config_from_hosting_config() {
        let hosting = HostingConfig {
            log_capacity: 25,
            stop_grace_secs: 3,
            ..Default::default()
        };
        let config = SupervisorConfig::from(&hosting);
        assert_eq!(config.log_capacity, 25);
        assert_eq!(config.stop_grace, Duration::from_secs(3));
    }

    #[test]
    fn test_event_identity() {
        let event = SupervisorEvent::Exited {
            identity: "U1".into(),
            exit_code: Some(0),
        };
        assert_eq!(event.identity(), "U1");
    }

    #[tokio::test]
    async fn test_missing_workspace_is_not_started() {
        let temp = TempDir::new().unwrap();
        let supervisor = supervisor(&temp);
        let command = LaunchCommand::parse("node app.js").unwrap();

        let path = supervisor.workspaces().path_for("nope");
        let result = supervisor.start("U1", &path, &command).await;
        assert!(matches!(result, Err(Error::WorkspaceMissing(_))));
        assert_eq!(supervisor.live_count().await, 0);
        assert!(supervisor.registry().load().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_spawn_error_leaves_no_state() {
        let temp = TempDir::new().unwrap();
        let supervisor = supervisor(&temp);
        let command = LaunchCommand::parse("definitely-not-a-real-program-4821").unwrap();

        let path = supervisor.workspaces().path_for("u1");
        std::fs::create_dir_all(&path).unwrap();

        let result = supervisor.start("U1", &path, &command).await;
        assert!(matches!(result, Err(Error::Spawn { .. })));
        assert!(!supervisor.is_running("U1").await);
        assert!(supervisor.registry().load().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_operations_on_unknown_identity() {
        let temp = TempDir::new().unwrap();
        let supervisor = supervisor(&temp);

        assert!(matches!(supervisor.stop("U1").await, Err(Error::NotRunning(_))));
        assert!(matches!(supervisor.tail("U1", 5).await, Err(Error::NotRunning(_))));
        assert!(matches!(supervisor.remove("U1").await, Err(Error::NotHosted(_))));
        assert!(matches!(supervisor.resume("U1").await, Err(Error::NotHosted(_))));
        assert!(matches!(supervisor.status("U1").await, Err(Error::NotHosted(_))));
        assert!(supervisor.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_workspace_outside_root_rejected() {
        let temp = TempDir::new().unwrap();
        let supervisor = supervisor(&temp);
        let outside = temp.path().join("ws").join("u1");
        std::fs::create_dir_all(&outside).unwrap();

        let result = supervisor
            .start("U1", &outside, &LaunchCommand::parse("sleep 30").unwrap())
            .await;
        assert!(matches!(result, Err(Error::ForeignWorkspace(_))));
        assert!(supervisor.registry().load().unwrap().is_empty());
        assert!(!supervisor.is_running("U1").await);
    }

    fn seed_running(supervisor: &Supervisor) {
        let mut records = Records::new();
        records.insert("U1".into(), HostingRecord::running("u1", "sleep 30"));
        supervisor.registry().save(&records).unwrap();
    }

    fn status_of(supervisor: &Supervisor) -> HostingState {
        supervisor.registry().get("U1").unwrap().unwrap().status
    }

    #[tokio::test]
    async fn test_natural_exit_during_shutdown_marks_stopped() {
        let temp = TempDir::new().unwrap();
        let supervisor = supervisor(&temp);
        seed_running(&supervisor);

        supervisor.shutdown().await;
        supervisor
            .inner
            .handle_exit(ExitNotice {
                identity: "U1".into(),
                run_id: Uuid::new_v4(),
                exit_code: Some(0),
            })
            .await;

        assert_eq!(status_of(&supervisor), HostingState::Stopped);
    }

    #[tokio::test]
    async fn test_drained_exit_keeps_running() {
        let temp = TempDir::new().unwrap();
        let supervisor = supervisor(&temp);
        seed_running(&supervisor);

        let run_id = Uuid::new_v4();
        supervisor.inner.state.lock().await.drained.insert(run_id);
        supervisor
            .inner
            .handle_exit(ExitNotice {
                identity: "U1".into(),
                run_id,
                exit_code: Some(143),
            })
            .await;

        assert_eq!(status_of(&supervisor), HostingState::Running);
        assert!(supervisor.inner.state.lock().await.drained.is_empty());
    }
}
