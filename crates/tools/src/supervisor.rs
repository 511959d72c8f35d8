//! Supervisor (C6): keep a command running, respawning on exit, until a
//! stop signal is fired, then terminate it gracefully.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};

use smartmob_domain::{Error, EventSink, Result, StopSignal};

const KILL_GRACE: Duration = Duration::from_secs(5);
/// Lines kept per stream before the oldest are dropped; bounds memory for
/// a process that runs for days without ever being attached to.
const OUTPUT_RING_CAPACITY: usize = 500;

/// Run `command` under `name`, respawning it every time it exits, until
/// `stop_signal` fires. Returns once the final child has exited.
///
/// A failure to spawn the child at all is fatal: it is surfaced to the
/// caller rather than retried forever.
pub async fn run_and_respawn(
    name: &str,
    command: &str,
    env: &HashMap<String, String>,
    stop_signal: &StopSignal,
    sink: Arc<dyn EventSink>,
) -> Result<()> {
    loop {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command);
        cmd.envs(env);
        cmd.stdout(std::process::Stdio::piped());
        cmd.stderr(std::process::Stdio::piped());

        let mut child = cmd.spawn().map_err(|e| Error::SupervisorSpawnFailed {
            command: command.to_string(),
            message: e.to_string(),
        })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let stdout_task = spawn_output_forwarder(name.to_string(), "stdout", stdout, sink.clone());
        let stderr_task = spawn_output_forwarder(name.to_string(), "stderr", stderr, sink.clone());

        tokio::select! {
            _ = child.wait() => {
                let _ = stdout_task.await;
                let _ = stderr_task.await;
                if stop_signal.is_fired() {
                    return Ok(());
                }
                tracing::info!(process = name, "child exited, respawning");
            }
            _ = stop_signal.wait() => {
                terminate(&mut child).await;
                let _ = stdout_task.await;
                let _ = stderr_task.await;
                return Ok(());
            }
        }
    }
}

fn spawn_output_forwarder(
    name: String,
    stream: &'static str,
    reader: Option<impl tokio::io::AsyncRead + Unpin + Send + 'static>,
    sink: Arc<dyn EventSink>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let Some(reader) = reader else { return };
        let mut lines = BufReader::new(reader).lines();
        let mut ring: std::collections::VecDeque<String> = std::collections::VecDeque::new();
        while let Ok(Some(line)) = lines.next_line().await {
            ring.push_back(line.clone());
            if ring.len() > OUTPUT_RING_CAPACITY {
                ring.pop_front();
            }
            let mut fields = BTreeMap::new();
            fields.insert("process".to_string(), json!(name));
            fields.insert("stream".to_string(), json!(stream));
            fields.insert("line".to_string(), json!(line));
            sink.info("process.output", fields);
        }
    })
}

/// SIGTERM, then SIGKILL after a 5-second grace period.
async fn terminate(child: &mut Child) {
    #[cfg(unix)]
    {
        if let Some(pid) = child.id() {
            let pid = nix::unistd::Pid::from_raw(pid as i32);
            let _ = nix::sys::signal::kill(pid, nix::sys::signal::Signal::SIGTERM);
        }
    }
    #[cfg(not(unix))]
    {
        let _ = child.kill().await;
    }

    let exited = tokio::time::timeout(KILL_GRACE, child.wait()).await;
    if exited.is_err() {
        let _ = child.kill().await;
        let _ = child.wait().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use smartmob_domain::NullSink;

    struct CountingSink {
        events: Mutex<Vec<String>>,
    }

    impl EventSink for CountingSink {
        fn info(&self, event: &str, _fields: BTreeMap<String, serde_json::Value>) {
            self.events.lock().push(event.to_string());
        }
    }

    #[tokio::test]
    async fn stops_respawning_once_signal_fires() {
        let stop = Arc::new(StopSignal::new());
        let sink: Arc<dyn EventSink> = Arc::new(NullSink);

        let stop_task = stop.clone();
        let command = "echo tick; sleep 0.01".to_string();
        let handle = tokio::spawn(async move {
            run_and_respawn("test", &command, &HashMap::new(), &stop_task, sink).await
        });

        // Let a couple of respawn cycles happen before asking it to stop.
        tokio::time::sleep(Duration::from_millis(80)).await;
        stop.fire();
        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("supervisor did not stop within the timeout")
            .expect("supervisor task panicked");
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn child_output_is_forwarded_as_events() {
        let stop = Arc::new(StopSignal::new());
        let sink = Arc::new(CountingSink {
            events: Mutex::new(Vec::new()),
        });
        let sink_dyn: Arc<dyn EventSink> = sink.clone();

        let stop_task = stop.clone();
        let command = "echo hello".to_string();
        let handle = tokio::spawn(async move {
            run_and_respawn("test", &command, &HashMap::new(), &stop_task, sink_dyn).await
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        stop.fire();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("supervisor did not stop within the timeout")
            .expect("supervisor task panicked")
            .unwrap();

        assert!(sink.events.lock().iter().any(|e| e == "process.output"));
    }

    #[tokio::test]
    async fn stop_signal_fired_before_start_skips_respawn() {
        let stop = StopSignal::new();
        stop.fire();
        let sink: Arc<dyn EventSink> = Arc::new(NullSink);
        let command = "sleep 5".to_string();

        let result = tokio::time::timeout(
            Duration::from_secs(2),
            run_and_respawn("test", &command, &HashMap::new(), &stop, sink),
        )
        .await
        .expect("supervisor did not observe a pre-fired stop signal");
        assert!(result.is_ok());
    }
}
