//! Background side of command execution.
//!
//! Each external command gets one task that owns the process: it spawns the
//! child in its own process group, merges stdout and stderr line by line into
//! [`UiEvent::Output`] messages, asks `lsof` for the working directory the
//! process left behind, reaps it and finally posts [`UiEvent::Finished`]. The
//! UI thread never waits on any of this.

use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::events::{Stream, UiEvent};
use crate::jobs::{JobTable, signal_group};
use crate::screens::ScreenId;

/// An external command ready to be started.
#[derive(Clone, Debug)]
pub struct ExecRequest {
    /// Screen whose job slot was reserved and whose console gets the output.
    pub screen: ScreenId,
    /// The submitted line, for logs and error messages.
    pub command: String,
    pub program: String,
    pub args: Vec<String>,
    /// Working directory, read from the session at submit time.
    pub cwd: PathBuf,
}

/// Start `req` in the background. The job slot must already be reserved.
pub fn spawn(
    req: ExecRequest,
    jobs: JobTable,
    cwd: Arc<Mutex<PathBuf>>,
    tx: mpsc::Sender<UiEvent>,
) -> JoinHandle<()> {
    tokio::spawn(run(req, jobs, cwd, tx))
}

/// Own one process from spawn to exit.
pub async fn run(
    req: ExecRequest,
    jobs: JobTable,
    cwd: Arc<Mutex<PathBuf>>,
    tx: mpsc::Sender<UiEvent>,
) {
    let mut command = std::process::Command::new(&req.program);
    command
        .args(&req.args)
        .current_dir(&req.cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        // New group led by the child, so SIGINT also reaches its children.
        .process_group(0);
    let mut command = tokio::process::Command::from(command);

    let started = Instant::now();
    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(e) => {
            tracing::warn!("spawn of {:?} failed: {e}", req.command);
            jobs.release(&req.screen, None);
            let _ = tx
                .send(UiEvent::SpawnFailed {
                    screen: req.screen,
                    command: req.command,
                    error: e.to_string(),
                })
                .await;
            return;
        }
    };
    let pid = child.id().unwrap_or_default();
    tracing::info!("started pid {pid}: {}", req.command);

    if !jobs.attach_pid(&req.screen, pid) {
        // Screen closed while the process was starting.
        tracing::warn!("pid {pid} has no owner any more, interrupting");
        if let Err(e) = signal_group(pid) {
            tracing::warn!("{e}");
        }
    }
    let _ = tx
        .send(UiEvent::Started {
            screen: req.screen.clone(),
            pid,
        })
        .await;

    let (out_lines, err_lines) = pump_streams(
        child.stdout.take(),
        child.stderr.take(),
        &req.screen,
        pid,
        &tx,
    )
    .await;

    let left_in = lookup_cwd(pid).await.filter(|dir| dir.is_dir());
    if let Some(dir) = &left_in
        && follow_cwd(&cwd, &req.cwd, dir)
    {
        let _ = tx
            .send(UiEvent::Status(format!(
                "Working directory is now {}",
                dir.display()
            )))
            .await;
    }

    let exit_code = reap(&mut child, &jobs, &req.screen, pid).await;
    let runtime = started.elapsed();
    tracing::info!(
        "pid {pid} exited with {exit_code} after {:.3}s ({out_lines} stdout, {err_lines} stderr lines)",
        runtime.as_secs_f64()
    );

    let _ = tx
        .send(UiEvent::Finished {
            screen: req.screen,
            pid,
            runtime,
            exit_code,
            cwd: left_in,
        })
        .await;
}

/// Move the session to `dir` unless a `cd` changed it since `submitted_in`.
fn follow_cwd(cwd: &Mutex<PathBuf>, submitted_in: &Path, dir: &Path) -> bool {
    let mut session_cwd = cwd.lock().unwrap_or_else(PoisonError::into_inner);
    if session_cwd.as_path() != submitted_in || dir == submitted_in {
        return false;
    }
    *session_cwd = dir.to_path_buf();
    true
}

/// Wait for `child` to exit and free its job slot in the same step.
async fn reap(
    child: &mut tokio::process::Child,
    jobs: &JobTable,
    screen: &ScreenId,
    pid: u32,
) -> i32 {
    let mut delay = Duration::from_millis(10);
    loop {
        match jobs.reap_with(screen, pid, || child.try_wait().transpose()) {
            Some(Ok(status)) => return status.code().unwrap_or(-1),
            Some(Err(e)) => {
                tracing::warn!("wait for pid {pid} failed: {e}");
                return -1;
            }
            None => {
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(Duration::from_millis(200));
            }
        }
    }
}

/// Message from a stream reader to the merging loop.
#[derive(Debug)]
enum Fan {
    Line(Stream, String),
    Closed(Stream),
}

/// Forward lines of both streams as they arrive.
///
/// Returns only after both streams have reported end of stream, so trailing
/// output of the slower stream is never lost. Returns the line counts
/// `(stdout, stderr)`.
pub async fn pump_streams<O, E>(
    stdout: Option<O>,
    stderr: Option<E>,
    screen: &ScreenId,
    pid: u32,
    tx: &mpsc::Sender<UiEvent>,
) -> (usize, usize)
where
    O: AsyncRead + Unpin + Send + 'static,
    E: AsyncRead + Unpin + Send + 'static,
{
    let (fan_tx, mut fan_rx) = mpsc::channel::<Fan>(256);
    let mut stdout_open = stdout.is_some();
    let mut stderr_open = stderr.is_some();
    if let Some(reader) = stdout {
        tokio::spawn(read_lines(reader, Stream::Stdout, fan_tx.clone()));
    }
    if let Some(reader) = stderr {
        tokio::spawn(read_lines(reader, Stream::Stderr, fan_tx.clone()));
    }
    drop(fan_tx);

    let mut counts = (0, 0);
    while stdout_open || stderr_open {
        let Some(msg) = fan_rx.recv().await else {
            break;
        };
        match msg {
            Fan::Line(stream, line) => {
                match stream {
                    Stream::Stdout => counts.0 += 1,
                    Stream::Stderr => counts.1 += 1,
                }
                // Keep draining even when the UI is gone, or the child blocks
                // on a full pipe.
                let _ = tx
                    .send(UiEvent::Output {
                        screen: screen.clone(),
                        pid,
                        stream,
                        line,
                    })
                    .await;
            }
            Fan::Closed(Stream::Stdout) => stdout_open = false,
            Fan::Closed(Stream::Stderr) => stderr_open = false,
        }
    }
    counts
}

/// Read `reader` line by line; always ends with `Fan::Closed`.
async fn read_lines<R>(reader: R, stream: Stream, tx: mpsc::Sender<Fan>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                while matches!(buf.last(), Some(b'\n' | b'\r')) {
                    buf.pop();
                }
                let line = String::from_utf8_lossy(&buf).into_owned();
                if tx.send(Fan::Line(stream, line)).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::warn!("{stream:?} read failed: {e}");
                break;
            }
        }
    }
    let _ = tx.send(Fan::Closed(stream)).await;
}

/// Ask `lsof` for the working directory of `pid`. Best effort.
async fn lookup_cwd(pid: u32) -> Option<PathBuf> {
    let pid_arg = pid.to_string();
    let output = tokio::process::Command::new("lsof")
        .args(["-a", "-d", "cwd", "-p", &pid_arg, "-Fn"])
        .stdin(Stdio::null())
        .output()
        .await;
    match output {
        Ok(out) if out.status.success() => parse_lsof_cwd(&String::from_utf8_lossy(&out.stdout)),
        Ok(out) => {
            tracing::debug!(
                "lsof found no cwd for pid {pid}: {}",
                String::from_utf8_lossy(&out.stderr).trim()
            );
            None
        }
        Err(e) => {
            tracing::warn!("cwd lookup for pid {pid} failed: {e}");
            None
        }
    }
}

/// First `n` field of `lsof -F` output.
fn parse_lsof_cwd(text: &str) -> Option<PathBuf> {
    text.lines()
        .find_map(|line| line.strip_prefix('n'))
        .filter(|path| !path.is_empty())
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::io::AsyncWriteExt;
    use tokio::time::timeout;

    use crate::screens::ScreenStack;

    fn screen_id() -> ScreenId {
        ScreenStack::new().current_screen_id().clone()
    }

    fn request(screen: &ScreenId, program: &str, args: &[&str]) -> ExecRequest {
        ExecRequest {
            screen: screen.clone(),
            command: std::iter::once(program)
                .chain(args.iter().copied())
                .collect::<Vec<_>>()
                .join(" "),
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            cwd: std::env::temp_dir(),
        }
    }

    async fn collect(mut rx: mpsc::Receiver<UiEvent>) -> Vec<UiEvent> {
        let mut events = Vec::new();
        while let Some(ev) = rx.recv().await {
            events.push(ev);
        }
        events
    }

    #[tokio::test]
    async fn test_pump_waits_for_slow_stream_after_other_closes() {
        let (out_w, out_r) = tokio::io::duplex(64);
        let (mut err_w, err_r) = tokio::io::duplex(64);
        // Empty stdout closes right away.
        drop(out_w);
        tokio::spawn(async move {
            for i in 0..1000 {
                err_w
                    .write_all(format!("err {i}\n").as_bytes())
                    .await
                    .expect("write stderr");
                if i % 100 == 0 {
                    tokio::time::sleep(Duration::from_millis(2)).await;
                }
            }
        });

        let (tx, mut rx) = mpsc::channel(2048);
        let id = screen_id();
        let counts = pump_streams(Some(out_r), Some(err_r), &id, 1, &tx).await;
        assert_eq!(counts, (0, 1000));

        drop(tx);
        let mut expected = 0;
        while let Some(ev) = rx.recv().await {
            let UiEvent::Output { stream, line, .. } = ev else {
                panic!("only output events expected");
            };
            assert_eq!(stream, Stream::Stderr);
            assert_eq!(line, format!("err {expected}"));
            expected += 1;
        }
        assert_eq!(expected, 1000);
    }

    #[tokio::test]
    async fn test_pump_keeps_per_stream_order_and_partial_last_line() {
        let (mut out_w, out_r) = tokio::io::duplex(1024);
        let (mut err_w, err_r) = tokio::io::duplex(1024);
        out_w.write_all(b"a\r\nb\nc").await.expect("write stdout");
        err_w.write_all(b"x\n").await.expect("write stderr");
        drop(out_w);
        drop(err_w);

        let (tx, rx) = mpsc::channel(64);
        let id = screen_id();
        let counts = pump_streams(Some(out_r), Some(err_r), &id, 1, &tx).await;
        assert_eq!(counts, (3, 1));
        drop(tx);

        let stdout: Vec<_> = collect(rx)
            .await
            .into_iter()
            .filter_map(|ev| match ev {
                UiEvent::Output {
                    stream: Stream::Stdout,
                    line,
                    ..
                } => Some(line),
                _ => None,
            })
            .collect();
        assert_eq!(stdout, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_run_reports_output_then_summary() {
        let jobs = JobTable::new();
        let id = screen_id();
        let req = request(&id, "sh", &["-c", "echo out; echo err 1>&2; exit 3"]);
        jobs.reserve(&id, &req.command).expect("reserve");
        let cwd = Arc::new(Mutex::new(req.cwd.clone()));

        let (tx, rx) = mpsc::channel(64);
        run(req, jobs.clone(), cwd, tx).await;
        let events = collect(rx).await;

        assert!(matches!(events.first(), Some(UiEvent::Started { .. })));
        let finished = events
            .iter()
            .filter(|ev| matches!(ev, UiEvent::Finished { .. }))
            .count();
        assert_eq!(finished, 1);
        let Some(UiEvent::Finished { exit_code, .. }) = events.last() else {
            panic!("last event must be Finished: {events:?}");
        };
        assert_eq!(*exit_code, 3);
        let lines: Vec<_> = events
            .iter()
            .filter_map(|ev| match ev {
                UiEvent::Output { stream, line, .. } => Some((*stream, line.as_str())),
                _ => None,
            })
            .collect();
        assert!(lines.contains(&(Stream::Stdout, "out")));
        assert!(lines.contains(&(Stream::Stderr, "err")));
        assert!(!jobs.is_running(&id));
    }

    #[tokio::test]
    async fn test_run_exit_codes() {
        for (program, expected) in [("true", 0), ("false", 1)] {
            let jobs = JobTable::new();
            let id = screen_id();
            let req = request(&id, program, &[]);
            jobs.reserve(&id, program).expect("reserve");
            let cwd = Arc::new(Mutex::new(req.cwd.clone()));
            let (tx, rx) = mpsc::channel(16);
            run(req, jobs, cwd, tx).await;
            let events = collect(rx).await;
            assert!(
                matches!(events.last(), Some(UiEvent::Finished { exit_code, .. }) if *exit_code == expected)
            );
        }
    }

    #[tokio::test]
    async fn test_spawn_failure_releases_slot() {
        let jobs = JobTable::new();
        let id = screen_id();
        let req = request(&id, "sysh-no-such-program", &["x"]);
        jobs.reserve(&id, &req.command).expect("reserve");
        let cwd = Arc::new(Mutex::new(req.cwd.clone()));

        let (tx, rx) = mpsc::channel(16);
        run(req, jobs.clone(), cwd, tx).await;
        let events = collect(rx).await;

        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], UiEvent::SpawnFailed { command, .. } if command == "sysh-no-such-program x"));
        assert!(!jobs.is_running(&id));
    }

    #[tokio::test]
    async fn test_interrupt_reaches_running_process() {
        let jobs = JobTable::new();
        let id = screen_id();
        let req = request(&id, "sleep", &["30"]);
        jobs.reserve(&id, &req.command).expect("reserve");
        let cwd = Arc::new(Mutex::new(req.cwd.clone()));

        let (tx, mut rx) = mpsc::channel(16);
        let handle = spawn(req, jobs.clone(), cwd, tx);

        let started = timeout(Duration::from_secs(5), rx.recv()).await.expect("started in time");
        assert!(matches!(started, Some(UiEvent::Started { .. })));
        jobs.interrupt(&id).expect("interrupt");

        let finished = timeout(Duration::from_secs(5), async {
            while let Some(ev) = rx.recv().await {
                if let UiEvent::Finished { exit_code, .. } = ev {
                    return Some(exit_code);
                }
            }
            None
        })
        .await
        .expect("finished in time");
        assert_eq!(finished, Some(-1));
        handle.await.expect("task joined");
    }

    #[test]
    fn test_follow_cwd_only_from_unchanged_session() {
        let cwd = Mutex::new(PathBuf::from("/a"));
        assert!(!follow_cwd(&cwd, Path::new("/a"), Path::new("/a")));
        assert!(follow_cwd(&cwd, Path::new("/a"), Path::new("/b")));
        assert_eq!(*cwd.lock().expect("cwd lock"), PathBuf::from("/b"));
        // The user typed `cd` meanwhile.
        assert!(!follow_cwd(&cwd, Path::new("/a"), Path::new("/c")));
        assert_eq!(*cwd.lock().expect("cwd lock"), PathBuf::from("/b"));
    }

    #[tokio::test]
    async fn test_cwd_left_by_process_is_not_applied_after_user_cd() {
        let jobs = JobTable::new();
        let id = screen_id();
        let dir = tempfile::tempdir().expect("temp dir");
        std::fs::create_dir(dir.path().join("sub")).expect("mkdir");
        let mut req = request(&id, "sh", &["-c", "cd sub && exec 1>&- 2>&- && sleep 0.5"]);
        req.cwd = dir.path().to_path_buf();
        jobs.reserve(&id, &req.command).expect("reserve");
        // The session moved on while the command ran.
        let elsewhere = PathBuf::from("/");
        let cwd = Arc::new(Mutex::new(elsewhere.clone()));

        let (tx, rx) = mpsc::channel(16);
        run(req, jobs, cwd.clone(), tx).await;
        let events = collect(rx).await;

        assert_eq!(*cwd.lock().expect("cwd lock"), elsewhere);
        assert!(!events.iter().any(|ev| matches!(ev, UiEvent::Status(_))));
    }

    #[tokio::test]
    async fn test_slot_reused_before_exit_survives_reap() {
        let jobs = JobTable::new();
        let id = screen_id();
        let req = request(&id, "sh", &["-c", "exec 1>&- 2>&-; sleep 0.3"]);
        jobs.reserve(&id, &req.command).expect("reserve");
        let cwd = Arc::new(Mutex::new(req.cwd.clone()));

        let (tx, mut rx) = mpsc::channel(16);
        let handle = spawn(req, jobs.clone(), cwd, tx);
        let Some(UiEvent::Started { pid, .. }) = rx.recv().await else {
            panic!("started first");
        };
        // Grace release, then a new command claims the slot.
        jobs.release(&id, Some(pid));
        jobs.reserve(&id, "next").expect("slot free");
        jobs.attach_pid(&id, pid + 100_000);

        handle.await.expect("task joined");
        assert_eq!(jobs.get(&id).map(|j| j.command), Some("next".to_string()));
    }

    #[test]
    fn test_parse_lsof_cwd() {
        let out = "p4242\nfcwd\nn/home/alice/src\n";
        assert_eq!(parse_lsof_cwd(out), Some(PathBuf::from("/home/alice/src")));
        assert_eq!(parse_lsof_cwd("p1\nfcwd\n"), None);
    }
}
