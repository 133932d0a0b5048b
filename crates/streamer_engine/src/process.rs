//! Scoped ownership of an external tool process.
//!
//! A [`ProcessGuard`] is the only owner of its child. The child runs in its own
//! process group so termination also reaches helpers it spawned (ffmpeg). The
//! group is terminated on every exit path: explicitly through
//! [`ProcessGuard::shutdown`], or with SIGKILL when the guard is dropped while
//! the child is still running.

use std::io;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use engine_logging::{engine_debug, engine_warn};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;

/// One line of combined stdout/stderr output, or the read error that ended it.
pub type OutputLine = io::Result<String>;

/// Lines buffered between the reader task and the consumer. A child that
/// writes faster than it is consumed blocks on its pipe.
const LINE_BUFFER: usize = 256;

pub struct ProcessGuard {
    child: Option<Child>,
    pid: Option<u32>,
    label: &'static str,
}

impl ProcessGuard {
    /// Spawns `cmd` with stdout and stderr on one shared pipe, so lines arrive
    /// in the order the child wrote them. The channel closes at EOF.
    pub fn spawn(
        mut cmd: Command,
        label: &'static str,
    ) -> io::Result<(Self, mpsc::Receiver<OutputLine>)> {
        let (reader, writer) = io::pipe()?;
        cmd.stdin(Stdio::null())
            .stdout(writer.try_clone()?)
            .stderr(writer)
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        let spawned = cmd.spawn();
        // The command still holds the write ends; EOF only arrives once they
        // are closed here.
        drop(cmd);
        let child = spawned?;
        let pid = child.id();
        engine_debug!("Spawned {} (pid {:?})", label, pid);

        let (tx, rx) = mpsc::channel(LINE_BUFFER);
        spawn_line_reader(async_pipe(reader)?, tx);

        Ok((
            Self {
                child: Some(child),
                pid,
                label,
            },
            rx,
        ))
    }

    /// Waits up to `within` for the child to exit on its own.
    pub async fn wait_exit(&mut self, within: Duration) -> Option<ExitStatus> {
        let child = self.child.as_mut()?;
        match tokio::time::timeout(within, child.wait()).await {
            Ok(Ok(status)) => Some(status),
            Ok(Err(err)) => {
                engine_warn!("Error waiting for {}: {}", self.label, err);
                None
            }
            Err(_) => None,
        }
    }

    /// Terminates the child: SIGTERM to its group, then SIGKILL once `grace`
    /// has passed. Returns the exit status when one could be collected.
    pub async fn shutdown(mut self, grace: Duration) -> Option<ExitStatus> {
        let mut child = self.child.take()?;
        if let Ok(Some(status)) = child.try_wait() {
            return Some(status);
        }

        engine_debug!("Terminating {} (pid {:?})", self.label, self.pid);
        self.signal_group(GroupSignal::Terminate, &mut child);
        match tokio::time::timeout(grace, child.wait()).await {
            Ok(Ok(status)) => Some(status),
            Ok(Err(err)) => {
                engine_warn!("Error waiting for {}: {}", self.label, err);
                None
            }
            Err(_) => {
                engine_warn!(
                    "{} did not exit within {:?}; killing",
                    self.label,
                    grace
                );
                self.signal_group(GroupSignal::Kill, &mut child);
                let _ = child.kill().await;
                child.wait().await.ok()
            }
        }
    }

    fn signal_group(&self, signal: GroupSignal, child: &mut Child) {
        #[cfg(unix)]
        if let Some(pid) = self.pid {
            use nix::sys::signal::{killpg, Signal};
            use nix::unistd::Pid;

            let signal = match signal {
                GroupSignal::Terminate => Signal::SIGTERM,
                GroupSignal::Kill => Signal::SIGKILL,
            };
            if let Err(err) = killpg(Pid::from_raw(pid as i32), signal) {
                engine_debug!("killpg({}, {:?}) failed: {}", pid, signal, err);
            }
            return;
        }
        let _ = signal;
        let _ = child.start_kill();
    }
}

impl Drop for ProcessGuard {
    fn drop(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        if matches!(child.try_wait(), Ok(None)) {
            engine_warn!("{} still running at release; killing", self.label);
            self.signal_group(GroupSignal::Kill, &mut child);
            let _ = child.start_kill();
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum GroupSignal {
    Terminate,
    Kill,
}

#[cfg(unix)]
fn async_pipe(reader: io::PipeReader) -> io::Result<tokio::net::unix::pipe::Receiver> {
    tokio::net::unix::pipe::Receiver::from_owned_fd(std::os::fd::OwnedFd::from(reader))
}

#[cfg(not(unix))]
fn async_pipe(reader: io::PipeReader) -> io::Result<tokio::fs::File> {
    use std::os::windows::io::OwnedHandle;
    Ok(tokio::fs::File::from_std(std::fs::File::from(
        OwnedHandle::from(reader),
    )))
}

fn spawn_line_reader<R>(stream: R, tx: mpsc::Sender<OutputLine>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let text = String::from_utf8_lossy(&buf);
                    // Carriage returns separate progress redraws within one line.
                    for segment in text.split(['\r', '\n']) {
                        if segment.trim().is_empty() {
                            continue;
                        }
                        if tx.send(Ok(segment.to_string())).await.is_err() {
                            return;
                        }
                    }
                }
                Err(err) => {
                    let _ = tx.send(Err(err)).await;
                    break;
                }
            }
        }
    });
}
