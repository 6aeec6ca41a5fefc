//! Parent-liveness supervision.
//!
//! The controller keeps the server's stdin open for as long as it lives and
//! never writes to it. End-of-stream therefore means the controller is
//! gone, and the supervisor cancels the shutdown token.
//!
//! The read blocks, so it runs on a plain detached thread: it cannot stall
//! the async runtime and does not keep the process alive once the server
//! loop has ended.

use std::io::{self, ErrorKind, Read};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const WATCHING: u8 = 0;
const SHUTTING_DOWN: u8 = 1;

/// Supervisor state. `ShuttingDown` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Watching,
    ShuttingDown,
}

/// Handle to a running supervisor.
#[derive(Debug, Clone)]
pub struct LivenessWatch {
    state: Arc<AtomicU8>,
    shutdown: CancellationToken,
}

impl LivenessWatch {
    pub fn state(&self) -> SupervisorState {
        match self.state.load(Ordering::Acquire) {
            WATCHING => SupervisorState::Watching,
            _ => SupervisorState::ShuttingDown,
        }
    }

    /// Resolves once the supervisor has triggered shutdown.
    pub async fn shutdown_triggered(&self) {
        self.shutdown.cancelled().await;
    }
}

/// Starts watching `channel` for end-of-stream on a background thread.
///
/// Data read from the channel is discarded. A read error counts as
/// end-of-stream.
pub fn watch_parent<R>(channel: R, shutdown: CancellationToken) -> io::Result<LivenessWatch>
where
    R: Read + Send + 'static,
{
    let state = Arc::new(AtomicU8::new(WATCHING));
    let watch = LivenessWatch {
        state: Arc::clone(&state),
        shutdown: shutdown.clone(),
    };

    thread::Builder::new()
        .name("parent-liveness".to_string())
        .spawn(move || {
            wait_for_eof(channel);
            if state
                .compare_exchange(WATCHING, SHUTTING_DOWN, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                info!("Parent process closed the liveness channel, shutting down");
                shutdown.cancel();
            }
        })?;

    Ok(watch)
}

/// Watches this process's stdin.
pub fn watch_stdin(shutdown: CancellationToken) -> io::Result<LivenessWatch> {
    watch_parent(io::stdin(), shutdown)
}

fn wait_for_eof<R: Read>(mut channel: R) {
    let mut buf = [0u8; 512];
    loop {
        match channel.read(&mut buf) {
            Ok(0) => return,
            Ok(n) => debug!(bytes = n, "Ignoring data on liveness channel"),
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => {
                warn!(error = %e, "Liveness channel read failed, treating as closed");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::mpsc::{channel, Receiver, Sender};
    use std::time::Duration;

    /// Blocks like a pipe until every sender is dropped.
    struct PipeReader(Receiver<Vec<u8>>);

    impl Read for PipeReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.0.recv() {
                Ok(data) => {
                    let n = data.len().min(buf.len());
                    buf[..n].copy_from_slice(&data[..n]);
                    Ok(n)
                }
                Err(_) => Ok(0),
            }
        }
    }

    fn pipe() -> (Sender<Vec<u8>>, PipeReader) {
        let (tx, rx) = channel();
        (tx, PipeReader(rx))
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(ErrorKind::BrokenPipe, "gone"))
        }
    }

    #[tokio::test]
    async fn test_eof_triggers_shutdown() {
        let token = CancellationToken::new();
        let watch = watch_parent(Cursor::new(Vec::new()), token.clone()).unwrap();

        tokio::time::timeout(Duration::from_secs(5), watch.shutdown_triggered())
            .await
            .expect("shutdown within timeout");
        assert!(token.is_cancelled());
        assert_eq!(watch.state(), SupervisorState::ShuttingDown);
    }

    #[tokio::test]
    async fn test_data_does_not_trigger_shutdown() {
        let token = CancellationToken::new();
        let (tx, reader) = pipe();
        let watch = watch_parent(reader, token.clone()).unwrap();

        tx.send(b"unexpected".to_vec()).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(watch.state(), SupervisorState::Watching);
        assert!(!token.is_cancelled());

        drop(tx);
        tokio::time::timeout(Duration::from_secs(5), watch.shutdown_triggered())
            .await
            .expect("shutdown within timeout");
        assert_eq!(watch.state(), SupervisorState::ShuttingDown);
    }

    #[tokio::test]
    async fn test_read_error_counts_as_eof() {
        let token = CancellationToken::new();
        let watch = watch_parent(FailingReader, token.clone()).unwrap();
        tokio::time::timeout(Duration::from_secs(5), watch.shutdown_triggered())
            .await
            .expect("shutdown within timeout");
        assert!(token.is_cancelled());
    }
}
