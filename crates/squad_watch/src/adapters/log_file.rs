//! Follows a server log file on local disk.

use async_trait::async_trait;
use squad_server::{LogReader, LogReaderError};
use std::io::SeekFrom;
use std::path::PathBuf;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const LINE_BUFFER: usize = 1024;

struct Tail {
    stop: broadcast::Sender<()>,
    task: JoinHandle<()>,
}

/// A `tail -f` over one file. Only complete lines are forwarded; a partial
/// line at end of file waits for its newline.
pub struct FileTailLogReader {
    path: PathBuf,
    from_start: bool,
    poll_interval: Duration,
    tail: Mutex<Option<Tail>>,
}

impl FileTailLogReader {
    pub fn new(path: PathBuf, from_start: bool, poll_interval: Duration) -> Self {
        Self {
            path,
            from_start,
            poll_interval,
            tail: Mutex::new(None),
        }
    }
}

#[async_trait]
impl LogReader for FileTailLogReader {
    async fn watch(&self) -> Result<mpsc::Receiver<String>, LogReaderError> {
        let mut tail = self.tail.lock().await;
        if tail.is_some() {
            return Err(LogReaderError::AlreadyWatching);
        }

        let mut file = File::open(&self.path).await?;
        if !self.from_start {
            file.seek(SeekFrom::End(0)).await?;
        }
        info!("📜 Following {}", self.path.display());

        let (tx, rx) = mpsc::channel(LINE_BUFFER);
        let (stop, mut stopped) = broadcast::channel(1);
        let poll_interval = self.poll_interval;
        let path = self.path.clone();

        let task = tokio::spawn(async move {
            let mut reader = BufReader::new(file);
            let mut partial = String::new();
            loop {
                let read = tokio::select! {
                    _ = stopped.recv() => break,
                    read = reader.read_line(&mut partial) => read,
                };
                match read {
                    Ok(0) => {
                        tokio::select! {
                            _ = stopped.recv() => break,
                            _ = tokio::time::sleep(poll_interval) => {}
                        }
                    }
                    Ok(_) if partial.ends_with('\n') => {
                        let line = partial.trim_end_matches(['\r', '\n']).to_string();
                        partial.clear();
                        if tx.send(line).await.is_err() {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!("⚠️ Reading {} failed: {}", path.display(), e);
                        break;
                    }
                }
            }
            debug!("Stopped following {}", path.display());
        });

        *tail = Some(Tail { stop, task });
        Ok(rx)
    }

    async fn unwatch(&self) -> Result<(), LogReaderError> {
        if let Some(tail) = self.tail.lock().await.take() {
            let _ = tail.stop.send(());
            if let Err(e) = tail.task.await {
                warn!("⚠️ Log tail task failed: {}", e);
            }
        }
        Ok(())
    }
}
