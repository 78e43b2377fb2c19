use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::error::Result;

pub enum StreamCommand {
    ReadChunk,
    Stop,
}

pub enum StreamMessage {
    Chunk(Vec<u8>),
    Eof,
    Failed(String),
}

/// Chunked document source backed by a reader thread.
///
/// The thread reads exactly one chunk per `request_chunk()`, so nothing is
/// read ahead of the consumer.
pub struct DocumentStream {
    tx_cmd: Sender<StreamCommand>,
    rx_msg: Receiver<StreamMessage>,
    total_size: u64,
    last_error: Arc<Mutex<Option<String>>>,
    thread_handle: Option<JoinHandle<()>>,
}

impl DocumentStream {
    pub fn open(path: &Path, chunk_size: usize) -> Result<Self> {
        let file = File::open(path)?;
        let total_size = file.metadata()?.len();
        log::info!(
            "Opened {} ({} bytes, {} byte chunks)",
            path.display(),
            total_size,
            chunk_size
        );
        Ok(Self::from_reader(BufReader::new(file), total_size, chunk_size))
    }

    pub fn from_reader<R>(source: R, total_size: u64, chunk_size: usize) -> Self
    where
        R: Read + Send + 'static,
    {
        let (tx_cmd, rx_cmd) = channel::unbounded::<StreamCommand>();
        let (tx_msg, rx_msg) = channel::bounded::<StreamMessage>(1);
        let last_error = Arc::new(Mutex::new(None));
        let last_error_clone = Arc::clone(&last_error);
        let chunk_size = chunk_size.max(1);

        let thread_handle = thread::spawn(move || {
            reader_thread(source, chunk_size, rx_cmd, tx_msg, last_error_clone);
        });

        Self {
            tx_cmd,
            rx_msg,
            total_size,
            last_error,
            thread_handle: Some(thread_handle),
        }
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn request_chunk(&self) {
        let _ = self.tx_cmd.send(StreamCommand::ReadChunk);
    }

    pub fn try_recv(&self) -> Option<StreamMessage> {
        self.rx_msg.try_recv().ok()
    }

    /// Blocks until the reader answers; `None` once the thread is gone.
    pub fn recv(&self) -> Option<StreamMessage> {
        self.rx_msg.recv().ok()
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }
}

impl Drop for DocumentStream {
    fn drop(&mut self) {
        let _ = self.tx_cmd.send(StreamCommand::Stop);
        if let Some(handle) = self.thread_handle.take() {
            // keep draining so a reader blocked on a full channel can see Stop
            while !handle.is_finished() {
                while self.rx_msg.try_recv().is_ok() {}
                thread::yield_now();
            }
            let _ = handle.join();
        }
    }
}

fn reader_thread<R: Read>(
    mut source: R,
    chunk_size: usize,
    rx_cmd: Receiver<StreamCommand>,
    tx_msg: Sender<StreamMessage>,
    last_error: Arc<Mutex<Option<String>>>,
) {
    loop {
        let cmd = match rx_cmd.recv() {
            Ok(c) => c,
            Err(_) => return,
        };

        match cmd {
            StreamCommand::ReadChunk => match read_chunk(&mut source, chunk_size) {
                Ok(chunk) if chunk.is_empty() => {
                    let _ = tx_msg.send(StreamMessage::Eof);
                    return;
                }
                Ok(chunk) => {
                    if tx_msg.send(StreamMessage::Chunk(chunk)).is_err() {
                        return;
                    }
                }
                Err(e) => {
                    let message = e.to_string();
                    *last_error.lock() = Some(message.clone());
                    let _ = tx_msg.send(StreamMessage::Failed(message));
                    return;
                }
            },
            StreamCommand::Stop => return,
        }
    }
}

fn read_chunk<R: Read>(source: &mut R, chunk_size: usize) -> std::io::Result<Vec<u8>> {
    let mut chunk = Vec::with_capacity(chunk_size);
    source.by_ref().take(chunk_size as u64).read_to_end(&mut chunk)?;
    Ok(chunk)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("disk on fire"))
        }
    }

    #[test]
    fn test_chunks_then_eof() {
        let data: Vec<u8> = (0..10u8).collect();
        let stream = DocumentStream::from_reader(Cursor::new(data.clone()), 10, 4);

        let mut received = Vec::new();
        loop {
            stream.request_chunk();
            match stream.recv() {
                Some(StreamMessage::Chunk(chunk)) => {
                    assert!(chunk.len() <= 4);
                    received.extend(chunk);
                }
                Some(StreamMessage::Eof) => break,
                Some(StreamMessage::Failed(e)) => panic!("unexpected failure: {e}"),
                None => panic!("reader thread vanished"),
            }
        }
        assert_eq!(received, data);
    }

    #[test]
    fn test_nothing_read_without_request() {
        let stream = DocumentStream::from_reader(Cursor::new(vec![1u8; 8]), 8, 4);
        std::thread::sleep(std::time::Duration::from_millis(20));
        assert!(stream.try_recv().is_none());
    }

    #[test]
    fn test_read_error_is_reported() {
        let stream = DocumentStream::from_reader(FailingReader, 0, 4);
        stream.request_chunk();
        match stream.recv() {
            Some(StreamMessage::Failed(message)) => assert!(message.contains("disk on fire")),
            _ => panic!("expected a failure message"),
        }
        assert!(stream.last_error().is_some());
    }

    #[test]
    fn test_open_missing_file() {
        let result = DocumentStream::open(Path::new("/nonexistent/city.gml"), 16);
        assert!(result.is_err());
    }
}
