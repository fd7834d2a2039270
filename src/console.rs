//! Console input
//!
//! Console reads block and cannot be cancelled, so they run on a dedicated
//! thread. Callers race each read against the stopping signal and may
//! abandon it; see [`crate::host::wait_or_cancel`].

use std::future::Future;
use std::io::{self, BufRead};
use std::sync::mpsc;
use std::thread;

use tokio::sync::oneshot;

type LineReply = oneshot::Sender<io::Result<Option<String>>>;

/// Source of console lines
pub trait LineReader: Send {
    /// Read one line without its terminator. `None` means end of input.
    fn read_line(&mut self) -> impl Future<Output = io::Result<Option<String>>> + Send;
}

/// Reads standard input on a detached worker thread, one line per request
pub struct StdinLineReader {
    requests: mpsc::Sender<LineReply>,
}

impl StdinLineReader {
    pub fn spawn() -> io::Result<Self> {
        Self::spawn_with(io::BufReader::new(io::stdin()))
    }

    pub(crate) fn spawn_with<R>(input: R) -> io::Result<Self>
    where
        R: BufRead + Send + 'static,
    {
        let (requests, receiver) = mpsc::channel::<LineReply>();
        // Never joined: a read blocked on the terminal must not hold up process exit
        thread::Builder::new()
            .name("console-reader".to_string())
            .spawn(move || serve_reads(input, receiver))?;
        Ok(Self { requests })
    }
}

fn serve_reads<R: BufRead>(mut input: R, requests: mpsc::Receiver<LineReply>) {
    for reply in requests {
        // Skip reads that were abandoned before they started so they never eat input
        if reply.is_closed() {
            continue;
        }

        let mut raw = Vec::new();
        let result = match input.read_until(b'\n', &mut raw) {
            Ok(0) => Ok(None),
            // Undecodable bytes become replacement characters; such a line never matches the menu
            Ok(_) => Ok(Some(trim_line_ending(String::from_utf8_lossy(&raw).into_owned()))),
            Err(e) => Err(e),
        };

        // The caller may have given up mid-read; the line is dropped with the reply
        if reply.send(result).is_err() {
            tracing::debug!("Discarded console line read for an abandoned prompt");
        }
    }
}

fn trim_line_ending(mut line: String) -> String {
    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    line
}

impl LineReader for StdinLineReader {
    async fn read_line(&mut self) -> io::Result<Option<String>> {
        let (reply, receiver) = oneshot::channel();
        self.requests
            .send(reply)
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "console reader thread exited"))?;
        receiver
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "console reader thread exited"))?
    }
}
