use {
    crate::{
        chunk::{self, ChunkData},
        terrain::TerrainField,
    },
    serde::{Deserialize, Serialize},
    std::{
        fmt,
        panic::{AssertUnwindSafe, catch_unwind},
        sync::{Arc, mpsc},
        thread,
    },
};

/// Requests accepted by the generation worker, as JSON frames.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum Request {
    Init,
    GenerateChunk { data: GenerateArgs },
}

#[derive(Debug, Serialize, Deserialize)]
struct GenerateArgs {
    cx: i32,
    cz: i32,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum Reply {
    Initialized,
    ChunkGenerated { data: GeneratedPayload },
    Error { data: ErrorPayload },
}

#[derive(Debug, Serialize, Deserialize)]
struct GeneratedPayload {
    cx: i32,
    cz: i32,
    #[serde(rename = "chunkData")]
    chunk_data: ChunkData,
}

#[derive(Debug, Serialize, Deserialize)]
struct ErrorPayload {
    cx: i32,
    cz: i32,
    message: String,
}

/// Decoded worker reply handed to the streaming controller.
#[derive(Debug)]
pub enum WorkerEvent {
    Initialized,
    ChunkGenerated {
        cx: i32,
        cz: i32,
        data: ChunkData,
    },
    Failed {
        cx: i32,
        cz: i32,
        message: String,
    },
}

#[derive(Debug)]
pub enum WorkerError {
    /// The worker thread is gone or was never started.
    Disconnected,
    Encode(serde_json::Error),
}

impl fmt::Display for WorkerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerError::Disconnected => write!(f, "generation worker disconnected"),
            WorkerError::Encode(err) => write!(f, "failed to encode worker request: {err}"),
        }
    }
}

impl std::error::Error for WorkerError {}

/// Handle to the single long-lived generation thread. All traffic is
/// line-delimited JSON so the protocol stays plain structured data.
///
/// The worker holds no cache state; the controller keeps the pending set
/// and treats every error here as a cue to generate synchronously instead.
pub struct WorkerChannel {
    request_tx: Option<mpsc::Sender<String>>,
    reply_rx: mpsc::Receiver<String>,
    handle: Option<thread::JoinHandle<()>>,
    initialized: bool,
}

impl WorkerChannel {
    pub fn spawn(terrain: Arc<TerrainField>) -> Self {
        let (request_tx, request_rx) = mpsc::channel::<String>();
        let (reply_tx, reply_rx) = mpsc::channel::<String>();

        let handle = thread::Builder::new()
            .name("chunk-generator".into())
            .spawn(move || worker_loop(&terrain, &request_rx, &reply_tx));

        let mut channel = match handle {
            Ok(handle) => Self {
                request_tx: Some(request_tx),
                reply_rx,
                handle: Some(handle),
                initialized: false,
            },
            Err(err) => {
                log::warn!("could not spawn generation worker: {err}");
                Self {
                    request_tx: None,
                    reply_rx,
                    handle: None,
                    initialized: false,
                }
            }
        };

        if let Err(err) = channel.send(&Request::Init) {
            log::warn!("worker init failed: {err}");
        }
        channel
    }

    fn send(&mut self, request: &Request) -> Result<(), WorkerError> {
        let Some(tx) = &self.request_tx else {
            return Err(WorkerError::Disconnected);
        };
        let frame = serde_json::to_string(request).map_err(WorkerError::Encode)?;
        if tx.send(frame).is_err() {
            // the thread died; drop the sender so later calls short-circuit
            self.request_tx = None;
            return Err(WorkerError::Disconnected);
        }
        Ok(())
    }

    /// Ask the worker to generate chunk (cx, cz). The caller is responsible
    /// for not re-requesting a coordinate that is already in flight.
    pub fn request(&mut self, cx: i32, cz: i32) -> Result<(), WorkerError> {
        self.send(&Request::GenerateChunk {
            data: GenerateArgs { cx, cz },
        })
    }

    /// Whether the worker acknowledged the init handshake yet.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Channel with no thread behind it: the caller plays the worker by
    /// reading requests and writing reply frames directly.
    #[cfg(test)]
    pub(crate) fn rigged() -> (Self, mpsc::Receiver<String>, mpsc::Sender<String>) {
        let (request_tx, request_rx) = mpsc::channel();
        let (reply_tx, reply_rx) = mpsc::channel();
        let channel = Self {
            request_tx: Some(request_tx),
            reply_rx,
            handle: None,
            initialized: false,
        };
        (channel, request_rx, reply_tx)
    }

    /// Non-blocking drain of every reply currently queued. Malformed frames
    /// are logged and skipped.
    pub fn poll(&mut self) -> Vec<WorkerEvent> {
        let mut events = Vec::new();
        while let Ok(frame) = self.reply_rx.try_recv() {
            match serde_json::from_str::<Reply>(&frame) {
                Ok(Reply::Initialized) => {
                    self.initialized = true;
                    events.push(WorkerEvent::Initialized);
                }
                Ok(Reply::ChunkGenerated { data }) => events.push(WorkerEvent::ChunkGenerated {
                    cx: data.cx,
                    cz: data.cz,
                    data: data.chunk_data,
                }),
                Ok(Reply::Error { data }) => events.push(WorkerEvent::Failed {
                    cx: data.cx,
                    cz: data.cz,
                    message: data.message,
                }),
                Err(err) => log::warn!("skipping malformed worker reply: {err}"),
            }
        }
        events
    }
}

impl Drop for WorkerChannel {
    fn drop(&mut self) {
        // closing the request channel ends the worker loop
        self.request_tx = None;
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn worker_loop(
    terrain: &TerrainField,
    requests: &mpsc::Receiver<String>,
    replies: &mpsc::Sender<String>,
) {
    let reply = |value: &Reply| -> bool {
        match serde_json::to_string(value) {
            Ok(frame) => replies.send(frame).is_ok(),
            Err(err) => {
                log::error!("could not encode worker reply: {err}");
                true
            }
        }
    };

    while let Ok(frame) = requests.recv() {
        let request = match serde_json::from_str::<Request>(&frame) {
            Ok(request) => request,
            Err(err) => {
                log::warn!("skipping malformed worker request: {err}");
                continue;
            }
        };

        let alive = match request {
            Request::Init => reply(&Reply::Initialized),
            Request::GenerateChunk {
                data: GenerateArgs { cx, cz },
            } => match catch_unwind(AssertUnwindSafe(|| chunk::generate(terrain, cx, cz))) {
                Ok(chunk_data) => reply(&Reply::ChunkGenerated {
                    data: GeneratedPayload {
                        cx,
                        cz,
                        chunk_data,
                    },
                }),
                Err(panic) => {
                    let message = panic
                        .downcast_ref::<&str>()
                        .map(ToString::to_string)
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "chunk generation panicked".into());
                    reply(&Reply::Error {
                        data: ErrorPayload { cx, cz, message },
                    })
                }
            },
        };

        if !alive {
            break;
        }
    }
}
