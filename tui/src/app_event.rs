//! Events sent back to the app loop by spawned request tasks.

use std::path::PathBuf;

use writeup_client::ClientError;
use writeup_protocol::wire::ExportFormat;
use writeup_protocol::wire::GenerateRequest;
use writeup_protocol::wire::GenerateResponse;

use crate::submit_latch::InFlightGuard;

#[derive(Debug)]
pub enum AppEvent {
    /// A generation request settled. `request` is the snapshot that was sent, kept so a failure
    /// can be retried verbatim. The latch is released once the app has applied the outcome.
    GenerationFinished {
        request: GenerateRequest,
        result: Result<GenerateResponse, ClientError>,
        guard: InFlightGuard,
    },

    /// An export settled; on success the file was saved at the given path.
    ExportFinished {
        format: ExportFormat,
        result: Result<PathBuf, String>,
    },
}
