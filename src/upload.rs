// Streaming upload: the file is sent as a single multipart field without
// being loaded into memory. A monitored reader sits between the file and
// the multipart encoder and reports how many bytes have been consumed.

use crate::api::{pretty_json, ApiClient, JSON};
use crate::error::Error;
use crate::progress::Progress;
use crate::transport::Request;
use reqwest::blocking::multipart::{Form, Part};
use std::fs::File;
use std::io::{self, ErrorKind, Read};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Receives the cumulative number of bytes read so far.
pub trait ReadObserver {
    fn on_read(&mut self, total_read: u64);
}

/// First read error hit by a `MonitoredReader`, kept aside so the caller
/// can tell a local file failure from a broken connection once the reader
/// has been moved into the request body.
#[derive(Clone, Default)]
pub struct ReadFailure(Arc<Mutex<Option<io::Error>>>);

impl ReadFailure {
    /// Keep `err` if nothing was recorded yet and hand back a copy for the
    /// body encoder.
    fn record(&self, err: io::Error) -> io::Error {
        let copy = io::Error::new(err.kind(), err.to_string());
        if let Ok(mut slot) = self.0.lock() {
            slot.get_or_insert(err);
        }
        copy
    }

    pub fn take(&self) -> Option<io::Error> {
        self.0.lock().ok().and_then(|mut slot| slot.take())
    }
}

/// Wraps a reader and notifies an observer after every successful read.
pub struct MonitoredReader<R, O> {
    inner: R,
    observer: O,
    bytes_read: u64,
    failure: ReadFailure,
}

impl<R: Read, O: ReadObserver> MonitoredReader<R, O> {
    pub fn new(inner: R, observer: O) -> Self {
        MonitoredReader {
            inner,
            observer,
            bytes_read: 0,
            failure: ReadFailure::default(),
        }
    }

    /// Handle to the error slot shared with this reader.
    pub fn failure(&self) -> ReadFailure {
        self.failure.clone()
    }
}

impl<R: Read, O: ReadObserver> Read for MonitoredReader<R, O> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = match self.inner.read(buf) {
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => return Err(e),
            Err(e) => return Err(self.failure.record(e)),
        };
        if n > 0 {
            self.bytes_read += n as u64;
            self.observer.on_read(self.bytes_read);
        }
        Ok(n)
    }
}

/// Turns cumulative read counts into progress deltas. Counts that go
/// backwards or repeat produce no update.
pub struct UploadProgress {
    progress: Progress,
    last_read: u64,
}

impl UploadProgress {
    pub fn new(progress: Progress) -> Self {
        UploadProgress {
            progress,
            last_read: 0,
        }
    }
}

impl ReadObserver for UploadProgress {
    fn on_read(&mut self, total_read: u64) {
        let delta = total_read.saturating_sub(self.last_read);
        if delta > 0 {
            self.progress.update(delta);
            self.last_read = total_read;
        }
    }
}

impl ApiClient {
    /// POST `file_path` as multipart field `field_name` and return the JSON
    /// response pretty-printed. Progress is shown against the file size.
    pub fn upload(
        &self,
        path: &str,
        field_name: &str,
        file_path: &Path,
        mime_type: &str,
    ) -> Result<String, Error> {
        let file = File::open(file_path).map_err(|e| Error::file_access(file_path, e))?;
        let metadata = file.metadata().map_err(|e| Error::file_access(file_path, e))?;
        if !metadata.is_file() {
            let err = io::Error::new(ErrorKind::InvalidInput, "not a regular file");
            return Err(Error::file_access(file_path, err));
        }
        let size = metadata.len();
        let file_name = file_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| field_name.to_string());

        let (result, failure) = {
            let progress = self.reporter.open(Some(size), &file_name);
            let reader = MonitoredReader::new(file, UploadProgress::new(progress.handle()));
            let failure = reader.failure();
            let part = Part::reader_with_length(reader, size)
                .file_name(file_name.clone())
                .mime_str(mime_type)
                .map_err(Error::Request)?;
            let form = Form::new().part(field_name.to_string(), part);
            tracing::info!(file = %file_path.display(), size, boundary = form.boundary(), "uploading");

            let result = self
                .transport
                .send(Request::post(path, JSON).multipart(form))
                .and_then(|res| self.transport.text(res));
            tracing::debug!(sent = progress.transferred(), size, "upload finished");
            (result, failure)
        };
        // The encoder reports a source read error as a body failure; it is
        // the local file, not the connection, that broke.
        if let Some(err) = failure.take() {
            return Err(Error::file_access(file_path, err));
        }
        pretty_json(&self.translator.intercept(result)?)
    }
}
