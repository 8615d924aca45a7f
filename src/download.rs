// Streaming download: the response body is read in fixed-size chunks and
// written straight to disk. The destination is created only after the
// server has answered with a success status.

use crate::api::{ApiClient, ANY};
use crate::error::{ConnectivityError, Error};
use crate::progress::Progress;
use crate::transport::Request;
use std::fs::File;
use std::io::{self, ErrorKind, Read, Write};
use std::path::Path;

/// Size of each read from the response body.
pub const CHUNK_SIZE: usize = 8192;

/// Iterator over a reader in chunks of at most `CHUNK_SIZE` bytes.
pub struct Chunks<R> {
    reader: R,
    buf: Box<[u8]>,
    done: bool,
}

impl<R: Read> Chunks<R> {
    pub fn new(reader: R) -> Self {
        Chunks {
            reader,
            buf: vec![0; CHUNK_SIZE].into_boxed_slice(),
            done: false,
        }
    }
}

impl<R: Read> Iterator for Chunks<R> {
    type Item = io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            match self.reader.read(&mut self.buf) {
                Ok(0) => {
                    self.done = true;
                    return None;
                }
                Ok(n) => return Some(Ok(self.buf[..n].to_vec())),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

/// Which side of a chunk copy failed.
#[derive(Debug)]
pub enum CopyError {
    Read(io::Error),
    Write(io::Error),
}

/// Write every non-empty chunk to `out` in order, feeding its length to
/// `progress`. Empty chunks are skipped entirely. Returns the byte count.
pub fn write_chunks<I, W>(chunks: I, out: &mut W, progress: &Progress) -> Result<u64, CopyError>
where
    I: IntoIterator<Item = io::Result<Vec<u8>>>,
    W: Write,
{
    let mut written = 0u64;
    for chunk in chunks {
        let chunk = chunk.map_err(CopyError::Read)?;
        if chunk.is_empty() {
            continue;
        }
        out.write_all(&chunk).map_err(CopyError::Write)?;
        written += chunk.len() as u64;
        progress.update(chunk.len() as u64);
    }
    out.flush().map_err(CopyError::Write)?;
    Ok(written)
}

impl ApiClient {
    /// GET `path` and stream the body into `filename`, overwriting it.
    ///
    /// A non-success status fails with `Error::HttpStatus` before the file
    /// is touched. A failed write leaves a partial file behind; the download
    /// has to be restarted from scratch.
    pub fn download(&self, path: &str, filename: &Path) -> Result<(), Error> {
        let response = self
            .translator
            .intercept(self.transport.send(Request::get(path, ANY)))?;

        let status = response.status();
        if !status.is_success() {
            let url = response.url().to_string();
            let body = self.translator.intercept(self.transport.text(response))?;
            return Err(Error::HttpStatus { url, status, body });
        }

        let url = response.url().to_string();
        let total = response.content_length();
        let mut file = File::create(filename).map_err(|e| Error::file_access(filename, e))?;

        let label = filename.display().to_string();
        let result = {
            let progress = self.reporter.open(total, &label);
            write_chunks(Chunks::new(response), &mut file, &progress)
        };

        let written = match result {
            Ok(n) => n,
            Err(CopyError::Write(e)) => return Err(Error::file_access(filename, e)),
            Err(CopyError::Read(e)) => {
                let err: Result<(), Error> = Err(ConnectivityError::new(url, e).into());
                return self.translator.intercept(err);
            }
        };
        tracing::info!(file = %label, bytes = written, "download complete");
        Ok(())
    }
}
