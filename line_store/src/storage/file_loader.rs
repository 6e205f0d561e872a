// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The read side of the file layer: streaming a file into a [`Document`], and
//! re-reading the bytes of an evicted block from that same file.
//!
//! Lines are split on `\n`, and a trailing `\r` is stripped as well, so `\r\n` files load
//! the same as `\n` files. Each block remembers the file offset of its first line, and
//! since it holds consecutive lines, its bytes are exactly the concatenation of the lines
//! that follow that offset, minus terminators. That's what [`fill_block_from_reader`]
//! reconstructs.

use std::{fs::File,
          io::{BufRead, BufReader, Seek, SeekFrom},
          path::{Path, PathBuf}};

use miette::{IntoDiagnostic, WrapErr};

use crate::{Document, ok};

/// Stream every line of `reader` into `document`. The document doesn't get a reload
/// callback, since a reader can't be reopened. See [`load_document_from_path`].
///
/// # Errors
///
/// Returns an error if reading fails, a line is too long for a block, or the pool is
/// exhausted.
pub fn load_document_from_reader(
    mut reader: impl BufRead,
    document: &mut Document,
) -> miette::Result<()> {
    let mut line = Vec::new();
    let mut file_offset: u64 = 0;
    let mut line_number: usize = 0;

    loop {
        line.clear();
        let bytes_read = reader
            .read_until(b'\n', &mut line)
            .into_diagnostic()
            .wrap_err_with(|| format!("Failed to read line {line_number}"))?;
        if bytes_read == 0 {
            break;
        }

        strip_line_terminator(&mut line);
        document
            .push_loaded_line(file_offset, &line)
            .wrap_err_with(|| format!("Failed to load line {line_number}"))?;

        file_offset += bytes_read as u64;
        line_number += 1;
    }

    document.finish_load();
    ok!()
}

/// Load the file at `path` into `document`, and install a [`FileReloader`] for it, so
/// blocks evicted from the pool are re-read from the file.
///
/// # Errors
///
/// Returns an error if the file can't be opened, or see [`load_document_from_reader`].
pub fn load_document_from_path(
    path: impl AsRef<Path>,
    document: &mut Document,
) -> miette::Result<()> {
    let path = path.as_ref();
    let file = File::open(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("Failed to open {}", path.display()))?;

    load_document_from_reader(BufReader::new(file), document)?;
    document.set_reload_callback(FileReloader::new(path).into_reload_fn());

    tracing::debug!(
        message = "📂 loaded file",
        path = %path.display(),
        lines = document.line_count()
    );
    ok!()
}

/// Fill `out` with the lines that start at `file_offset`, terminators stripped. Returns
/// `false` if the bytes don't line up with whole lines (ie: the file changed since it was
/// loaded), or on any I/O error.
pub fn fill_block_from_reader<R: BufRead + Seek>(
    mut reader: R,
    file_offset: u64,
    out: &mut [u8],
) -> bool {
    if reader.seek(SeekFrom::Start(file_offset)).is_err() {
        return false;
    }

    let mut line = Vec::new();
    let mut filled = 0;
    while filled < out.len() {
        line.clear();
        match reader.read_until(b'\n', &mut line) {
            Ok(0) | Err(_) => return false,
            Ok(_) => {}
        }
        strip_line_terminator(&mut line);

        let end = filled + line.len();
        let Some(dest) = out.get_mut(filled..end) else {
            return false;
        };
        dest.copy_from_slice(&line);
        filled = end;
    }
    true
}

fn strip_line_terminator(line: &mut Vec<u8>) {
    if line.last() == Some(&b'\n') {
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
    }
}

/// Reopens the file a [`Document`] was loaded from, to reload evicted blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReloader {
    pub path: PathBuf,
}

impl FileReloader {
    pub fn new(path: impl Into<PathBuf>) -> Self { Self { path: path.into() } }

    /// Fill `out` (which is `size` bytes long) with the block that starts at
    /// `file_offset`.
    pub fn reload(&self, file_offset: u64, size: u32, out: &mut [u8]) -> bool {
        if out.len() != size as usize {
            return false;
        }
        match File::open(&self.path) {
            Ok(file) => fill_block_from_reader(BufReader::new(file), file_offset, out),
            Err(error) => {
                tracing::warn!(
                    message = "💾 could not reopen file",
                    path = %self.path.display(),
                    %error
                );
                false
            }
        }
    }

    pub fn into_reload_fn(self) -> impl FnMut(u64, u32, &mut [u8]) -> bool + 'static {
        move |file_offset, size, out| self.reload(file_offset, size, out)
    }
}
