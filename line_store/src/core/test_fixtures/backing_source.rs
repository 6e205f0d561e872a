// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! An in-memory stand-in for the backing file of a [`Document`]. It loads itself into a
//! document through the same streaming path as a real file, and hands out a reload
//! callback that records every call, so tests can assert on eviction and reload.

use std::{cell::{Cell, RefCell},
          io::Cursor,
          rc::Rc};

use crate::{Document, fill_block_from_reader, load_document_from_reader, ok};

/// One invocation of the reload callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReloadCall {
    pub file_offset: u64,
    pub size: u32,
}

#[derive(Debug, Clone)]
pub struct InMemorySource {
    pub content: Rc<Vec<u8>>,
    pub calls: Rc<RefCell<Vec<ReloadCall>>>,
    pub fail_reloads: Rc<Cell<bool>>,
}

impl InMemorySource {
    pub fn new(content: impl Into<Vec<u8>>) -> Self {
        Self {
            content: Rc::new(content.into()),
            calls: Rc::default(),
            fail_reloads: Rc::default(),
        }
    }

    /// Build the source from lines, joined with `\n`, with a trailing `\n`.
    pub fn from_lines<S: AsRef<[u8]>>(lines: &[S]) -> Self {
        let mut content = vec![];
        for it in lines {
            content.extend_from_slice(it.as_ref());
            content.push(b'\n');
        }
        Self::new(content)
    }

    /// Stream the content into `document` and install the recording reload callback.
    ///
    /// # Errors
    ///
    /// Returns an error if a line doesn't fit in a block, or the pool is exhausted.
    pub fn load_into(&self, document: &mut Document) -> miette::Result<()> {
        load_document_from_reader(Cursor::new(self.content.as_slice()), document)?;
        document.set_reload_callback(self.reload_fn());
        ok!()
    }

    /// A reload callback that reads from this source, and records each call.
    pub fn reload_fn(&self) -> impl FnMut(u64, u32, &mut [u8]) -> bool + 'static {
        let content = Rc::clone(&self.content);
        let calls = Rc::clone(&self.calls);
        let fail_reloads = Rc::clone(&self.fail_reloads);
        move |file_offset, size, buffer| {
            calls.borrow_mut().push(ReloadCall { file_offset, size });
            if fail_reloads.get() {
                return false;
            }
            fill_block_from_reader(Cursor::new(content.as_slice()), file_offset, buffer)
        }
    }

    #[must_use]
    pub fn reload_calls(&self) -> Vec<ReloadCall> { self.calls.borrow().clone() }
}
