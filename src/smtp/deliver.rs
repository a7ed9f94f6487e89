//! Delivery sinks for accepted messages
//!
//! The server hands each completed [`Email`] to a sink keyed by the
//! distinct recipient domains. Sinks are the only resource shared between
//! session workers, so they serialize their own writes; a sink failure is
//! session-fatal and never turns into a protocol reply.

use crate::smtp::email::Email;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::mpsc;

/// Destination for completed messages
pub trait MailSink: Send + Sync {
    fn deliver(&self, email: &Email) -> io::Result<()>;
}

/// Appends rendered messages to one file per recipient domain
///
/// Recipients sharing a domain share one destination file. Writes are
/// serialized by an internal mutex so concurrent sessions cannot
/// interleave within a mailbox file.
#[derive(Debug)]
pub struct FileSink {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl FileSink {
    pub fn new(root: impl AsRef<Path>) -> io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    /// The mailbox file backing a domain
    pub fn mailbox_path(&self, domain: &str) -> PathBuf {
        self.root.join(domain)
    }
}

impl MailSink for FileSink {
    fn deliver(&self, email: &Email) -> io::Result<()> {
        let rendered = email.render();
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| io::Error::other("mailbox lock poisoned"))?;
        for domain in email.domains() {
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(self.mailbox_path(&domain))?;
            file.write_all(rendered.as_bytes())?;
        }
        Ok(())
    }
}

/// Forwards accepted messages over an mpsc channel
///
/// Useful for embedding the server in tests: the receiving end observes
/// every message the dialog accepted.
#[derive(Debug)]
pub struct ChannelSink {
    tx: Mutex<mpsc::Sender<Email>>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<Email>) -> Self {
        Self { tx: Mutex::new(tx) }
    }
}

impl MailSink for ChannelSink {
    fn deliver(&self, email: &Email) -> io::Result<()> {
        let tx = self
            .tx
            .lock()
            .map_err(|_| io::Error::other("channel lock poisoned"))?;
        tx.send(email.clone())
            .map_err(|_| io::Error::other("no receiver for delivered message"))
    }
}
