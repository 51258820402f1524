// Copyright (c) 2019-present Dmitry Stepanov and Fyrox Engine contributors.
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

//! Process-wide logger of the engine. Messages go to stdout, to an optional file and to every
//! registered listener channel. Call [`Log::set_file_name`] at startup to keep a log file.

use crate::parking_lot::Mutex;
use fxhash::FxHashMap;
use std::{
    fs::File,
    io::{self, Write},
    path::Path,
    sync::{mpsc::Sender, LazyLock},
    time::{Duration, Instant},
};

/// Copy of a logged message sent to listeners.
#[derive(Clone, Debug)]
pub struct LogMessage {
    pub kind: MessageKind,
    /// Message text without the kind prefix and the trailing new line.
    pub content: String,
    /// Time since the first use of the logger.
    pub time: Duration,
}

#[derive(Debug, Default, Copy, Clone, PartialOrd, PartialEq, Eq, Ord, Hash)]
pub enum MessageKind {
    #[default]
    Information,
    Warning,
    Error,
}

impl MessageKind {
    fn prefix(self) -> &'static str {
        match self {
            MessageKind::Information => "[INFO]",
            MessageKind::Warning => "[WARNING]",
            MessageKind::Error => "[ERROR]",
        }
    }
}

static LOG: LazyLock<Mutex<Log>> = LazyLock::new(|| {
    Mutex::new(Log {
        file: None,
        verbosity: MessageKind::Information,
        listeners: Vec::new(),
        started: Instant::now(),
        last_once: FxHashMap::default(),
    })
});

pub struct Log {
    file: Option<File>,
    verbosity: MessageKind,
    listeners: Vec<Sender<LogMessage>>,
    started: Instant,
    // Last text written for every "once" id.
    last_once: FxHashMap<usize, String>,
}

impl Log {
    /// Creates (or truncates) the log file. Errors are reported to stdout and the file sink stays
    /// disabled.
    pub fn set_file_name<P: AsRef<Path>>(path: P) {
        let file = File::create(path.as_ref());
        let mut log = LOG.lock();
        match file {
            Ok(file) => log.file = Some(file),
            Err(err) => {
                log.file = None;
                log.dispatch(
                    MessageKind::Error,
                    format!("Unable to create log file {}: {err}", path.as_ref().display()),
                );
            }
        }
    }

    /// Messages less important than `kind` are dropped.
    pub fn set_verbosity(kind: MessageKind) {
        LOG.lock().verbosity = kind;
    }

    pub fn verbosity() -> MessageKind {
        LOG.lock().verbosity
    }

    pub fn add_listener(listener: Sender<LogMessage>) {
        LOG.lock().listeners.push(listener)
    }

    fn dispatch(&mut self, kind: MessageKind, content: String) {
        let time = self.started.elapsed();
        let line = format!(
            "{} {:.3}s: {content}\n",
            kind.prefix(),
            time.as_secs_f32()
        );

        let _ = io::stdout().write_all(line.as_bytes());
        if let Some(file) = self.file.as_mut() {
            let _ = file.write_all(line.as_bytes()).and_then(|_| file.flush());
        }

        // Disconnected listeners are dropped.
        self.listeners.retain(|listener| {
            listener
                .send(LogMessage {
                    kind,
                    content: content.clone(),
                    time,
                })
                .is_ok()
        });
    }

    /// Writes a line if `kind` passes the verbosity filter.
    pub fn message<S: AsRef<str>>(kind: MessageKind, msg: S) {
        let mut log = LOG.lock();
        if kind >= log.verbosity {
            log.dispatch(kind, msg.as_ref().to_owned());
        }
    }

    /// Writes a line unless the previous message with the same `id` had the same text. Returns
    /// `true` if the message was written.
    pub fn message_once<S: AsRef<str>>(id: usize, kind: MessageKind, msg: S) -> bool {
        let mut log = LOG.lock();
        if kind < log.verbosity {
            return false;
        }
        let msg = msg.as_ref();
        if log.last_once.get(&id).is_some_and(|last| last == msg) {
            return false;
        }
        log.last_once.insert(id, msg.to_owned());
        log.dispatch(kind, msg.to_owned());
        true
    }

    pub fn info<S: AsRef<str>>(msg: S) {
        Self::message(MessageKind::Information, msg)
    }

    pub fn warn<S: AsRef<str>>(msg: S) {
        Self::message(MessageKind::Warning, msg)
    }

    pub fn err<S: AsRef<str>>(msg: S) {
        Self::message(MessageKind::Error, msg)
    }
}

/// Logs a formatted information line.
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        $crate::log::Log::info(format!($($arg)*))
    };
}

/// Logs a formatted warning line.
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::log::Log::warn(format!($($arg)*))
    };
}

/// Logs a formatted error line.
#[macro_export]
macro_rules! err {
    ($($arg:tt)*) => {
        $crate::log::Log::err(format!($($arg)*))
    };
}

/// Logs a formatted warning, repeated text with the same id is suppressed.
#[macro_export]
macro_rules! warn_once {
    ($id:expr, $($arg:tt)*) => {
        $crate::log::Log::message_once($id, $crate::log::MessageKind::Warning, format!($($arg)*))
    };
}

/// Logs a formatted error, repeated text with the same id is suppressed.
#[macro_export]
macro_rules! err_once {
    ($id:expr, $($arg:tt)*) => {
        $crate::log::Log::message_once($id, $crate::log::MessageKind::Error, format!($($arg)*))
    };
}

#[cfg(test)]
mod test {
    use super::{Log, MessageKind};
    use std::sync::mpsc::channel;

    // The logger is global, so everything that changes its settings lives in one test.
    #[test]
    fn test_listener_once_and_verbosity() {
        let (sender, receiver) = channel();
        Log::add_listener(sender);

        let id = 0xE3BE_0001;
        assert!(crate::warn_once!(id, "once-test {}", 1));
        assert!(!crate::warn_once!(id, "once-test {}", 1));
        assert!(crate::warn_once!(id, "once-test {}", 2));

        Log::set_verbosity(MessageKind::Error);
        crate::warn!("filtered-test");
        assert!(!crate::warn_once!(id + 1, "filtered-test"));
        crate::err!("kept-test {}", 404);
        Log::set_verbosity(MessageKind::Information);
        crate::info!("kept-test info");

        let messages = receiver
            .try_iter()
            .filter(|m| m.content.contains("-test"))
            .collect::<Vec<_>>();
        let contents = messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>();
        assert_eq!(
            contents,
            ["once-test 1", "once-test 2", "kept-test 404", "kept-test info"]
        );
        assert_eq!(messages[2].kind, MessageKind::Error);
        assert_eq!(Log::verbosity(), MessageKind::Information);
    }
}
