//! Event sources.
//!
//! A source delivers market events one at a time; the runner pulls from it and
//! runs each event's cascade to completion before asking for the next one.

use openbook_core::{Error, MarketEvent, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::Path;
use tracing::{debug, info};

/// A stream of raw market events.
pub trait EventSource {
    /// Attach the source to its endpoint.
    fn connect(&mut self, endpoint: &str) -> Result<()>;

    /// Next event, or `None` once the source is exhausted or shut down.
    fn next_event(&mut self) -> Result<Option<MarketEvent>>;
}

impl<S: EventSource + ?Sized> EventSource for Box<S> {
    fn connect(&mut self, endpoint: &str) -> Result<()> {
        (**self).connect(endpoint)
    }

    fn next_event(&mut self) -> Result<Option<MarketEvent>> {
        (**self).next_event()
    }
}

/// Replays recorded market events, one JSON object per line.
pub struct ReplaySource<R> {
    reader: R,
    /// Line buffer reused across reads.
    line: String,
    /// 1-based number of the last line read.
    line_no: usize,
    /// Events yielded so far.
    events: u64,
}

impl ReplaySource<BufReader<File>> {
    /// Open a JSON-lines file for replay.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> ReplaySource<R> {
    /// Replay from any buffered reader (a file, stdin, an in-memory buffer).
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            line_no: 0,
            events: 0,
        }
    }

    /// Number of events yielded so far.
    pub fn events_read(&self) -> u64 {
        self.events
    }
}

impl<R: BufRead> EventSource for ReplaySource<R> {
    fn connect(&mut self, endpoint: &str) -> Result<()> {
        info!(endpoint, "Replay source ignores endpoint, reading recorded events");
        Ok(())
    }

    fn next_event(&mut self) -> Result<Option<MarketEvent>> {
        loop {
            self.line.clear();
            let read = match self.reader.read_line(&mut self.line) {
                Ok(read) => read,
                // The bad line is consumed; the next call resumes after it.
                Err(e) if e.kind() == ErrorKind::InvalidData => {
                    self.line_no += 1;
                    return Err(Error::data(format!("line {}: invalid UTF-8", self.line_no)));
                }
                Err(e) => return Err(e.into()),
            };
            if read == 0 {
                debug!(events = self.events, "Replay exhausted");
                return Ok(None);
            }
            self.line_no += 1;

            let text = self.line.trim();
            if text.is_empty() {
                continue;
            }

            let event: MarketEvent = serde_json::from_str(text)
                .map_err(|e| Error::data(format!("line {}: {}", self.line_no, e)))?;
            self.events += 1;
            return Ok(Some(event));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openbook_core::EventKind;
    use std::io::Cursor;

    const RECORDED: &str = r#"{"type":"depth","seq":1,"ts_ms":1000,"bids":[{"price":100.0,"amount":1.0}],"asks":[{"price":102.0,"amount":1.0}]}

{"type":"trade","ts_ms":1001,"price":101.0,"size":0.5}
"#;

    #[test]
    fn test_replay_yields_events_in_order() {
        let mut source = ReplaySource::new(Cursor::new(RECORDED));
        source.connect("replay").unwrap();

        let first = source.next_event().unwrap().unwrap();
        assert_eq!(first.kind(), EventKind::Depth);
        let second = source.next_event().unwrap().unwrap();
        assert_eq!(second.kind(), EventKind::Trade);
        assert!(source.next_event().unwrap().is_none());
        assert_eq!(source.events_read(), 2);
    }

    #[test]
    fn test_malformed_line_reports_line_number() {
        let input = "{\"type\":\"trade\",\"ts_ms\":1,\"price\":1.0,\"size\":1.0}\n{broken\n";
        let mut source = ReplaySource::new(Cursor::new(input));
        assert!(source.next_event().unwrap().is_some());

        let err = source.next_event().unwrap_err();
        match err {
            Error::Data(msg) => assert!(msg.starts_with("line 2")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_invalid_utf8_line_is_skippable() {
        let mut input = b"{\"type\":\"trade\",\"ts_ms\":1,\"price\":1.0,\"size\":1.0}\n".to_vec();
        input.extend_from_slice(b"\xff\xfe garbage\n");
        input.extend_from_slice(b"{\"type\":\"trade\",\"ts_ms\":2,\"price\":2.0,\"size\":1.0}\n");
        let mut source = ReplaySource::new(Cursor::new(input));
        assert!(source.next_event().unwrap().is_some());

        let err = source.next_event().unwrap_err();
        assert!(err.is_per_event());
        match err {
            Error::Data(msg) => assert_eq!(msg, "line 2: invalid UTF-8"),
            other => panic!("unexpected error: {other}"),
        }

        let next = source.next_event().unwrap().unwrap();
        assert_eq!(next.ts_ms(), 2);
        assert!(source.next_event().unwrap().is_none());
    }

    #[test]
    fn test_boxed_source_delegates() {
        let mut source: Box<dyn EventSource> = Box::new(ReplaySource::new(Cursor::new(RECORDED)));
        assert!(source.next_event().unwrap().is_some());
    }
}
