// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the exchange log kept by every [`DeviceSession`](`crate::gripper::session::DeviceSession`).
use std::collections::VecDeque;

use crate::exception::{ErrorKind, GripperResult};

/// Number of exchanges a session remembers unless configured otherwise.
pub const DEFAULT_LOG_SIZE: usize = 10;

/// One request/response pair as it went over the bus.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Bytes written to the channel.
    pub request: Vec<u8>,
    /// Bytes which arrived before the timeout, possibly fewer than expected.
    pub response: Vec<u8>,
    /// `None` if the exchange succeeded.
    pub error: Option<ErrorKind>,
}

impl Record {
    pub(crate) fn new(request: &[u8], response: &[u8], outcome: &GripperResult<()>) -> Self {
        Record {
            request: request.to_vec(),
            response: response.to_vec(),
            error: outcome.as_ref().err().map(|e| e.kind()),
        }
    }

    /// creates a string representation based on the debug formatter
    pub fn log(&self) -> String {
        format!("{:?}", self.clone())
    }
}

pub(crate) struct Logger {
    records: VecDeque<Record>,
    log_size: usize,
}

impl Logger {
    pub fn new(log_size: usize) -> Self {
        Logger {
            records: VecDeque::with_capacity(log_size),
            log_size,
        }
    }
    pub fn log(&mut self, record: Record) {
        if self.log_size == 0 {
            return;
        }
        if self.records.len() == self.log_size {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }
    /// Returns the records oldest first and empties the log.
    pub fn flush(&mut self) -> Vec<Record> {
        self.records.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exception::GripperException;

    fn record(tag: u8) -> Record {
        Record::new(&[tag], &[], &Ok(()))
    }

    #[test]
    fn keeps_only_the_newest_records() {
        let mut logger = Logger::new(3);
        for tag in 0..5 {
            logger.log(record(tag));
        }
        let tags: Vec<u8> = logger.flush().iter().map(|r| r.request[0]).collect();
        assert_eq!(tags, vec![2, 3, 4]);
        assert!(logger.flush().is_empty());
    }

    #[test]
    fn zero_sized_log_stays_empty() {
        let mut logger = Logger::new(0);
        logger.log(record(1));
        assert!(logger.flush().is_empty());
    }

    #[test]
    fn record_keeps_the_failure_kind() {
        let outcome = Err(GripperException::FramingError {
            expected: 8,
            received: 3,
        });
        let record = Record::new(&[1, 2], &[3, 4, 5], &outcome);
        assert_eq!(record.error, Some(ErrorKind::Framing));
        assert!(record.log().contains("Framing"));
    }
}
