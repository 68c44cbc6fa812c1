//! We use this mocking module in unit tests to emulate the serial link to the companion app.

/// Our mock type used to emulate a serial port.
pub struct MockSerial {
    /// Everything the controller sent.
    write_buffer: heapless::Vec<u8, 4096>,
    /// Bytes waiting to be received by the controller.
    read_buffer: heapless::Deque<u8, 256>,
    /// Flag to simulate write errors
    should_error_on_write: bool,
    /// Flag to simulate read errors
    should_error_on_read: bool,
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum MockSerialError {
    /// Simulated buffer overflow
    #[error("Mock serial buffer overflow")]
    BufferOverflow,
    /// Generic simulated error for testing
    #[error("Simulated serial error")]
    SimulatedError,
}

impl embedded_io::Error for MockSerialError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            MockSerialError::BufferOverflow => embedded_io::ErrorKind::OutOfMemory,
            MockSerialError::SimulatedError => embedded_io::ErrorKind::Other,
        }
    }
}

impl embedded_io::ErrorType for MockSerial {
    type Error = MockSerialError;
}

impl embedded_io::Write for MockSerial {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        if self.should_error_on_write {
            return Err(MockSerialError::SimulatedError);
        }
        self.write_buffer
            .extend_from_slice(buf)
            .map_err(|_| MockSerialError::BufferOverflow)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        if self.should_error_on_write {
            return Err(MockSerialError::SimulatedError);
        }
        Ok(())
    }
}

impl embedded_io::Read for MockSerial {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if self.should_error_on_read {
            return Err(MockSerialError::SimulatedError);
        }
        let mut count = 0;
        while count < buf.len() {
            match self.read_buffer.pop_front() {
                Some(byte) => {
                    buf[count] = byte;
                    count += 1;
                }
                None => break,
            }
        }
        Ok(count)
    }
}

impl embedded_io::ReadReady for MockSerial {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        if self.should_error_on_read {
            return Err(MockSerialError::SimulatedError);
        }
        Ok(!self.read_buffer.is_empty())
    }
}

impl MockSerial {
    /// Create a new MockSerial instance with empty buffers
    pub fn new() -> Self {
        Self {
            write_buffer: heapless::Vec::new(),
            read_buffer: heapless::Deque::new(),
            should_error_on_write: false,
            should_error_on_read: false,
        }
    }

    /// Queue bytes as if the app had sent them.
    pub fn send(&mut self, data: &[u8]) -> Result<(), MockSerialError> {
        for &byte in data {
            self.read_buffer
                .push_back(byte)
                .map_err(|_| MockSerialError::BufferOverflow)?;
        }
        Ok(())
    }

    /// Get a reference to the data that was written to this mock serial port
    pub fn written_data(&self) -> &[u8] {
        &self.write_buffer
    }

    /// Written data split into lines, terminators removed.
    pub fn written_lines(&self) -> impl Iterator<Item = &str> {
        core::str::from_utf8(&self.write_buffer)
            .unwrap_or("")
            .lines()
    }

    /// Clear the write buffer
    pub fn clear_written_data(&mut self) {
        self.write_buffer.clear();
    }

    /// Configure whether write operations should fail with an error
    pub fn set_write_error(&mut self, should_error: bool) {
        self.should_error_on_write = should_error;
    }

    /// Configure whether read operations should fail with an error
    pub fn set_read_error(&mut self, should_error: bool) {
        self.should_error_on_read = should_error;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_io::{Read, ReadReady, Write};

    #[test]
    fn test_sent_bytes_are_read_in_order() {
        let mut mock = MockSerial::new();
        mock.send(b"gr").unwrap();
        mock.send(b"id\n").unwrap();
        assert!(mock.read_ready().unwrap());

        let mut buffer = [0u8; 3];
        assert_eq!(mock.read(&mut buffer).unwrap(), 3);
        assert_eq!(&buffer, b"gri");
        assert_eq!(mock.read(&mut buffer).unwrap(), 2);
        assert_eq!(&buffer[..2], b"d\n");
        assert!(!mock.read_ready().unwrap());
    }

    #[test]
    fn test_written_lines() {
        let mut mock = MockSerial::new();
        mock.write_all(b"manual\n{}\n").unwrap();
        {
            let lines: heapless::Vec<&str, 4> = mock.written_lines().collect();
            assert_eq!(lines.as_slice(), &["manual", "{}"]);
        }

        mock.clear_written_data();
        assert!(mock.written_data().is_empty());
    }

    #[test]
    fn test_error_simulation() {
        let mut mock = MockSerial::new();
        mock.set_write_error(true);
        assert_eq!(mock.write(b"test"), Err(MockSerialError::SimulatedError));
        assert_eq!(mock.flush(), Err(MockSerialError::SimulatedError));
        assert!(mock.written_data().is_empty());

        mock.set_read_error(true);
        assert!(mock.read_ready().is_err());
    }
}
