// Byte-level transport seams. The board's USARTs implement these in main.rs; tests use buffers.

/// Outgoing byte stream (MIDI DIN port, console).
pub trait ByteSink {
    type Error;

    fn push_byte(&mut self, byte: u8) -> nb::Result<(), Self::Error>;

    /// Wait for anything buffered to leave the wire.
    fn drain(&mut self) {}
}

/// Incoming byte stream, polled without blocking.
pub trait ByteSource {
    type Error;

    fn pull_byte(&mut self) -> nb::Result<u8, Self::Error>;
}

/// Write all of `bytes`, blocking on each.
pub fn push_all<S: ByteSink>(sink: &mut S, bytes: &[u8]) -> Result<(), S::Error> {
    for &b in bytes {
        nb::block!(sink.push_byte(b))?;
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use alloc::collections::VecDeque;
    use alloc::vec::Vec;
    use core::convert::Infallible;

    /// Sink that reports `WouldBlock` every other call, to exercise blocking writes.
    #[derive(Default)]
    pub struct StutterSink {
        pub bytes: Vec<u8>,
        ready: bool,
    }

    impl ByteSink for StutterSink {
        type Error = Infallible;

        fn push_byte(&mut self, byte: u8) -> nb::Result<(), Infallible> {
            self.ready = !self.ready;
            if !self.ready {
                return Err(nb::Error::WouldBlock);
            }
            self.bytes.push(byte);
            Ok(())
        }
    }

    #[derive(Default)]
    pub struct QueueSource {
        pub bytes: VecDeque<u8>,
    }

    impl QueueSource {
        pub fn new(data: &[u8]) -> Self {
            Self { bytes: data.iter().copied().collect() }
        }
    }

    impl ByteSource for QueueSource {
        type Error = Infallible;

        fn pull_byte(&mut self) -> nb::Result<u8, Infallible> {
            self.bytes.pop_front().ok_or(nb::Error::WouldBlock)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::*;
    use super::*;

    #[test]
    fn push_all_waits_out_wouldblock() {
        let mut sink = StutterSink::default();
        push_all(&mut sink, &[0x99, 36, 77]).unwrap();

        assert_eq!(sink.bytes, [0x99, 36, 77]);
    }

    #[test]
    fn queue_source_runs_dry() {
        let mut src = QueueSource::new(&[1]);
        assert_eq!(src.pull_byte(), Ok(1));
        assert_eq!(src.pull_byte(), Err(nb::Error::WouldBlock));
    }
}
