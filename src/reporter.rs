//! Difference reporter
//!
//! Receives forwarded values, differences each against the previously
//! received one and writes the result as a decimal text line.

use core::fmt::Write as _;

use embedded_io_async::Write;
use heapless::String;

use crate::channels::OutputQueue;
use crate::config::{LINE_TERMINATOR, REPORT_BANNER, REPORT_LINE_LEN};

/// Transport that accepts whole lines of text; the sink adds the line terminator
#[allow(async_fn_in_trait)]
pub trait LineSink {
    type Error;

    async fn send_line(&mut self, line: &str) -> Result<(), Self::Error>;
}

/// [`LineSink`] over any async byte writer, e.g. a buffered UART transmitter
pub struct IoSink<W> {
    writer: W,
}

impl<W: Write> IoSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> LineSink for IoSink<W> {
    type Error = W::Error;

    async fn send_line(&mut self, line: &str) -> Result<(), Self::Error> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(LINE_TERMINATOR.as_bytes()).await?;
        self.writer.flush().await
    }
}

pub struct Reporter {
    previous: u16,
}

impl Reporter {
    pub const fn new() -> Self {
        Self { previous: 0 }
    }

    pub fn previous(&self) -> u16 {
        self.previous
    }

    /// Difference against the previous value in 16-bit modular arithmetic,
    /// then adopt `current` as the new baseline. The first call after startup
    /// differences against 0.
    pub fn difference(&mut self, current: u16) -> i16 {
        let difference = current.wrapping_sub(self.previous) as i16;
        self.previous = current;
        difference
    }

    /// Difference `current` and send it to `sink`.
    ///
    /// The baseline advances even if the transport fails, so the next line is
    /// still relative to the last value received.
    pub async fn report<S: LineSink>(&mut self, current: u16, sink: &mut S) -> Result<i16, S::Error> {
        let difference = self.difference(current);
        sink.send_line(&format_difference(difference)).await?;
        Ok(difference)
    }

    /// Emit the banner, then report every value arriving on `output`
    pub async fn run<S: LineSink>(mut self, output: &OutputQueue, mut sink: S) {
        info!("Reporter started");

        if sink.send_line(REPORT_BANNER).await.is_err() {
            warn!("Failed to send report banner");
        }

        loop {
            let current = output.receive().await;
            match self.report(current, &mut sink).await {
                Ok(difference) => debug!("Reported {} (value {})", difference, current),
                Err(_) => warn!("Failed to send difference for value {}", current),
            }
        }
    }
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Decimal text of a difference, without terminator
pub fn format_difference(difference: i16) -> String<REPORT_LINE_LEN> {
    let mut line = String::new();
    // i16 needs at most 6 characters
    let _ = write!(line, "{}", difference);
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use embassy_futures::block_on;
    use embedded_io_async::ErrorType;

    #[derive(Default)]
    struct ByteSink {
        bytes: std::vec::Vec<u8>,
        flushes: usize,
    }

    impl ErrorType for ByteSink {
        type Error = Infallible;
    }

    impl Write for ByteSink {
        async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
            self.bytes.extend_from_slice(buf);
            Ok(buf.len())
        }

        async fn flush(&mut self) -> Result<(), Self::Error> {
            self.flushes += 1;
            Ok(())
        }
    }

    struct FailingSink;

    impl LineSink for FailingSink {
        type Error = ();

        async fn send_line(&mut self, _line: &str) -> Result<(), ()> {
            Err(())
        }
    }

    #[test]
    fn first_difference_is_against_zero() {
        let mut reporter = Reporter::new();
        assert_eq!(reporter.difference(120), 120);
    }

    #[test]
    fn successive_differences_are_signed() {
        let mut reporter = Reporter::new();
        let diffs: std::vec::Vec<i16> = [120, 150, 130].iter().map(|&v| reporter.difference(v)).collect();
        assert_eq!(diffs, [120, 30, -20]);
        assert_eq!(reporter.previous(), 130);
    }

    #[test]
    fn difference_wraps_at_sixteen_bits() {
        let mut reporter = Reporter::new();
        reporter.difference(0);
        assert_eq!(reporter.difference(u16::MAX), -1);
        assert_eq!(reporter.difference(0x7FFF), i16::MIN);
    }

    #[test]
    fn lines_are_decimal_with_crlf() {
        let mut sink = IoSink::new(ByteSink::default());
        let mut reporter = Reporter::new();

        block_on(async {
            reporter.report(120, &mut sink).await.unwrap();
            reporter.report(100, &mut sink).await.unwrap();
        });

        let inner = sink.into_inner();
        assert_eq!(inner.bytes, b"120\r\n-20\r\n");
        assert_eq!(inner.flushes, 2);
    }

    #[test]
    fn transport_failure_still_advances_baseline() {
        let mut reporter = Reporter::new();
        let result = block_on(reporter.report(50, &mut FailingSink));
        assert_eq!(result, Err(()));
        assert_eq!(reporter.previous(), 50);
    }

    #[test]
    fn format_extremes_fit_line_buffer() {
        assert_eq!(format_difference(i16::MIN).as_str(), "-32768");
        assert_eq!(format_difference(0).as_str(), "0");
    }
}
