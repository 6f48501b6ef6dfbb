// Diagnostic text output. Lines go to whatever ufmt sink the board hands us (USB serial on the
// Mega); a failing or missing console must never stop the scan loop, so write errors are dropped.

use core::convert::Infallible;
use ufmt::uWrite;

/// Write one diagnostic line, discarding sink errors.
#[macro_export]
macro_rules! diag {
    ($log:expr, $($arg:tt)*) => {{
        let _ = ufmt::uwriteln!($log, $($arg)*);
    }};
}

/// Sink that swallows everything (quiet builds, tests that don't care about text).
#[derive(Default, Clone, Copy, Debug)]
pub struct NullLog;

impl uWrite for NullLog {
    type Error = Infallible;

    fn write_str(&mut self, _s: &str) -> Result<(), Infallible> {
        Ok(())
    }
}
