//! Containment of panics raised by message codecs.
//!
//! Codecs are user supplied and see zero-filled, possibly garbled buffers. A
//! panic inside one must cost a single group, not the consumer loop.

use std::{
    any::Any,
    fmt,
    panic::{AssertUnwindSafe, catch_unwind},
};

/// Panic payload captured from a codec call.
///
/// Displays the payload when it is a string and a placeholder otherwise.
///
/// ```
/// use downlink::panic::contain;
///
/// let caught = contain(|| -> u32 { panic!("bad length prefix") }).expect_err("panicked");
/// assert_eq!(caught.to_string(), "bad length prefix");
/// assert_eq!(contain(|| 7).expect("no panic"), 7);
/// ```
#[must_use]
pub struct CaughtPanic(Box<dyn Any + Send>);

impl CaughtPanic {
    /// Borrow the payload text when the panic carried a string.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.0
            .downcast_ref::<String>()
            .map(String::as_str)
            .or_else(|| self.0.downcast_ref::<&'static str>().copied())
    }
}

impl fmt::Display for CaughtPanic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message().unwrap_or("<non-string panic payload>"))
    }
}

impl fmt::Debug for CaughtPanic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CaughtPanic").field(&self.to_string()).finish()
    }
}

/// Run `f`, converting a panic into [`CaughtPanic`].
///
/// Codec state is not inspected after a panic; callers drop the group being
/// processed and continue with the next one.
///
/// # Errors
///
/// Returns the captured payload if `f` panicked.
pub fn contain<T>(f: impl FnOnce() -> T) -> Result<T, CaughtPanic> {
    catch_unwind(AssertUnwindSafe(f)).map_err(CaughtPanic)
}
