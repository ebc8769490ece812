#![allow(unused_macros)]

/// Helper macro for locking items, mapping a poisoned lock to [`crate::Error::LockError`]
///
/// ```rust, ignore
///  let mut slot = lock!(self.slot)?;
///  *slot = Some(layout);
/// ```
macro_rules! lock {
    ($lock:expr) => {
        $lock.lock().map_err(|_| crate::Error::LockError)
    };
}
