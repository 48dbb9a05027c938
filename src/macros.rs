#![allow(unused_macros)]

/// Helper macro for locking items
///
/// ```rust, ignore
///  let mut active = lock!(self.active);
///  active.push(thread::current().id());
/// ```
macro_rules! lock {
    ($lock:expr) => {
        $lock.lock().expect("Failed to acquire lock")
    };
}

/// Helper macro for resolving the module behind a weak handle
///
/// ```rust, ignore
///  let module = upgrade_module!(self.module);
///  module.find_class(&class_id)?;
/// ```
macro_rules! upgrade_module {
    ($weak:expr) => {
        $weak.upgrade().ok_or(crate::Error::ModuleReleased)?
    };
}
