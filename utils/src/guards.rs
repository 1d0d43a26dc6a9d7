use std::ffi::OsString;

/// Sets an environment variable for the lifetime of the guard, restoring the previous value on drop.
///
/// Meant for tests; combine with `serial_test` since the process environment is shared between threads.
pub struct EnvVarGuard {
    name: String,
    previous: Option<OsString>,
}

impl EnvVarGuard {
    pub fn set(name: impl Into<String>, value: impl AsRef<str>) -> Self {
        let name = name.into();
        let previous = std::env::var_os(&name);
        // SAFETY: callers serialize access to the environment (see type docs).
        unsafe { std::env::set_var(&name, value.as_ref()) };
        Self { name, previous }
    }

    pub fn remove(name: impl Into<String>) -> Self {
        let name = name.into();
        let previous = std::env::var_os(&name);
        // SAFETY: callers serialize access to the environment (see type docs).
        unsafe { std::env::remove_var(&name) };
        Self { name, previous }
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        // SAFETY: callers serialize access to the environment (see type docs).
        unsafe {
            match self.previous.take() {
                Some(v) => std::env::set_var(&self.name, v),
                None => std::env::remove_var(&self.name),
            }
        }
    }
}
