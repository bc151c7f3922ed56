use std::ffi::{OsStr, OsString};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use gradecast::app_dirs::CONFIG_HOME_ENV;

/// Serializes every test in a binary that touches the process environment.
static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Holds one environment variable at a test value; restores it on drop.
pub struct EnvVarGuard {
    key: &'static str,
    saved: Option<OsString>,
    _serial: MutexGuard<'static, ()>,
}

impl EnvVarGuard {
    pub fn set(key: &'static str, value: impl AsRef<OsStr>) -> Self {
        let serial = ENV_MUTEX.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let saved = std::env::var_os(key);
        // SAFETY: ENV_MUTEX is held, so no other test reads or writes the environment.
        unsafe { std::env::set_var(key, value) };
        Self {
            key,
            saved,
            _serial: serial,
        }
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        // SAFETY: ENV_MUTEX is still held until `_serial` drops after this body.
        unsafe {
            match self.saved.take() {
                Some(previous) => std::env::set_var(self.key, previous),
                None => std::env::remove_var(self.key),
            }
        }
    }
}

/// Anchor the `.gradecast` root under `base` for the guard's lifetime.
pub fn config_home(base: &Path) -> EnvVarGuard {
    EnvVarGuard::set(CONFIG_HOME_ENV, base)
}
