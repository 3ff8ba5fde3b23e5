//! Ctrl-C handling.
//!
//! The first SIGINT sets the shared flag, which cancels the turn in flight. A
//! second SIGINT while the flag is still set falls through to the default action
//! and terminates the process.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chat_api::CancellationSignal;

#[derive(Debug, Clone)]
pub struct Interrupt {
    flag: CancellationSignal,
}

impl Interrupt {
    /// A flag with no signal handler attached.
    pub fn detached() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    #[cfg(unix)]
    pub fn install() -> io::Result<Self> {
        use signal_hook::consts::SIGINT;
        use signal_hook::flag;

        let interrupt = Self::detached();
        // Order matters: the conditional default must see the flag before it is set.
        flag::register_conditional_default(SIGINT, Arc::clone(&interrupt.flag))?;
        flag::register(SIGINT, Arc::clone(&interrupt.flag))?;
        Ok(interrupt)
    }

    #[cfg(not(unix))]
    pub fn install() -> io::Result<Self> {
        Ok(Self::detached())
    }

    pub fn signal(&self) -> CancellationSignal {
        Arc::clone(&self.flag)
    }

    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    pub fn trigger(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn reset(&self) {
        self.flag.store(false, Ordering::Release);
    }
}
