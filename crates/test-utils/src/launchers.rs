use std::io;

use adminagent::engine::{Job, Launcher, SystemLauncher};
use tokio::process::Child;

/// Launcher that refuses jobs whose command line contains `needle` and
/// starts all others for real.
pub struct FailingLauncher {
    needle: String,
}

impl FailingLauncher {
    pub fn new(needle: impl Into<String>) -> Self {
        Self {
            needle: needle.into(),
        }
    }
}

impl Launcher for FailingLauncher {
    fn launch(&self, job: &Job) -> io::Result<Child> {
        if job.command().to_string().contains(&self.needle) {
            return Err(io::Error::from_raw_os_error(11));
        }
        SystemLauncher.launch(job)
    }
}
