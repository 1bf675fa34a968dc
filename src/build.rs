use std::thread;
use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::error::Result;
use crate::job::Job;

/// Reference to one concrete execution of a job, identified by number.
///
/// A `Build` does not own its job: it borrows the [`Job`] that produced it,
/// so it can never outlive it or keep it alive. The core only needs two
/// things from a build: whether it is still running, and the ability to
/// block until it finishes.
pub struct Build<'a> {
    url: Url,
    number: u32,
    job: &'a Job,
}

#[derive(Deserialize)]
struct BuildFlags {
    #[serde(default)]
    building: bool,
}

impl<'a> Build<'a> {
    pub(crate) fn new(url: Url, number: u32, job: &'a Job) -> Self {
        Self { url, number, job }
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Asks the server whether this build is still executing.
    pub fn is_running(&self) -> Result<bool> {
        let status_url = self.url.join("api/json")?;
        let body = self.job.server().transport().get(status_url.as_str())?;
        let flags: BuildFlags = serde_json::from_str(&body)?;
        Ok(flags.building)
    }

    /// Sleeps the calling thread until the build finishes, re-polling the
    /// server every `poll_delay`. Unbounded: callers needing a timeout must
    /// wrap this themselves.
    pub fn block_until_complete(&self, poll_delay: Duration) -> Result<()> {
        while self.is_running()? {
            self.job.server().events().info(&format!(
                "build #{} of {} is still running, checking again in {}s",
                self.number,
                self.job.name(),
                poll_delay.as_secs()
            ));
            thread::sleep(poll_delay);
        }
        Ok(())
    }
}
