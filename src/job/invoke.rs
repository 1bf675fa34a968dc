use std::thread;
use std::time::Duration;

use url::form_urlencoded;
use url::Url;

use crate::error::{Error, Result};
use crate::job::Job;

/// One trigger request: everything `invoke` needs to know, nothing kept
/// afterward.
#[derive(Debug, Clone)]
pub struct InvokeParams {
    /// Security token injected into the trigger URL when the server
    /// requires one.
    pub security_token: Option<String>,
    /// Build parameters; a non-empty list routes the trigger through the
    /// parameterized endpoint.
    pub build_params: Vec<(String, String)>,
    /// Wait for the triggered build to start and finish instead of
    /// returning after a single status check.
    pub block: bool,
    /// Only changes which duplicate-trigger warning is logged when the job
    /// is already running; the trigger request is submitted either way.
    pub skip_if_running: bool,
    /// Grace period after the trigger request, giving the server time to
    /// reflect the new queue state.
    pub pre_check_delay: Duration,
    /// Sleep between queue polls while blocking.
    pub block_delay: Duration,
}

impl Default for InvokeParams {
    fn default() -> Self {
        Self {
            security_token: None,
            build_params: Vec::new(),
            block: false,
            skip_if_running: false,
            pre_check_delay: Duration::from_secs(3),
            block_delay: Duration::from_secs(15),
        }
    }
}

impl Job {
    /// The endpoint a trigger request goes to: `build` when unauthenticated
    /// and parameterless, `buildWithParameters?...` when parameters are
    /// given (the token rides along as a parameter), `build?token=...` for a
    /// bare token.
    pub fn trigger_url(
        &self,
        token: Option<&str>,
        params: &[(String, String)],
    ) -> Result<Url> {
        let relative = if token.is_none() && params.is_empty() {
            "build".to_string()
        } else if !params.is_empty() {
            let mut serializer = form_urlencoded::Serializer::new(String::new());
            serializer.extend_pairs(params);
            if let Some(token) = token {
                serializer.append_pair("token", token);
            }
            format!("buildWithParameters?{}", serializer.finish())
        } else {
            let query = form_urlencoded::Serializer::new(String::new())
                .append_pair("token", token.unwrap_or_default())
                .finish();
            format!("build?{query}")
        };
        Ok(self.base_url().join(&relative)?)
    }

    /// Requests a new build of this job.
    ///
    /// The server is authoritative for every state transition here: queued
    /// and running are observed by re-polling, never tracked locally.
    ///
    /// Non-blocking mode checks the job status once after the trigger and
    /// fails with [`Error::InvocationFailed`] if the job neither queued,
    /// started, nor completed. Blocking mode waits out the queue (unbounded,
    /// sleeping `block_delay` between polls), waits for the running build to
    /// finish, and then requires the last build number to have advanced past
    /// the pre-trigger baseline.
    ///
    /// Known quirk, kept intentionally: `skip_if_running` does not suppress
    /// the trigger request when the job is already running, it only swaps
    /// the warning that is reported. Callers wanting a real skip must check
    /// [`is_running`](Job::is_running) themselves first.
    pub fn invoke(&mut self, params: InvokeParams) -> Result<()> {
        if self.is_queued()? {
            self.server().events().warn(&format!(
                "will not request new build because {} is already queued",
                self.name()
            ));
        } else if self.is_running()? {
            if params.skip_if_running {
                self.server().events().warn(&format!(
                    "will not request new build because {} is already running",
                    self.name()
                ));
            } else {
                self.server().events().warn(&format!(
                    "will re-schedule {} even though it is already running",
                    self.name()
                ));
            }
        }

        // Baseline for detecting that the trigger actually produced a build.
        let original_build_number = self.last_build_number();

        self.server().events().info(&format!(
            "attempting to start {} on {}",
            self.name(),
            self.server().base_url()
        ));
        let trigger_url =
            self.trigger_url(params.security_token.as_deref(), &params.build_params)?;
        let response = self.server().transport().get(trigger_url.as_str())?;
        if response.is_empty() {
            return Err(Error::InvocationFailed {
                job: self.name().to_string(),
                reason: "trigger returned an empty response".to_string(),
            });
        }

        if params.pre_check_delay > Duration::ZERO {
            self.server().events().info(&format!(
                "waiting {}s to allow the server to catch up",
                params.pre_check_delay.as_secs()
            ));
            thread::sleep(params.pre_check_delay);
        }

        if params.block {
            self.block_until_new_build(original_build_number, &params)
        } else {
            self.report_once(original_build_number)
        }
    }

    fn block_until_new_build(
        &mut self,
        original_build_number: Option<u32>,
        params: &InvokeParams,
    ) -> Result<()> {
        let mut total_wait = Duration::ZERO;
        while self.is_queued()? {
            self.server().events().info(&format!(
                "waited {}s for {} to begin",
                total_wait.as_secs(),
                self.name()
            ));
            thread::sleep(params.block_delay);
            total_wait += params.block_delay;
        }
        if self.is_running()? {
            let running_build = self.last_build()?;
            running_build.block_until_complete(params.pre_check_delay)?;
        }
        if self.last_build_number() <= original_build_number {
            return Err(Error::InvocationFailed {
                job: self.name().to_string(),
                reason: "the job does not appear to have run".to_string(),
            });
        }
        Ok(())
    }

    fn report_once(&mut self, original_build_number: Option<u32>) -> Result<()> {
        if self.is_queued()? {
            self.server()
                .events()
                .info(&format!("{} has been queued", self.name()));
        } else if self.is_running()? {
            self.server()
                .events()
                .info(&format!("{} is running", self.name()));
        } else if original_build_number < self.last_build_number() {
            self.server()
                .events()
                .info(&format!("{} has completed", self.name()));
        } else {
            return Err(Error::InvocationFailed {
                job: self.name().to_string(),
                reason: "the job did not schedule".to_string(),
            });
        }
        Ok(())
    }
}
