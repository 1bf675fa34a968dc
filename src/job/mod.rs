mod config;
mod invoke;
mod scm;

pub use invoke::InvokeParams;
pub use scm::ScmKind;

use serde::Deserialize;
use url::Url;

use crate::build::Build;
use crate::error::{Error, Result};
use crate::server::Server;
use config::ConfigCache;

/// A build-definition resource on the server.
///
/// Holds the last fetched status snapshot plus a lazily loaded config
/// document. The snapshot is only refreshed by [`poll`](Job::poll) or by the
/// queue/run predicates, which always re-poll before answering: the server,
/// not this struct, is authoritative for queue and run state.
///
/// Not designed for concurrent re-entry: the status snapshot and the config
/// cache are plain mutable fields, and duplicate triggers from concurrent
/// callers are only ever logged, never prevented.
pub struct Job {
    server: Server,
    name: String,
    base_url: Url,
    status: JobStatus,
    config: ConfigCache,
}

/// Server-reported job fields, as served by the job's `api/json` endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobStatus {
    pub in_queue: bool,
    pub last_build: Option<BuildPointer>,
    pub last_successful_build: Option<BuildPointer>,
    pub last_completed_build: Option<BuildPointer>,
    pub builds: Option<Vec<BuildPointer>>,
    pub upstream_projects: Vec<ProjectPointer>,
    pub downstream_projects: Vec<ProjectPointer>,
    pub queue_item: Option<QueueItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BuildPointer {
    pub number: u32,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectPointer {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueueItem {
    pub id: u64,
}

impl Job {
    pub(crate) fn fetch(server: Server, name: &str) -> Result<Self> {
        let base_url = server.base_url().join(&format!("job/{name}/"))?;
        let status = Self::fetch_status(&server, &base_url)?;
        Ok(Self {
            server,
            name: name.to_string(),
            base_url,
            status,
            config: ConfigCache::Unloaded,
        })
    }

    fn fetch_status(server: &Server, base_url: &Url) -> Result<JobStatus> {
        let status_url = base_url.join("api/json")?;
        let body = server.transport().get(status_url.as_str())?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Refreshes the cached status snapshot from the server.
    pub fn poll(&mut self) -> Result<()> {
        self.status = Self::fetch_status(&self.server, &self.base_url)?;
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn status(&self) -> &JobStatus {
        &self.status
    }

    pub(crate) fn server(&self) -> &Server {
        &self.server
    }

    /// True if a trigger has been accepted but execution has not started.
    /// Always re-polls before answering.
    pub fn is_queued(&mut self) -> Result<bool> {
        self.poll()?;
        Ok(self.status.in_queue)
    }

    /// True if the job's last build is still executing. Always re-polls, and
    /// delegates to the build's own running flag rather than comparing build
    /// numbers. A job with no build data yet is reported as not running.
    pub fn is_running(&mut self) -> Result<bool> {
        self.poll()?;
        match self.last_build() {
            Ok(build) => build.is_running(),
            Err(Error::NoBuildData(_)) => {
                self.server.events().info(&format!(
                    "no build info available for {}, assuming not running",
                    self.name
                ));
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    pub fn is_queued_or_running(&mut self) -> Result<bool> {
        Ok(self.is_queued()? || self.is_running()?)
    }

    fn pointer_number(pointer: &Option<BuildPointer>) -> Option<u32> {
        pointer.as_ref().map(|p| p.number)
    }

    /// Number of the most recent build, or `None` if the job never built.
    pub fn last_build_number(&self) -> Option<u32> {
        Self::pointer_number(&self.status.last_build)
    }

    pub fn last_good_build_number(&self) -> Option<u32> {
        Self::pointer_number(&self.status.last_successful_build)
    }

    pub fn last_completed_build_number(&self) -> Option<u32> {
        Self::pointer_number(&self.status.last_completed_build)
    }

    fn build_from_pointer(&self, pointer: &BuildPointer) -> Result<Build<'_>> {
        let mut url = Url::parse(&pointer.url)?;
        if !url.path().ends_with('/') {
            url.set_path(&format!("{}/", url.path()));
        }
        Ok(Build::new(url, pointer.number, self))
    }

    /// The most recent build, finished or not.
    pub fn last_build(&self) -> Result<Build<'_>> {
        match &self.status.last_build {
            Some(pointer) => self.build_from_pointer(pointer),
            None => Err(Error::NoBuildData(self.name.clone())),
        }
    }

    pub fn last_good_build(&self) -> Result<Build<'_>> {
        match &self.status.last_successful_build {
            Some(pointer) => self.build_from_pointer(pointer),
            None => Err(Error::NoBuildData(self.name.clone())),
        }
    }

    pub fn last_completed_build(&self) -> Result<Build<'_>> {
        match &self.status.last_completed_build {
            Some(pointer) => self.build_from_pointer(pointer),
            None => Err(Error::NoBuildData(self.name.clone())),
        }
    }

    fn known_builds(&self) -> Result<&[BuildPointer]> {
        self.status
            .builds
            .as_deref()
            .ok_or_else(|| Error::NoBuildData(self.name.clone()))
    }

    /// Looks up one build by number through the job's build list.
    pub fn build(&self, number: u32) -> Result<Build<'_>> {
        let pointer = self
            .known_builds()?
            .iter()
            .find(|b| b.number == number)
            .ok_or_else(|| Error::NotFound(format!("build #{number} of job \"{}\"", self.name)))?;
        self.build_from_pointer(pointer)
    }

    /// All known build numbers, newest first.
    pub fn build_ids(&self) -> Result<Vec<u32>> {
        let mut ids: Vec<u32> = self.known_builds()?.iter().map(|b| b.number).collect();
        ids.sort_unstable_by(|a, b| b.cmp(a));
        Ok(ids)
    }

    pub fn upstream_job_names(&self) -> Vec<String> {
        self.status
            .upstream_projects
            .iter()
            .map(|p| p.name.clone())
            .collect()
    }

    pub fn downstream_job_names(&self) -> Vec<String> {
        self.status
            .downstream_projects
            .iter()
            .map(|p| p.name.clone())
            .collect()
    }

    /// Resolves every upstream project name into a [`Job`] through the
    /// owning server handle.
    pub fn upstream_jobs(&self) -> Result<Vec<Job>> {
        self.upstream_job_names()
            .iter()
            .map(|name| self.server.job(name))
            .collect()
    }

    pub fn downstream_jobs(&self) -> Result<Vec<Job>> {
        self.downstream_job_names()
            .iter()
            .map(|name| self.server.job(name))
            .collect()
    }

    pub fn enable(&self) -> Result<()> {
        let url = self.base_url.join("enable")?;
        self.server.transport().post(url.as_str(), "")?;
        Ok(())
    }

    pub fn disable(&self) -> Result<()> {
        let url = self.base_url.join("disable")?;
        self.server.transport().post(url.as_str(), "")?;
        Ok(())
    }

    /// Cancels this job's queued item.
    ///
    /// Returns [`Error::NotInQueue`] if the job is not queued. The server
    /// answers the cancel request with a 404 even on success, so that one
    /// status is swallowed here; every other failure propagates.
    pub fn cancel_from_queue(&mut self) -> Result<()> {
        if !self.is_queued()? {
            return Err(Error::NotInQueue(self.name.clone()));
        }
        let item_id = self
            .status
            .queue_item
            .as_ref()
            .map(|item| item.id)
            .ok_or_else(|| Error::NotInQueue(self.name.clone()))?;
        let cancel_url = self.server.queue()?.cancel_url(item_id)?;
        match self.server.transport().post(cancel_url.as_str(), "") {
            Ok(_) => Ok(()),
            Err(e) if e.is_http_not_found() => Ok(()),
            Err(e) => Err(e),
        }
    }
}
