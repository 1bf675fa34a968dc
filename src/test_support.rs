//! In-memory stand-in for a build server, shared by the unit tests.
//!
//! Scripts the queued -> running -> completed transitions the invocation
//! state machine observes, serves and accepts config documents, and records
//! every write so tests can assert on exactly what went over the wire.

use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};
use crate::events::EventSink;
use crate::job::Job;
use crate::server::Server;
use crate::transport::Transport;

pub const GIT_CONFIG_XML: &str = r#"<project>
  <scm class="hudson.plugins.git.GitSCM">
    <userRemoteConfigs>
      <hudson.plugins.git.UserRemoteConfig>
        <url>git@example.com:one.git</url>
      </hudson.plugins.git.UserRemoteConfig>
      <hudson.plugins.git.UserRemoteConfig>
        <url>git@example.com:two.git</url>
      </hudson.plugins.git.UserRemoteConfig>
    </userRemoteConfigs>
    <branches>
      <hudson.plugins.git.BranchSpec>
        <name>*/main</name>
      </hudson.plugins.git.BranchSpec>
    </branches>
  </scm>
</project>"#;

pub const SVN_CONFIG_XML: &str = r#"<project>
  <scm class="hudson.scm.SubversionSCM">
    <locations>
      <hudson.scm.SubversionSCM_-ModuleLocation>
        <remote>https://svn.example.com/trunk</remote>
      </hudson.scm.SubversionSCM_-ModuleLocation>
    </locations>
  </scm>
</project>"#;

#[derive(Clone, Copy)]
struct Pending {
    queue_left: u32,
    run_ticks: u32,
}

struct Inner {
    in_queue: bool,
    building: bool,
    run_ticks_left: u32,
    last_build: Option<u32>,
    builds: Vec<u32>,
    queue_item: Option<u64>,
    pending: Option<Pending>,
    schedule: Option<(u32, u32)>,
    config_xml: String,
    empty_trigger_response: bool,
    fail_posts: bool,
    config_fetches: usize,
    trigger_count: usize,
    posts: Vec<(String, String)>,
}

pub struct FakeServer {
    inner: Mutex<Inner>,
}

impl FakeServer {
    fn with_state(
        in_queue: bool,
        building: bool,
        last_build: Option<u32>,
        queue_item: Option<u64>,
    ) -> Self {
        let builds = last_build
            .map(|n| (0..3).filter_map(|i| n.checked_sub(i)).collect())
            .unwrap_or_default();
        Self {
            inner: Mutex::new(Inner {
                in_queue,
                building,
                run_ticks_left: if building { 1000 } else { 0 },
                last_build,
                builds,
                queue_item,
                pending: None,
                schedule: None,
                config_xml: GIT_CONFIG_XML.to_string(),
                empty_trigger_response: false,
                fail_posts: false,
                config_fetches: 0,
                trigger_count: 0,
                posts: Vec::new(),
            }),
        }
    }

    /// Idle job whose most recent build is `last_build`.
    pub fn idle(last_build: u32) -> Self {
        Self::with_state(false, false, Some(last_build), None)
    }

    /// Job that has never built.
    pub fn never_built() -> Self {
        Self::with_state(false, false, None, None)
    }

    /// Job sitting in the queue with the given queue item id.
    pub fn queued(last_build: u32, queue_item: u64) -> Self {
        Self::with_state(true, false, Some(last_build), Some(queue_item))
    }

    /// Job whose last build is currently executing.
    pub fn running(last_build: u32) -> Self {
        Self::with_state(false, true, Some(last_build), None)
    }

    /// A trigger request schedules a new build that stays queued for
    /// `queue_ticks` status polls and runs for `run_ticks` build polls.
    pub fn schedules(self, queue_ticks: u32, run_ticks: u32) -> Self {
        self.inner.lock().unwrap().schedule = Some((queue_ticks, run_ticks));
        self
    }

    /// Trigger requests are accepted but never produce a build.
    pub fn never_schedules(self) -> Self {
        self.inner.lock().unwrap().schedule = None;
        self
    }

    pub fn with_config(self, xml: &str) -> Self {
        self.inner.lock().unwrap().config_xml = xml.to_string();
        self
    }

    pub fn with_empty_trigger_response(self) -> Self {
        self.inner.lock().unwrap().empty_trigger_response = true;
        self
    }

    /// Makes every later POST fail with a server error.
    pub fn fail_posts(&self) {
        self.inner.lock().unwrap().fail_posts = true;
    }

    pub fn posts(&self) -> Vec<(String, String)> {
        self.inner.lock().unwrap().posts.clone()
    }

    pub fn triggers(&self) -> usize {
        self.inner.lock().unwrap().trigger_count
    }

    pub fn config_fetches(&self) -> usize {
        self.inner.lock().unwrap().config_fetches
    }

    /// One status poll: queued items count down, then resolve into a new
    /// running build.
    fn advance(inner: &mut Inner) {
        if let Some(pending) = inner.pending {
            if pending.queue_left > 0 {
                inner.in_queue = true;
                inner.pending = Some(Pending {
                    queue_left: pending.queue_left - 1,
                    run_ticks: pending.run_ticks,
                });
            } else {
                inner.pending = None;
                inner.in_queue = false;
                inner.building = true;
                inner.run_ticks_left = pending.run_ticks;
                let next = inner.last_build.map_or(1, |n| n + 1);
                inner.last_build = Some(next);
                inner.builds.insert(0, next);
            }
        }
    }

    fn poll_build(inner: &mut Inner) -> bool {
        if !inner.building {
            return false;
        }
        if inner.run_ticks_left > 0 {
            inner.run_ticks_left -= 1;
            true
        } else {
            inner.building = false;
            false
        }
    }

    fn status_json(inner: &Inner) -> String {
        let mut doc = serde_json::json!({
            "inQueue": inner.in_queue,
            "upstreamProjects": [{"name": "upstream-demo"}],
            "downstreamProjects": [],
        });
        if let Some(n) = inner.last_build {
            let pointer = |number: u32| {
                serde_json::json!({
                    "number": number,
                    "url": format!("http://fake/job/demo/{number}/"),
                })
            };
            doc["lastBuild"] = pointer(n);
            doc["lastSuccessfulBuild"] = pointer(n);
            doc["lastCompletedBuild"] = pointer(n);
            doc["builds"] =
                serde_json::Value::Array(inner.builds.iter().map(|&n| pointer(n)).collect());
        }
        if let Some(id) = inner.queue_item {
            doc["queueItem"] = serde_json::json!({ "id": id });
        }
        doc.to_string()
    }
}

impl Transport for FakeServer {
    fn get(&self, url: &str) -> Result<String> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(rest) = url.strip_suffix("/api/json") {
            let last = rest.rsplit('/').next().unwrap_or_default();
            if !last.is_empty() && last.chars().all(|c| c.is_ascii_digit()) {
                let building = Self::poll_build(&mut inner);
                return Ok(format!("{{\"building\":{building}}}"));
            }
            Self::advance(&mut inner);
            return Ok(Self::status_json(&inner));
        }
        if url.ends_with("/config.xml") {
            inner.config_fetches += 1;
            return Ok(inner.config_xml.clone());
        }
        if url.contains("/build") {
            inner.trigger_count += 1;
            if let Some((queue_ticks, run_ticks)) = inner.schedule {
                inner.pending = Some(Pending {
                    queue_left: queue_ticks,
                    run_ticks,
                });
            }
            if inner.empty_trigger_response {
                return Ok(String::new());
            }
            return Ok("<html>scheduled</html>".to_string());
        }
        Err(Error::Http {
            status: 404,
            url: url.to_string(),
        })
    }

    fn post(&self, url: &str, body: &str) -> Result<String> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_posts {
            return Err(Error::Http {
                status: 500,
                url: url.to_string(),
            });
        }
        inner.posts.push((url.to_string(), body.to_string()));
        if url.contains("cancelItem") {
            // The real server answers a successful cancel with a 404.
            return Err(Error::Http {
                status: 404,
                url: url.to_string(),
            });
        }
        Ok("ok".to_string())
    }
}

#[derive(Default)]
pub struct CapturingSink {
    messages: Mutex<Vec<String>>,
}

impl CapturingSink {
    pub fn saw(&self, needle: &str) -> bool {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .any(|m| m.contains(needle))
    }
}

impl EventSink for CapturingSink {
    fn debug(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }

    fn info(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }

    fn warn(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}

/// A job named "demo" backed by the given fake server.
pub fn fake_job(fake: FakeServer) -> (Job, Arc<FakeServer>, Arc<CapturingSink>) {
    let fake = Arc::new(fake);
    let sink = Arc::new(CapturingSink::default());
    let server = Server::with_transport("http://fake", fake.clone(), sink.clone()).unwrap();
    let job = server.job("demo").unwrap();
    (job, fake, sink)
}
