use std::sync::Arc;

use url::Url;

use crate::error::Result;
use crate::events::{EventSink, LogSink};
use crate::job::Job;
use crate::transport::{HttpTransport, Transport};

/// Handle on the build server itself.
///
/// Cheap to clone: the transport and event sink are shared. Jobs hold a
/// clone of this handle so they can resolve upstream/downstream project
/// names back into [`Job`] instances and reach the queue endpoint.
#[derive(Clone)]
pub struct Server {
    base_url: Url,
    transport: Arc<dyn Transport>,
    events: Arc<dyn EventSink>,
}

impl Server {
    /// Connects to the server at `base_url` using the default blocking HTTP
    /// transport and `log`-backed event sink.
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_transport(base_url, Arc::new(HttpTransport::new()?), Arc::new(LogSink))
    }

    /// Connects with an injected transport and event sink. This is the seam
    /// tests use to run the invocation state machine against a fake server.
    pub fn with_transport(
        base_url: &str,
        transport: Arc<dyn Transport>,
        events: Arc<dyn EventSink>,
    ) -> Result<Self> {
        let mut base_url = Url::parse(base_url)?;
        // Url::join drops the last path segment unless the base ends in '/'.
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }
        Ok(Self {
            base_url,
            transport,
            events,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Looks up a job by name, fetching its initial status snapshot.
    pub fn job(&self, name: &str) -> Result<Job> {
        Job::fetch(self.clone(), name)
    }

    pub fn queue(&self) -> Result<Queue> {
        Ok(Queue {
            base_url: self.base_url.join("queue/")?,
        })
    }

    pub(crate) fn transport(&self) -> &dyn Transport {
        &*self.transport
    }

    pub(crate) fn events(&self) -> &dyn EventSink {
        &*self.events
    }
}

/// The server's build queue. Only the base address matters here: the one
/// queue operation this crate performs is cancelling a queued item, and that
/// is driven from [`Job::cancel_from_queue`](crate::job::Job).
pub struct Queue {
    base_url: Url,
}

impl Queue {
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub(crate) fn cancel_url(&self, item_id: u64) -> Result<Url> {
        Ok(self.base_url.join(&format!("cancelItem?id={item_id}"))?)
    }
}
