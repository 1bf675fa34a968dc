//! Client library for Jenkins-compatible CI servers.
//!
//! Connect a [`Server`] handle to a base URL, look up a [`Job`] by name, and
//! drive it: inspect build history, trigger new builds (optionally blocking
//! until they finish), and edit the SCM section of the job's XML config
//! document in place.
//!
//! ```no_run
//! use jobwright::{InvokeParams, Server};
//!
//! # fn main() -> jobwright::Result<()> {
//! let server = Server::new("https://ci.example.com")?;
//! let mut job = server.job("deploy-frontend")?;
//!
//! println!("checkout from {:?}", job.scm_urls()?);
//! job.invoke(InvokeParams {
//!     block: true,
//!     ..InvokeParams::default()
//! })?;
//! # Ok(())
//! # }
//! ```
//!
//! Everything is synchronous and blocking; polling loops sleep the calling
//! thread and have no built-in timeout. Wrap calls in your own cancellation
//! layer if you need one.

mod build;
mod error;
mod events;
mod job;
mod server;
mod transport;

#[cfg(test)]
mod test_support;

pub use build::Build;
pub use error::{Error, Result};
pub use events::{EventSink, LogSink};
pub use job::{BuildPointer, InvokeParams, Job, JobStatus, ProjectPointer, QueueItem, ScmKind};
pub use server::{Queue, Server};
pub use transport::{HttpTransport, Transport};
