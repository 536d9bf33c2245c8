//! netshell — a command session engine for network devices over SSH.
//!
//! Network CLIs were built for humans: they page long output, echo
//! keystrokes, and never say when a command is done. This crate drives
//! them anyway. It opens an interactive shell, suppresses pagination,
//! detects command completion by watching for output silence, and frames
//! the raw capture into clean per-command results.
//!
//! Sessions run on a background worker and report through an event
//! channel. A session either runs its command list once ([`session::SessionMode::Oneshot`])
//! or re-runs it on an interval until cancelled ([`session::SessionMode::Loop`]).
//! Configuration changes go through a structured collaborator
//! ([`managed::ManagedSession`]) with an automatic pre-change backup.
//!
//! ```no_run
//! use netshell::session::{Command, SessionDriver, SessionRequest};
//! use secrecy::SecretString;
//!
//! # async fn demo() {
//! let request = SessionRequest::new("192.0.2.1", "admin", SecretString::from("secret"))
//!     .with_command(Command::new("show version"))
//!     .with_command(Command::new("show ip interface brief"));
//!
//! let outcome = SessionDriver::run(request).await;
//! for result in &outcome.results {
//!     println!("{}\n{}", result.command, result.output);
//! }
//! # }
//! ```

pub mod backup;
pub mod codec;
pub mod error;
pub mod managed;
pub mod session;
pub mod transport;
pub mod vendor;

pub use error::{Error, Result};
pub use session::{SessionDriver, SessionHandle, SessionRequest};
