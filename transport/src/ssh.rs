//! Production [`Connector`]/[`Link`] pair: an authenticated SSH session on
//! which every command is delivered by running a shell command with the
//! ciphertext substituted in.
//!
//! `ssh2` is a blocking library, so every call into it runs on the blocking
//! thread pool.

use crate::error::{Error, TransportErrorKind};
use crate::link::{Connector, Link};
use async_trait::async_trait;
use log::*;
use ssh2::Session;
use std::io::Read;
use std::net::{TcpStream, ToSocketAddrs};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Placeholder in [`SshSettings::command_template`] replaced by the hex ciphertext.
pub const PAYLOAD_PLACEHOLDER: &str = "{payload}";

/// Remote command used when none is configured: the device side reads the
/// token from the command's stdout.
pub const DEFAULT_COMMAND_TEMPLATE: &str = "echo '{payload}'";

#[derive(Debug, Clone)]
pub struct SshSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub private_key_path: PathBuf,
    pub passphrase: Option<String>,
    pub command_template: String,
    /// Applied to the TCP connect and to every blocking libssh2 call.
    pub timeout: Duration,
    /// How often an idle link is checked for liveness.
    pub keepalive_interval: Duration,
}

impl SshSettings {
    pub fn validate(&self) -> Result<(), Error> {
        if self.host.trim().is_empty() {
            return Err(Error::new(TransportErrorKind::Config, "ssh host is empty"));
        }
        if self.username.trim().is_empty() {
            return Err(Error::new(TransportErrorKind::Config, "ssh username is empty"));
        }
        if !self.command_template.contains(PAYLOAD_PLACEHOLDER) {
            return Err(Error::new(
                TransportErrorKind::Config,
                format!("remote command must contain {PAYLOAD_PLACEHOLDER}"),
            ));
        }
        Ok(())
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Hex ciphertext never contains quotes or shell metacharacters, so plain
    /// substitution is safe.
    fn render_command(&self, ciphertext: &str) -> String {
        self.command_template.replace(PAYLOAD_PLACEHOLDER, ciphertext)
    }
}

pub struct SshConnector {
    settings: Arc<SshSettings>,
}

impl SshConnector {
    pub fn new(settings: SshSettings) -> Result<Self, Error> {
        settings.validate()?;
        Ok(Self {
            settings: Arc::new(settings),
        })
    }
}

#[async_trait]
impl Connector for SshConnector {
    async fn connect(&self) -> Result<Arc<dyn Link>, Error> {
        let settings = self.settings.clone();
        let session = tokio::task::spawn_blocking(move || open_session(&settings))
            .await
            .map_err(|e| Error::new(TransportErrorKind::Connect, e))??;

        Ok(Arc::new(SshLink {
            session,
            settings: self.settings.clone(),
            dead: AtomicBool::new(false),
            died: Notify::new(),
        }))
    }

    fn describe(&self) -> String {
        format!("{}@{}", self.settings.username, self.settings.address())
    }
}

fn open_session(settings: &SshSettings) -> Result<Session, Error> {
    let addr = settings
        .address()
        .to_socket_addrs()
        .map_err(|e| Error::new(TransportErrorKind::Connect, e))?
        .next()
        .ok_or_else(|| {
            Error::new(
                TransportErrorKind::Connect,
                format!("{} did not resolve to an address", settings.host),
            )
        })?;

    let tcp = TcpStream::connect_timeout(&addr, settings.timeout)
        .map_err(|e| Error::new(TransportErrorKind::Connect, e))?;
    debug!("TCP connection established to {addr}");

    let mut session = Session::new().map_err(|e| Error::new(TransportErrorKind::Connect, e))?;
    session.set_tcp_stream(tcp);
    session.set_timeout(u32::try_from(settings.timeout.as_millis()).unwrap_or(u32::MAX));
    session
        .handshake()
        .map_err(|e| Error::new(TransportErrorKind::Connect, e))?;

    session
        .userauth_pubkey_file(
            &settings.username,
            None,
            &settings.private_key_path,
            settings.passphrase.as_deref(),
        )
        .map_err(|e| Error::new(TransportErrorKind::Auth, e))?;

    if !session.authenticated() {
        return Err(Error::new(
            TransportErrorKind::Auth,
            "not authenticated after public key auth",
        ));
    }

    let keepalive_secs = u32::try_from(settings.keepalive_interval.as_secs()).unwrap_or(u32::MAX);
    session.set_keepalive(true, keepalive_secs);

    Ok(session)
}

/// One authenticated session. Commands run on short-lived exec channels.
pub struct SshLink {
    session: Session,
    settings: Arc<SshSettings>,
    dead: AtomicBool,
    died: Notify,
}

impl SshLink {
    fn mark_dead(&self) {
        if !self.dead.swap(true, Ordering::SeqCst) {
            self.died.notify_one();
        }
    }
}

#[async_trait]
impl Link for SshLink {
    async fn transmit(&self, ciphertext: &str) -> Result<(), Error> {
        if self.dead.load(Ordering::SeqCst) {
            return Err(Error::kind(TransportErrorKind::Closed));
        }

        let session = self.session.clone();
        let command = self.settings.render_command(ciphertext);
        let result = tokio::task::spawn_blocking(move || exec(&session, &command))
            .await
            .map_err(|e| Error::new(TransportErrorKind::Channel, e))
            .and_then(|r| r);

        if result.is_err() {
            self.mark_dead();
        }
        result
    }

    async fn closed(&self) {
        loop {
            if self.dead.load(Ordering::SeqCst) {
                return;
            }

            tokio::select! {
                _ = self.died.notified() => return,
                _ = tokio::time::sleep(self.settings.keepalive_interval) => {}
            }

            let session = self.session.clone();
            let keepalive = tokio::task::spawn_blocking(move || session.keepalive_send()).await;
            match keepalive {
                Ok(Ok(_)) => trace!("Keepalive acknowledged by {}", self.settings.host),
                Ok(Err(e)) => {
                    warn!("Keepalive to {} failed: {e}", self.settings.host);
                    self.mark_dead();
                }
                Err(e) => {
                    warn!("Keepalive task for {} failed: {e}", self.settings.host);
                    self.mark_dead();
                }
            }
        }
    }
}

fn exec(session: &Session, command: &str) -> Result<(), Error> {
    let mut channel = session
        .channel_session()
        .map_err(|e| Error::new(TransportErrorKind::Channel, e))?;
    channel
        .exec(command)
        .map_err(|e| Error::new(TransportErrorKind::Channel, e))?;

    let mut output = String::new();
    channel
        .read_to_string(&mut output)
        .map_err(|e| Error::new(TransportErrorKind::Channel, e))?;
    channel
        .wait_close()
        .map_err(|e| Error::new(TransportErrorKind::Channel, e))?;

    match channel.exit_status() {
        Ok(0) => trace!("Remote command output: {}", output.trim_end()),
        Ok(status) => warn!("Remote command exited with status {status}"),
        Err(e) => warn!("Could not read remote command exit status: {e}"),
    }
    Ok(())
}
