use crate::backoff::Backoff;
use crate::error::{Error, TransportErrorKind};
use crate::link::{Connector, Link};
use domain::{Codec, Command};
use log::*;
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{watch, Notify};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Ready,
    Failed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Ready => write!(f, "ready"),
            ConnectionState::Failed => write!(f, "failed"),
        }
    }
}

/// What happened to a command handed to [`RemoteTransport::send`]. Callers are
/// not expected to act on it; every variant means "accepted".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Transmitted over a ready link.
    Sent,
    /// Not transmitted because the link wasn't ready.
    Dropped { state: ConnectionState },
    /// Transmission was attempted and failed; the link is being re-established.
    Lost,
}

/// Connection state plus the link that belongs to it. `generation` increases
/// with every successful connect so a late failure report from an old link
/// can't tear down its replacement.
struct Slot {
    state: ConnectionState,
    generation: u64,
    link: Option<Arc<dyn Link>>,
}

struct Inner {
    codec: Codec,
    slot: Mutex<Slot>,
    state_tx: watch::Sender<ConnectionState>,
    link_failed: Notify,
}

impl Inner {
    fn new(codec: Codec) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            codec,
            slot: Mutex::new(Slot {
                state: ConnectionState::Disconnected,
                generation: 0,
                link: None,
            }),
            state_tx,
            link_failed: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, slot: &mut Slot, next: ConnectionState) {
        if slot.state != next {
            debug!("Remote connection {} -> {}", slot.state, next);
        }
        slot.state = next;
        self.state_tx.send_replace(next);
    }

    /// Starts a new attempt. The generation moves on so failure reports from
    /// the previous link no longer match.
    fn begin_connecting(&self) {
        let mut slot = self.lock();
        slot.generation += 1;
        slot.link = None;
        self.set_state(&mut slot, ConnectionState::Connecting);
    }

    /// Installs a freshly connected link and returns its generation.
    fn become_ready(&self, link: Arc<dyn Link>) -> u64 {
        let mut slot = self.lock();
        slot.generation += 1;
        slot.link = Some(link);
        self.set_state(&mut slot, ConnectionState::Ready);
        slot.generation
    }

    /// Moves a ready link to `Failed` unless a newer generation has taken
    /// over. Returns true if this call made the transition.
    fn fail(&self, generation: u64) -> bool {
        let mut slot = self.lock();
        if slot.generation != generation || slot.state != ConnectionState::Ready {
            return false;
        }
        slot.link = None;
        self.set_state(&mut slot, ConnectionState::Failed);
        true
    }

    fn fail_attempt(&self) {
        let mut slot = self.lock();
        slot.link = None;
        self.set_state(&mut slot, ConnectionState::Failed);
    }

    fn is_current(&self, generation: u64) -> bool {
        let slot = self.lock();
        slot.generation == generation && slot.state == ConnectionState::Ready
    }

    /// Consistent view of the state and, if ready, the link to use.
    fn ready_link(&self) -> (ConnectionState, Option<(u64, Arc<dyn Link>)>) {
        let slot = self.lock();
        let link = match (&slot.state, &slot.link) {
            (ConnectionState::Ready, Some(link)) => Some((slot.generation, link.clone())),
            _ => None,
        };
        (slot.state, link)
    }

    /// Waits until the link at `generation` reports itself closed or a sender
    /// marks it failed.
    async fn wait_for_failure(&self, generation: u64, link: &dyn Link) {
        let closed = link.closed();
        tokio::pin!(closed);

        loop {
            tokio::select! {
                _ = &mut closed => return,
                _ = self.link_failed.notified() => {
                    if !self.is_current(generation) {
                        return;
                    }
                }
            }
        }
    }
}

/// Handle to the single logical connection to the remote device. Clones share
/// the same connection.
#[derive(Clone)]
pub struct RemoteTransport {
    inner: Arc<Inner>,
}

impl RemoteTransport {
    /// A transport with no remote configured. It stays `Disconnected` forever
    /// and drops every command with a log line.
    pub fn offline(codec: Codec) -> Self {
        info!("Remote connection skipped (demo mode): no remote host configured");
        Self {
            inner: Arc::new(Inner::new(codec)),
        }
    }

    /// Starts connecting immediately and keeps the connection alive until the
    /// runtime shuts down. Must be called from within a tokio runtime.
    pub fn connect(codec: Codec, connector: Arc<dyn Connector>, backoff: Backoff) -> Self {
        let inner = Arc::new(Inner::new(codec));
        tokio::spawn(supervise(inner.clone(), connector, backoff));
        Self { inner }
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.lock().state
    }

    /// Receiver that observes every state transition.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state_tx.subscribe()
    }

    /// Encrypts and delivers `command` if the link is ready, otherwise drops it.
    ///
    /// Returns an error only when the command itself is unusable (invalid
    /// fields or it can't be encrypted); in that case nothing touches the
    /// network. Connection problems never surface as errors.
    pub async fn send(&self, command: &Command) -> Result<Delivery, Error> {
        command
            .validate()
            .map_err(|e| Error::new(TransportErrorKind::InvalidCommand, e))?;

        let (state, ready) = self.inner.ready_link();
        let Some((generation, link)) = ready else {
            info!(
                "Remote not connected ({state}), {} command not sent: {command:?}",
                command.kind()
            );
            return Ok(Delivery::Dropped { state });
        };

        let ciphertext = self
            .inner
            .codec
            .encrypt(command)
            .map_err(|e| Error::new(TransportErrorKind::Encryption, e))?;

        match link.transmit(&ciphertext).await {
            Ok(()) => {
                info!("Sent {} command to remote device", command.kind());
                Ok(Delivery::Sent)
            }
            Err(e) => {
                warn!(
                    "Failed to send {} command, connection will be re-established: {e}",
                    command.kind()
                );
                if self.inner.fail(generation) {
                    self.inner.link_failed.notify_one();
                }
                Ok(Delivery::Lost)
            }
        }
    }
}

async fn supervise(inner: Arc<Inner>, connector: Arc<dyn Connector>, backoff: Backoff) {
    let target = connector.describe();
    let mut consecutive_failures: u32 = 0;

    loop {
        inner.begin_connecting();
        info!("Connecting to remote device at {target}");

        match connector.connect().await {
            Ok(link) => {
                consecutive_failures = 0;
                let generation = inner.become_ready(link.clone());
                info!("Remote connection established to {target}");

                inner.wait_for_failure(generation, link.as_ref()).await;
                inner.fail(generation);
                warn!("Remote connection to {target} lost");
            }
            Err(e) => {
                inner.fail_attempt();
                error!("Remote connection to {target} failed: {e}");
            }
        }

        consecutive_failures = consecutive_failures.saturating_add(1);
        let delay = backoff.delay(consecutive_failures);
        info!("Attempting to reconnect to {target} in {}ms", delay.as_millis());
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;
    use tokio::time::Instant;

    const TEST_KEY: &str = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";
    const TEST_IV: &str = "000102030405060708090a0b0c0d0e0f";

    fn codec() -> Codec {
        Codec::from_hex(TEST_KEY, TEST_IV).unwrap()
    }

    #[derive(Default)]
    struct FakeLink {
        sent: Mutex<Vec<String>>,
        fail_transmit: AtomicBool,
        closed: Notify,
    }

    impl FakeLink {
        fn close(&self) {
            self.closed.notify_one();
        }

        fn sent(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Link for FakeLink {
        async fn transmit(&self, ciphertext: &str) -> Result<(), Error> {
            if self.fail_transmit.load(Ordering::SeqCst) {
                return Err(Error::kind(TransportErrorKind::Channel));
            }
            self.sent.lock().unwrap().push(ciphertext.to_string());
            Ok(())
        }

        async fn closed(&self) {
            self.closed.notified().await
        }
    }

    /// Succeeds or fails connection attempts according to `script`; once the
    /// script runs out every attempt succeeds.
    #[derive(Default)]
    struct FakeConnector {
        script: Mutex<VecDeque<bool>>,
        attempts: Mutex<Vec<Instant>>,
        links: Mutex<Vec<Arc<FakeLink>>>,
    }

    impl FakeConnector {
        fn scripted(outcomes: &[bool]) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(outcomes.iter().copied().collect()),
                ..Default::default()
            })
        }

        fn attempts(&self) -> Vec<Instant> {
            self.attempts.lock().unwrap().clone()
        }

        fn link(&self, index: usize) -> Arc<FakeLink> {
            self.links.lock().unwrap()[index].clone()
        }
    }

    #[async_trait]
    impl Connector for FakeConnector {
        async fn connect(&self) -> Result<Arc<dyn Link>, Error> {
            self.attempts.lock().unwrap().push(Instant::now());
            let succeed = self.script.lock().unwrap().pop_front().unwrap_or(true);
            if !succeed {
                return Err(Error::new(TransportErrorKind::Connect, "connection refused"));
            }
            let link = Arc::new(FakeLink::default());
            self.links.lock().unwrap().push(link.clone());
            Ok(link)
        }

        fn describe(&self) -> String {
            "fake-device:22".to_string()
        }
    }

    async fn wait_for(transport: &RemoteTransport, target: ConnectionState) {
        let mut states = transport.watch_state();
        states
            .wait_for(|state| *state == target)
            .await
            .expect("transport dropped");
    }

    fn destination() -> Command {
        Command::Destination {
            lat: 37.7749,
            lng: -122.4194,
        }
    }

    #[tokio::test]
    async fn offline_transport_drops_commands_without_error() {
        let transport = RemoteTransport::offline(codec());

        let delivery = transport.send(&destination()).await.unwrap();

        assert_eq!(
            delivery,
            Delivery::Dropped {
                state: ConnectionState::Disconnected
            }
        );
        assert_eq!(transport.state(), ConnectionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn ready_transport_sends_encrypted_command() {
        let connector = FakeConnector::scripted(&[]);
        let transport = RemoteTransport::connect(codec(), connector.clone(), Backoff::default());
        wait_for(&transport, ConnectionState::Ready).await;

        let command = Command::SpeedLimit { speed_limit: 60.0 };
        assert_eq!(transport.send(&command).await.unwrap(), Delivery::Sent);

        let sent = connector.link(0).sent();
        assert_eq!(sent.len(), 1);
        assert!(!sent[0].contains("speedLimit"), "payload must be encrypted");
        let decrypted: Command = codec().decrypt(&sent[0]).unwrap();
        assert_eq!(decrypted, command);
    }

    #[tokio::test(start_paused = true)]
    async fn reconnects_with_constant_backoff_until_an_attempt_succeeds() {
        const FAILURES: usize = 3;
        let connector = FakeConnector::scripted(&[false; FAILURES]);
        let transport = RemoteTransport::connect(codec(), connector.clone(), Backoff::default());

        wait_for(&transport, ConnectionState::Ready).await;

        let attempts = connector.attempts();
        assert_eq!(attempts.len(), FAILURES + 1);
        for pair in attempts.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(5000));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn commands_sent_while_failed_are_dropped() {
        let connector = FakeConnector::scripted(&[false, false]);
        let transport = RemoteTransport::connect(codec(), connector.clone(), Backoff::default());
        wait_for(&transport, ConnectionState::Failed).await;

        let delivery = transport.send(&destination()).await.unwrap();

        assert_eq!(
            delivery,
            Delivery::Dropped {
                state: ConnectionState::Failed
            }
        );
        assert!(connector.links.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn closed_link_triggers_reconnect_on_a_new_link() {
        let connector = FakeConnector::scripted(&[]);
        let transport = RemoteTransport::connect(codec(), connector.clone(), Backoff::default());
        wait_for(&transport, ConnectionState::Ready).await;

        connector.link(0).close();
        wait_for(&transport, ConnectionState::Failed).await;
        wait_for(&transport, ConnectionState::Ready).await;

        assert_eq!(connector.attempts().len(), 2);
        transport.send(&destination()).await.unwrap();
        assert!(connector.link(0).sent().is_empty());
        assert_eq!(connector.link(1).sent().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn transmit_failure_marks_connection_failed_and_recovers() {
        let connector = FakeConnector::scripted(&[]);
        let transport = RemoteTransport::connect(codec(), connector.clone(), Backoff::default());
        wait_for(&transport, ConnectionState::Ready).await;
        connector.link(0).fail_transmit.store(true, Ordering::SeqCst);

        let delivery = transport.send(&destination()).await.unwrap();

        assert_eq!(delivery, Delivery::Lost);
        assert_eq!(transport.state(), ConnectionState::Failed);
        wait_for(&transport, ConnectionState::Ready).await;
        assert_eq!(connector.attempts().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_command_is_rejected_before_any_network_io() {
        let connector = FakeConnector::scripted(&[]);
        let transport = RemoteTransport::connect(codec(), connector.clone(), Backoff::default());
        wait_for(&transport, ConnectionState::Ready).await;

        let err = transport
            .send(&Command::SpeedLimit { speed_limit: -1.0 })
            .await
            .unwrap_err();

        assert_eq!(err.error_kind, TransportErrorKind::InvalidCommand);
        assert!(connector.link(0).sent().is_empty());
        assert_eq!(transport.state(), ConnectionState::Ready);
    }

    #[test]
    fn stale_failure_does_not_touch_a_newer_link() {
        let inner = Inner::new(codec());
        let old = inner.become_ready(Arc::new(FakeLink::default()));
        let new = inner.become_ready(Arc::new(FakeLink::default()));

        assert!(!inner.fail(old));
        assert!(inner.is_current(new));
        assert!(inner.fail(new));
        assert!(!inner.fail(new));
        assert!(inner.ready_link().1.is_none());
    }

    #[test]
    fn late_failure_of_previous_link_leaves_new_attempt_connecting() {
        let inner = Inner::new(codec());
        let old = inner.become_ready(Arc::new(FakeLink::default()));
        assert!(inner.fail(old));

        inner.begin_connecting();

        assert!(!inner.fail(old));
        assert_eq!(inner.lock().state, ConnectionState::Connecting);
    }
}
