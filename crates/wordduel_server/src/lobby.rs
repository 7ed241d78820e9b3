//! Public matchmaking.
//!
//! Waiting sockets are paired in arrival order. Each pair gets a fresh match
//! and both sockets are told where to find it.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, instrument, warn};
use wordduel::GameMode;

use crate::host::ConnectionId;
use crate::protocol::{LobbyMessage, MatchId};
use crate::registry::MatchRegistry;

#[derive(Debug)]
struct Waiter {
    connection: ConnectionId,
    outbound: UnboundedSender<LobbyMessage>,
}

/// Pairs waiting players per mode.
#[derive(Debug, Clone)]
pub struct Lobby {
    registry: MatchRegistry,
    waiting: Arc<Mutex<HashMap<GameMode, VecDeque<Waiter>>>>,
}

impl Lobby {
    /// Creates an empty lobby that registers matches in `registry`.
    pub fn new(registry: MatchRegistry) -> Self {
        Self {
            registry,
            waiting: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Queues a socket and pairs it if someone is already waiting.
    ///
    /// Returns the id of the match created for the pair, if any.
    #[instrument(skip(self, outbound))]
    pub fn arrive(
        &self,
        mode: GameMode,
        connection: ConnectionId,
        outbound: UnboundedSender<LobbyMessage>,
    ) -> Option<MatchId> {
        let pair = {
            let mut waiting = self.lock();
            let queue = waiting.entry(mode).or_default();
            queue.retain(|waiter| !waiter.outbound.is_closed());
            queue.push_back(Waiter { connection, outbound });
            debug!(waiting = queue.len(), "Player waiting");

            if queue.len() < 2 {
                return None;
            }
            match (queue.pop_front(), queue.pop_front()) {
                (Some(first), Some(second)) => [first, second],
                _ => return None,
            }
        };

        let handle = self.registry.create(mode, None);
        let message = LobbyMessage::Join {
            match_id: handle.id().clone(),
            mode,
        };
        for waiter in &pair {
            if waiter.outbound.send(message.clone()).is_err() {
                warn!(connection = waiter.connection, "Paired socket already gone");
            }
        }
        info!(
            match_id = %handle.id(),
            first = pair[0].connection,
            second = pair[1].connection,
            "Paired players"
        );
        Some(handle.id().clone())
    }

    /// Removes a socket that left before being paired.
    #[instrument(skip(self))]
    pub fn leave(&self, mode: GameMode, connection: ConnectionId) {
        if let Some(queue) = self.lock().get_mut(&mode) {
            queue.retain(|waiter| waiter.connection != connection);
        }
    }

    /// Number of sockets waiting in `mode`.
    pub fn waiting(&self, mode: GameMode) -> usize {
        self.lock().get(&mode).map_or(0, VecDeque::len)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<GameMode, VecDeque<Waiter>>> {
        match self.waiting.lock() {
            Ok(waiting) => waiting,
            Err(poisoned) => {
                warn!("Lobby lock poisoned");
                poisoned.into_inner()
            }
        }
    }
}
