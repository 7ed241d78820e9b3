//! The per-match actor.
//!
//! One tokio task owns each [`GameSession`] together with its connections
//! and rematch negotiator. Commands from sockets arrive on an unbounded
//! mailbox, and the same loop sleeps until the session's next deadline, so
//! timer expiry is serialized with every other command.
//!
//! A host outlives its connections while a deadline is pending, so an
//! abandoned match still reaches its terminal state and records it. A host
//! with nobody connected and nothing pending is closed after an idle timeout.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, instrument, warn};
use wordduel::{Environment, GameMode, GameOver, GameSession, MAX_PLAYERS, Player, PlayerId, Rematch, Rules};

use crate::dictionary::Dictionary;
use crate::identity::Identity;
use crate::presence::Presence;
use crate::protocol::{GameView, MatchId, ServerMessage};
use crate::registry::MatchRegistry;
use crate::stats_service::{StatsStore, spawn_record, verified_results};

/// Identifies one socket for the lifetime of the server.
pub type ConnectionId = u64;

/// Everything a match host can be asked to do.
#[derive(Debug)]
pub enum HostCommand {
    /// A socket opened.
    Connect {
        /// The socket.
        connection: ConnectionId,
        /// Country reported by the connection URL.
        country: Option<String>,
        /// Where to send frames for this socket.
        outbound: UnboundedSender<ServerMessage>,
    },
    /// The socket identified itself.
    Join {
        /// The socket.
        connection: ConnectionId,
        /// Resolved identity.
        identity: Identity,
        /// Display name.
        username: String,
        /// Country from the join frame, if sent.
        country: Option<String>,
    },
    /// Type or erase a letter.
    TypeLetter {
        /// The socket.
        connection: ConnectionId,
        /// The letter, `None` to erase.
        letter: Option<char>,
    },
    /// Submit the buffered word.
    SubmitGuess {
        /// The socket.
        connection: ConnectionId,
    },
    /// Ask for a rematch.
    RequestRematch {
        /// The socket.
        connection: ConnectionId,
    },
    /// The socket closed.
    Disconnect {
        /// The socket.
        connection: ConnectionId,
    },
}

/// Returned when a host is no longer running.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("Match {} is closed", match_id)]
pub struct MatchClosed {
    /// The match that was addressed.
    pub match_id: MatchId,
}

/// Cheap, cloneable address of a running host.
#[derive(Debug, Clone)]
pub struct MatchHandle {
    id: MatchId,
    mode: GameMode,
    commands: UnboundedSender<HostCommand>,
}

impl MatchHandle {
    /// The match id.
    pub fn id(&self) -> &MatchId {
        &self.id
    }

    /// The match mode.
    pub fn mode(&self) -> GameMode {
        self.mode
    }

    /// Delivers a command to the host's mailbox.
    pub fn send(&self, command: HostCommand) -> Result<(), MatchClosed> {
        self.commands.send(command).map_err(|_| MatchClosed {
            match_id: self.id.clone(),
        })
    }

    /// True once the host has stopped.
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}

/// Collaborators shared by every host.
#[derive(Clone)]
pub struct HostServices {
    dictionary: Arc<dyn Dictionary>,
    stats: Arc<dyn StatsStore>,
    presence: Presence,
}

impl std::fmt::Debug for HostServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostServices")
            .field("dictionary", &self.dictionary)
            .field("presence", &self.presence)
            .finish_non_exhaustive()
    }
}

impl HostServices {
    /// Bundles the collaborators.
    pub fn new(dictionary: Arc<dyn Dictionary>, stats: Arc<dyn StatsStore>, presence: Presence) -> Self {
        Self {
            dictionary,
            stats,
            presence,
        }
    }

    /// Live connection counts.
    pub fn presence(&self) -> &Presence {
        &self.presence
    }
}

#[derive(Debug)]
struct Connection {
    outbound: UnboundedSender<ServerMessage>,
    country: Option<String>,
    player_id: Option<PlayerId>,
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

/// Owns one session and everyone connected to it.
#[derive(Debug)]
pub struct MatchHost<R: Rules, E: Environment> {
    id: MatchId,
    session: GameSession<R, E>,
    rematch: Rematch,
    rematch_match: Option<MatchId>,
    connections: HashMap<ConnectionId, Connection>,
    idle_since: Option<Instant>,
    idle_timeout: Duration,
    services: HostServices,
    registry: MatchRegistry,
}

/// Starts a host task for `session` and returns its address.
pub fn spawn<R, E>(
    id: MatchId,
    session: GameSession<R, E>,
    services: HostServices,
    registry: MatchRegistry,
    idle_timeout: Duration,
) -> MatchHandle
where
    R: Rules,
    R::View: Into<GameView>,
    E: Environment,
{
    let (commands, mailbox) = mpsc::unbounded_channel();
    let host = MatchHost {
        id: id.clone(),
        session,
        rematch: Rematch::default(),
        rematch_match: None,
        connections: HashMap::new(),
        idle_since: Some(now()),
        idle_timeout,
        services,
        registry,
    };
    tokio::spawn(host.run(mailbox));
    MatchHandle {
        id,
        mode: R::MODE,
        commands,
    }
}

impl<R, E> MatchHost<R, E>
where
    R: Rules,
    R::View: Into<GameView>,
    E: Environment,
{
    /// Processes commands and deadlines until the match is finished with
    /// or abandoned, or every handle is dropped.
    #[instrument(skip_all, fields(match_id = %self.id, mode = %R::MODE))]
    pub async fn run(mut self, mut mailbox: UnboundedReceiver<HostCommand>) {
        info!("Match host started");
        loop {
            let deadline = self.session.next_deadline();
            let reap_at = self.reap_at();
            tokio::select! {
                command = mailbox.recv() => {
                    let Some(command) = command else { break };
                    if self.handle(command) == Flow::Stop {
                        break;
                    }
                }
                () = sleep_until_due(deadline) => {
                    if self.expire() == Flow::Stop {
                        break;
                    }
                }
                () = sleep_until_due(reap_at) => {
                    info!("Closing idle match");
                    break;
                }
            }
        }
        mailbox.close();
        self.registry.remove(R::MODE, &self.id);
        info!("Match host stopped");
    }

    fn handle(&mut self, command: HostCommand) -> Flow {
        match command {
            HostCommand::Connect {
                connection,
                country,
                outbound,
            } => self.on_connect(connection, country, outbound),
            HostCommand::Join {
                connection,
                identity,
                username,
                country,
            } => self.on_join(connection, identity, username, country),
            HostCommand::TypeLetter { connection, letter } => self.on_type_letter(connection, letter),
            HostCommand::SubmitGuess { connection } => self.on_submit_guess(connection),
            HostCommand::RequestRematch { connection } => self.on_request_rematch(connection),
            HostCommand::Disconnect { connection } => return self.on_disconnect(connection),
        }
        Flow::Continue
    }

    #[instrument(skip(self, outbound))]
    fn on_connect(
        &mut self,
        connection: ConnectionId,
        country: Option<String>,
        outbound: UnboundedSender<ServerMessage>,
    ) {
        self.connections.insert(
            connection,
            Connection {
                outbound,
                country,
                player_id: None,
            },
        );
        self.idle_since = None;
        self.services.presence.connect(R::MODE);
        debug!(connections = self.connections.len(), "Connection opened");
        self.send(connection, ServerMessage::Ready);
    }

    #[instrument(skip(self, identity), fields(player_id = %identity.player_id()))]
    fn on_join(&mut self, connection: ConnectionId, identity: Identity, username: String, country: Option<String>) {
        let Some(conn) = self.connections.get_mut(&connection) else {
            debug!("Join from unknown connection");
            return;
        };

        let player_id = identity.player_id().clone();
        if self.session.is_full() && !self.session.has_player(&player_id) {
            info!("Rejected join, match is full");
            self.send(connection, ServerMessage::FullGame);
            return;
        }

        conn.player_id = Some(player_id.clone());
        let country = country.or_else(|| conn.country.clone());
        let player = Player::new(player_id.clone(), username, country, *identity.class());
        match self.session.add_player(player) {
            Ok(outcome) => debug!(?outcome, "Player joined"),
            Err(e) => debug!(error = %e, "Join had no effect"),
        }

        self.send(
            connection,
            ServerMessage::Welcome {
                player_id,
                token: identity.token().clone(),
            },
        );
        self.broadcast_tick();

        if let Some(over) = self.session.game_over().cloned() {
            self.broadcast(self.game_over_message(over));
        }
        if self.rematch.someone_wants_to() {
            self.broadcast(ServerMessage::RematchStatus {
                consents: self.rematch.consents().clone(),
            });
        }
    }

    #[instrument(skip(self))]
    fn on_type_letter(&mut self, connection: ConnectionId, letter: Option<char>) {
        let Some(player_id) = self.player_of(connection) else {
            debug!("typeLetter before join");
            return;
        };
        match self.session.type_letter(&player_id, letter) {
            Ok(()) => self.broadcast_tick(),
            Err(e) => debug!(error = %e, "Ignored typeLetter"),
        }
    }

    #[instrument(skip(self))]
    fn on_submit_guess(&mut self, connection: ConnectionId) {
        let Some(player_id) = self.player_of(connection) else {
            debug!("submitGuess before join");
            return;
        };

        let word = match self.session.pending_guess(&player_id) {
            Ok(word) => word.to_string(),
            Err(e) => {
                debug!(error = %e, "Ignored submitGuess");
                return;
            }
        };
        if !self.services.dictionary.is_valid(&word) {
            info!(word = %word, "Bad guess");
            self.send(connection, ServerMessage::BadGuess);
            return;
        }

        match self.session.submit_guess(&player_id) {
            Ok(outcome) => {
                self.broadcast_tick();
                if let Some(over) = outcome {
                    self.finish(over);
                }
            }
            Err(e) => debug!(error = %e, "Ignored submitGuess"),
        }
    }

    #[instrument(skip(self))]
    fn on_request_rematch(&mut self, connection: ConnectionId) {
        let Some(player_id) = self.player_of(connection) else {
            debug!("requestRematch before join");
            return;
        };
        if !self.session.is_game_over() || !self.session.is_full() {
            debug!("Rematch requested before the match ended");
            return;
        }
        if self.connections.len() < MAX_PLAYERS {
            info!("Opponent is gone, sending everyone home");
            self.broadcast(ServerMessage::GoHome);
            return;
        }

        self.rematch.agree(&player_id);

        if !self.rematch.everyone_wants_to() {
            self.broadcast(ServerMessage::RematchStatus {
                consents: self.rematch.consents().clone(),
            });
            return;
        }

        let match_id = match &self.rematch_match {
            Some(existing) => existing.clone(),
            None => {
                let time_to_guess = *self.session.config().time_to_guess();
                let handle = self.registry.create(R::MODE, Some(time_to_guess));
                info!(new_match = %handle.id(), "Rematch agreed");
                self.rematch_match = Some(handle.id().clone());
                handle.id().clone()
            }
        };
        self.broadcast(ServerMessage::NewMatch { match_id });
    }

    #[instrument(skip(self))]
    fn on_disconnect(&mut self, connection: ConnectionId) -> Flow {
        if self.connections.remove(&connection).is_none() {
            return Flow::Continue;
        }
        self.services.presence.disconnect(R::MODE);
        debug!(connections = self.connections.len(), "Connection closed");

        if self.rematch.someone_wants_to() && self.rematch_match.is_none() {
            self.broadcast(ServerMessage::GoHome);
        }

        if !self.connections.is_empty() {
            return Flow::Continue;
        }
        self.idle_since = Some(now());
        if self.session.next_deadline().is_some() {
            info!("Everyone left, waiting for the pending deadline");
            return Flow::Continue;
        }
        Flow::Stop
    }

    fn expire(&mut self) -> Flow {
        if let Some(over) = self.session.advance() {
            self.broadcast_tick();
            self.finish(over);
        }
        if self.connections.is_empty() && self.session.next_deadline().is_none() {
            debug!("Abandoned match settled");
            return Flow::Stop;
        }
        Flow::Continue
    }

    /// When an empty host with nothing pending should be closed.
    fn reap_at(&self) -> Option<Instant> {
        if !self.connections.is_empty() || self.session.next_deadline().is_some() {
            return None;
        }
        self.idle_since.map(|since| since + self.idle_timeout)
    }

    #[instrument(skip(self))]
    fn finish(&mut self, over: GameOver) {
        info!(solution = %self.session.solution(), "Match finished");
        let results = verified_results(&over, &self.session.roster());
        spawn_record(Arc::clone(&self.services.stats), R::MODE, results);
        self.broadcast(self.game_over_message(over));
    }

    fn game_over_message(&self, state: GameOver) -> ServerMessage {
        let players: BTreeMap<PlayerId, Player> = self
            .session
            .roster()
            .into_iter()
            .map(|player| (player.id().clone(), player))
            .collect();
        ServerMessage::GameOver {
            state,
            solution: self.session.solution().to_string(),
            players,
        }
    }

    fn player_of(&self, connection: ConnectionId) -> Option<PlayerId> {
        self.connections.get(&connection)?.player_id.clone()
    }

    fn send(&self, connection: ConnectionId, message: ServerMessage) {
        if let Some(conn) = self.connections.get(&connection)
            && conn.outbound.send(message).is_err()
        {
            debug!(connection, "Outbound channel closed");
        }
    }

    fn broadcast(&self, message: ServerMessage) {
        for (connection, conn) in &self.connections {
            if conn.outbound.send(message.clone()).is_err() {
                debug!(connection, "Outbound channel closed");
            }
        }
    }

    fn broadcast_tick(&self) {
        for (connection, conn) in &self.connections {
            let Some(player_id) = &conn.player_id else {
                continue;
            };
            let Some(view) = self.session.project_for(player_id) else {
                continue;
            };
            let tick = ServerMessage::Tick { game: view.into() };
            if conn.outbound.send(tick).is_err() {
                debug!(connection, "Outbound channel closed");
            }
        }
    }
}

fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

async fn sleep_until_due(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(tokio::time::Instant::from_std(at)).await,
        None => std::future::pending().await,
    }
}
