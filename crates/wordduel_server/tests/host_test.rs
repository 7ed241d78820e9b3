//! Tests for the per-match host actor, driven through its mailbox.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use wordduel::{GameMode, GameOver, IdentityClass, MatchConfig, MatchResult};
use wordduel_server::{
    ConnectionId, DbError, GameView, HostCommand, HostServices, Identity, MatchHandle, MatchRegistry,
    Presence, ServerConfig, ServerMessage, SolutionSource, StatsStore, TokenIssuer, WordList,
};

type Recorded = (String, GameMode, MatchResult);

/// Forwards every recorded result to the test.
struct ChannelStats {
    tx: UnboundedSender<Recorded>,
}

impl StatsStore for ChannelStats {
    fn record(&self, player_id: &str, mode: GameMode, result: MatchResult) -> Result<(), DbError> {
        let _ = self.tx.send((player_id.to_string(), mode, result));
        Ok(())
    }
}

struct Harness {
    registry: MatchRegistry,
    presence: Presence,
    tokens: TokenIssuer,
    recorded: UnboundedReceiver<Recorded>,
}

fn harness() -> Harness {
    let (tx, recorded) = mpsc::unbounded_channel();
    let presence = Presence::new();
    let dictionary = WordList::from_words(["stone", "crane", "notes", "flank"]);
    let services = HostServices::new(Arc::new(dictionary), Arc::new(ChannelStats { tx }), presence.clone());
    let solutions = SolutionSource::new(["stone"]).expect("Solutions");
    let registry = MatchRegistry::new(services, Arc::new(solutions), ServerConfig::default().match_defaults());
    Harness {
        registry,
        presence,
        tokens: TokenIssuer::new(b"host-test-secret"),
        recorded,
    }
}

impl Harness {
    fn verified(&self, player_id: &str) -> Identity {
        let token = self
            .tokens
            .issue_for(player_id, IdentityClass::Verified)
            .expect("Sign failed");
        self.tokens.resolve(Some(&token)).expect("Resolve failed")
    }

    fn anon(&self) -> Identity {
        self.tokens.issue(IdentityClass::Anon).expect("Issue failed")
    }
}

struct Client {
    connection: ConnectionId,
    handle: MatchHandle,
    rx: UnboundedReceiver<ServerMessage>,
}

impl Client {
    async fn connect(handle: &MatchHandle, connection: ConnectionId) -> Self {
        let (outbound, rx) = mpsc::unbounded_channel();
        handle
            .send(HostCommand::Connect {
                connection,
                country: None,
                outbound,
            })
            .expect("Host closed");
        let mut client = Self {
            connection,
            handle: handle.clone(),
            rx,
        };
        assert_eq!(client.next().await, ServerMessage::Ready);
        client
    }

    async fn next(&mut self) -> ServerMessage {
        self.rx.recv().await.expect("Host hung up")
    }

    /// Skips frames until one satisfies `pred`.
    async fn until(&mut self, pred: impl Fn(&ServerMessage) -> bool) -> ServerMessage {
        loop {
            let message = self.next().await;
            if pred(&message) {
                return message;
            }
        }
    }

    fn drain(&mut self) -> Vec<ServerMessage> {
        let mut frames = Vec::new();
        while let Ok(message) = self.rx.try_recv() {
            frames.push(message);
        }
        frames
    }

    fn send(&self, command: HostCommand) {
        self.handle.send(command).expect("Host closed");
    }

    fn join(&self, identity: Identity, username: &str) {
        self.send(HostCommand::Join {
            connection: self.connection,
            identity,
            username: username.to_string(),
            country: None,
        });
    }

    fn type_word(&self, word: &str) {
        for letter in word.chars() {
            self.send(HostCommand::TypeLetter {
                connection: self.connection,
                letter: Some(letter),
            });
        }
    }

    fn backspace(&self) {
        self.send(HostCommand::TypeLetter {
            connection: self.connection,
            letter: None,
        });
    }

    fn submit(&self) {
        self.send(HostCommand::SubmitGuess {
            connection: self.connection,
        });
    }

    fn rematch(&self) {
        self.send(HostCommand::RequestRematch {
            connection: self.connection,
        });
    }

    fn leave(&self) {
        self.send(HostCommand::Disconnect {
            connection: self.connection,
        });
    }
}

fn is_game_over(message: &ServerMessage) -> bool {
    matches!(message, ServerMessage::GameOver { .. })
}

fn game_over_state(message: ServerMessage) -> GameOver {
    match message {
        ServerMessage::GameOver { state, .. } => state,
        other => panic!("Expected gameOver, got {:?}", other),
    }
}

/// Two verified players seated in a fresh race match.
async fn seated_race(h: &Harness, id: &str) -> (Client, Client) {
    let handle = h.registry.start(id, GameMode::Race, MatchConfig::new("stone"));
    let mut alice = Client::connect(&handle, 1).await;
    let mut bob = Client::connect(&handle, 2).await;

    alice.join(h.verified("alice"), "Alice");
    alice.until(|m| matches!(m, ServerMessage::Welcome { .. })).await;
    bob.join(h.verified("bob"), "Bob");
    bob.until(|m| matches!(m, ServerMessage::Welcome { .. })).await;
    bob.until(|m| matches!(m, ServerMessage::Tick { .. })).await;
    alice.drain();
    bob.drain();
    (alice, bob)
}

#[tokio::test(start_paused = true)]
async fn test_join_is_welcomed() {
    let h = harness();
    let handle = h.registry.start("m1", GameMode::Race, MatchConfig::new("stone"));
    let mut alice = Client::connect(&handle, 1).await;

    alice.join(h.verified("alice"), "Alice");
    assert_eq!(
        alice.next().await,
        ServerMessage::Welcome {
            player_id: "alice".to_string(),
            token: None,
        }
    );
    assert_eq!(h.presence.count(GameMode::Race), 1);
}

#[tokio::test(start_paused = true)]
async fn test_anonymous_join_hands_back_token() {
    let h = harness();
    let handle = h.registry.start("m1", GameMode::Coop, MatchConfig::new("stone"));
    let mut guest = Client::connect(&handle, 1).await;

    let identity = h.anon();
    let expected_id = identity.player_id().clone();
    guest.join(identity, "Guest");

    match guest.next().await {
        ServerMessage::Welcome { player_id, token } => {
            assert_eq!(player_id, expected_id);
            let token = token.expect("Anonymous join should carry a token");
            let claims = h.tokens.verify(&token).expect("Token should verify");
            assert_eq!(claims.sub(), &expected_id);
        }
        other => panic!("Expected welcome, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_third_player_gets_full_game() {
    let h = harness();
    let (_alice, _bob) = seated_race(&h, "m1").await;
    let handle = h.registry.get(GameMode::Race, "m1").expect("Match is live");

    let mut carol = Client::connect(&handle, 3).await;
    carol.join(h.verified("carol"), "Carol");
    assert_eq!(carol.next().await, ServerMessage::FullGame);
    assert_eq!(h.presence.count(GameMode::Race), 3);
}

#[tokio::test(start_paused = true)]
async fn test_bad_guess_goes_to_submitter_only() {
    let h = harness();
    let (mut alice, mut bob) = seated_race(&h, "m1").await;

    alice.type_word("zzzzz");
    alice.submit();
    alice.until(|m| *m == ServerMessage::BadGuess).await;
    assert!(bob.drain().iter().all(|m| *m != ServerMessage::BadGuess));

    alice.backspace();
    match alice.next().await {
        ServerMessage::Tick {
            game: GameView::Race(view),
        } => {
            assert_eq!(view.you().current_guess(), "zzzz");
            assert!(view.you().guesses().is_empty());
        }
        other => panic!("Expected tick, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_win_ends_match_and_records_verified_players() {
    let mut h = harness();
    let handle = h.registry.start("m1", GameMode::Race, MatchConfig::new("stone"));
    let mut alice = Client::connect(&handle, 1).await;
    let mut guest = Client::connect(&handle, 2).await;
    alice.join(h.verified("alice"), "Alice");
    guest.join(h.anon(), "Guest");

    alice.type_word("stone");
    alice.submit();

    let over = alice.until(is_game_over).await;
    match &over {
        ServerMessage::GameOver { solution, players, .. } => {
            assert_eq!(solution, "stone");
            assert_eq!(players.len(), 2);
        }
        other => panic!("Expected gameOver, got {:?}", other),
    }
    assert_eq!(
        game_over_state(over),
        GameOver::Win {
            player_id: "alice".to_string()
        }
    );
    assert!(is_game_over(&guest.until(is_game_over).await));

    let recorded = h.recorded.recv().await.expect("Result recorded");
    assert_eq!(recorded, ("alice".to_string(), GameMode::Race, MatchResult::Win));
}

#[tokio::test(start_paused = true)]
async fn test_silent_race_ends_without_guesses() {
    let h = harness();
    let (mut alice, _bob) = seated_race(&h, "m1").await;

    let over = alice.until(is_game_over).await;
    assert_eq!(game_over_state(over), GameOver::NoGuesses);
}

#[tokio::test(start_paused = true)]
async fn test_idle_player_loses_on_time() {
    let mut h = harness();
    let (mut alice, mut bob) = seated_race(&h, "m1").await;

    tokio::time::advance(Duration::from_secs(10)).await;
    alice.type_word("crane");
    alice.submit();

    let over = bob.until(is_game_over).await;
    assert_eq!(
        game_over_state(over),
        GameOver::TimeLimit {
            player_id: "bob".to_string()
        }
    );
    alice.until(is_game_over).await;

    let mut recorded = vec![
        h.recorded.recv().await.expect("First result"),
        h.recorded.recv().await.expect("Second result"),
    ];
    recorded.sort_by(|a, b| a.0.cmp(&b.0));
    assert_eq!(
        recorded,
        vec![
            ("alice".to_string(), GameMode::Race, MatchResult::Win),
            ("bob".to_string(), GameMode::Race, MatchResult::Loss),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_rematch_needs_both_players() {
    let h = harness();
    let (mut alice, mut bob) = seated_race(&h, "m1").await;
    alice.type_word("stone");
    alice.submit();
    alice.until(is_game_over).await;
    bob.until(is_game_over).await;

    alice.rematch();
    match bob.until(|m| matches!(m, ServerMessage::RematchStatus { .. })).await {
        ServerMessage::RematchStatus { consents } => {
            assert_eq!(consents.get("alice"), Some(&true));
            assert_ne!(consents.get("bob"), Some(&true));
        }
        other => panic!("Expected rematchStatus, got {:?}", other),
    }

    bob.rematch();
    let first = alice.until(|m| matches!(m, ServerMessage::NewMatch { .. })).await;
    let second = bob.until(|m| matches!(m, ServerMessage::NewMatch { .. })).await;
    assert_eq!(first, second);

    let ServerMessage::NewMatch { match_id } = first else {
        panic!("Expected newMatch");
    };
    assert_ne!(match_id, "m1");
    assert!(h.registry.get(GameMode::Race, &match_id).is_some());
}

#[tokio::test(start_paused = true)]
async fn test_leaving_during_rematch_sends_opponent_home() {
    let h = harness();
    let (mut alice, mut bob) = seated_race(&h, "m1").await;
    alice.type_word("stone");
    alice.submit();
    alice.until(is_game_over).await;
    bob.until(is_game_over).await;

    alice.rematch();
    bob.until(|m| matches!(m, ServerMessage::RematchStatus { .. })).await;
    bob.leave();

    alice.until(|m| *m == ServerMessage::GoHome).await;
    assert_eq!(h.presence.count(GameMode::Race), 1);
}

#[tokio::test(start_paused = true)]
async fn test_coop_wrong_guess_passes_turn() {
    let h = harness();
    let handle = h.registry.start("m1", GameMode::Coop, MatchConfig::new("stone"));
    let mut alice = Client::connect(&handle, 1).await;
    let mut bob = Client::connect(&handle, 2).await;
    alice.join(h.verified("alice"), "Alice");
    alice.until(|m| matches!(m, ServerMessage::Welcome { .. })).await;
    bob.join(h.verified("bob"), "Bob");

    let view = match bob.until(|m| matches!(m, ServerMessage::Tick { .. })).await {
        ServerMessage::Tick {
            game: GameView::Coop(view),
        } => view,
        other => panic!("Expected coop tick, got {:?}", other),
    };
    alice.drain();
    bob.drain();

    let (holder, waiter) = if *view.you().is_current_turn() {
        (&mut bob, &mut alice)
    } else {
        (&mut alice, &mut bob)
    };
    holder.type_word("crane");
    holder.submit();

    let after = waiter
        .until(|m| match m {
            ServerMessage::Tick {
                game: GameView::Coop(view),
            } => view.guesses().len() == 1,
            _ => false,
        })
        .await;
    match after {
        ServerMessage::Tick {
            game: GameView::Coop(view),
        } => assert!(*view.you().is_current_turn()),
        other => panic!("Expected coop tick, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_unvisited_match_closes_after_idle_timeout() {
    let h = harness();
    let handle = h.registry.create(GameMode::Race, None);
    assert_eq!(h.registry.len(), 1);

    tokio::time::sleep(Duration::from_secs(299)).await;
    assert!(!handle.is_closed());

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(handle.is_closed());
    assert!(h.registry.get(GameMode::Race, handle.id()).is_none());
    assert!(h.registry.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_connected_match_is_not_reaped() {
    let h = harness();
    let handle = h.registry.create(GameMode::Coop, None);
    let _alice = Client::connect(&handle, 1).await;

    tokio::time::sleep(Duration::from_secs(3600)).await;
    assert!(!handle.is_closed());
    assert_eq!(h.registry.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_empty_match_reaped_after_last_player_leaves() {
    let h = harness();
    let handle = h.registry.start("m1", GameMode::Race, MatchConfig::new("stone"));
    let alice = Client::connect(&handle, 1).await;
    alice.join(h.verified("alice"), "Alice");
    alice.leave();

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(handle.is_closed());
    assert!(h.registry.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_match_still_settles_and_records() {
    let mut h = harness();
    let (alice, bob) = seated_race(&h, "m1").await;
    let handle = alice.handle.clone();

    tokio::time::advance(Duration::from_secs(10)).await;
    alice.type_word("crane");
    alice.submit();
    alice.leave();
    bob.leave();

    let mut recorded = vec![
        h.recorded.recv().await.expect("First result"),
        h.recorded.recv().await.expect("Second result"),
    ];
    recorded.sort_by(|a, b| a.0.cmp(&b.0));
    assert_eq!(
        recorded,
        vec![
            ("alice".to_string(), GameMode::Race, MatchResult::Win),
            ("bob".to_string(), GameMode::Race, MatchResult::Loss),
        ]
    );
    assert!(handle.is_closed());
    assert!(h.registry.get(GameMode::Race, "m1").is_none());
}
