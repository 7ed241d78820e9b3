//! Cooperative session scenarios driven through the public API.

use std::time::Duration;
use wordduel::{
    CoopSession, GameOver, GameSession, JoinOutcome, ManualEnv, MatchConfig, Player, SessionError,
    TimeToGuess,
};

fn started(config: MatchConfig) -> (CoopSession<ManualEnv>, ManualEnv) {
    let env = ManualEnv::with_seed(3);
    let mut session: CoopSession<ManualEnv> = GameSession::new(config, env.clone());
    assert_eq!(session.add_player(Player::anon("a", "Ann")), Ok(JoinOutcome::Seated));
    assert_eq!(session.add_player(Player::anon("b", "Ben")), Ok(JoinOutcome::Started));
    (session, env)
}

fn turn_holder(session: &CoopSession<ManualEnv>) -> String {
    session
        .rules()
        .current_turn()
        .expect("match started")
        .to_string()
}

fn other(id: &str) -> &'static str {
    if id == "a" { "b" } else { "a" }
}

fn type_word(session: &mut CoopSession<ManualEnv>, id: &str, word: &str) {
    for letter in word.chars() {
        session.type_letter(id, Some(letter)).expect("letter accepted");
    }
}

#[test]
fn test_first_turn_goes_to_a_seated_player() {
    let (session, _) = started(MatchConfig::new("stone"));
    let first = turn_holder(&session);
    assert!(first == "a" || first == "b");
    assert_eq!(session.deadlines().len(), 1);
    assert!(session.deadlines().get(&first).is_some());
}

#[test]
fn test_rejoin_is_idempotent_and_third_player_refused() {
    let (mut session, _) = started(MatchConfig::new("stone"));
    let first = turn_holder(&session);
    type_word(&mut session, &first, "crane");
    assert_eq!(session.submit_guess(&first), Ok(None));
    let second = turn_holder(&session);
    session.type_letter(&second, Some('s')).expect("letter accepted");
    let deadline = session.deadlines().get(&second);

    assert_eq!(session.add_player(Player::anon("a", "Ann")), Ok(JoinOutcome::AlreadySeated));
    assert_eq!(session.add_player(Player::anon("b", "Ben")), Ok(JoinOutcome::AlreadySeated));

    assert_eq!(turn_holder(&session), second);
    assert_eq!(session.buffer(&second), Some("s"));
    assert_eq!(session.buffer(&first), Some(""));
    assert_eq!(session.rules().guesses().len(), 1);
    assert_eq!(session.rules().guesses()[0].raw(), "crane");
    assert_eq!(session.deadlines().get(&second), deadline);

    assert_eq!(session.add_player(Player::anon("c", "Cat")), Err(SessionError::SessionFull));
    assert_eq!(session.seats().len(), 2);
}

#[test]
fn test_actions_before_second_player_are_refused() {
    let mut session: CoopSession<ManualEnv> =
        GameSession::new(MatchConfig::new("stone"), ManualEnv::new());
    session.add_player(Player::anon("a", "Ann")).expect("join");

    assert_eq!(session.type_letter("a", Some('s')), Err(SessionError::WaitingForPlayers));
    assert_eq!(session.buffer("a"), Some(""));
    assert!(session.deadlines().is_empty());
}

#[test]
fn test_only_turn_holder_may_type() {
    let (mut session, _) = started(MatchConfig::new("stone"));
    let waiting = other(&turn_holder(&session));

    assert_eq!(
        session.type_letter(waiting, Some('s')),
        Err(SessionError::NotYourTurn(waiting.to_string()))
    );
    assert_eq!(session.buffer(waiting), Some(""));
}

#[test]
fn test_buffer_rules() {
    let (mut session, _) = started(MatchConfig::new("stone"));
    let holder = turn_holder(&session);

    assert_eq!(session.type_letter(&holder, Some('1')), Err(SessionError::InvalidLetter('1')));
    type_word(&mut session, &holder, "TONE");
    assert_eq!(session.buffer(&holder), Some("tone"));
    assert_eq!(
        session.submit_guess(&holder),
        Err(SessionError::IncompleteGuess { len: 4, expected: 5 })
    );

    type_word(&mut session, &holder, "s");
    assert_eq!(session.type_letter(&holder, Some('x')), Err(SessionError::BufferFull));

    session.type_letter(&holder, None).expect("backspace");
    assert_eq!(session.buffer(&holder), Some("tone"));
}

#[test]
fn test_wrong_guess_passes_turn_and_win_ends_match() {
    let (mut session, _) = started(MatchConfig::new("stone"));
    let first = turn_holder(&session);
    let second = other(&first);

    type_word(&mut session, &first, "crane");
    assert_eq!(session.submit_guess(&first), Ok(None));
    assert_eq!(turn_holder(&session), second);
    assert_eq!(session.buffer(&first), Some(""));
    assert_eq!(session.rules().guesses().len(), 1);

    type_word(&mut session, second, "stone");
    assert_eq!(
        session.submit_guess(second),
        Ok(Some(GameOver::Win { player_id: second.to_string() }))
    );
    assert!(session.is_game_over());
    assert!(session.deadlines().is_empty());

    assert_eq!(session.type_letter(&first, Some('a')), Err(SessionError::GameOver));
    assert_eq!(session.submit_guess(second), Err(SessionError::GameOver));
}

#[test]
fn test_cap_grows_by_one_per_guess_near_the_limit() {
    let (mut session, _) = started(MatchConfig::new("stone").with_max_guesses(3));
    let mut caps = Vec::new();

    for _ in 0..5 {
        let holder = turn_holder(&session);
        type_word(&mut session, &holder, "crane");
        assert_eq!(session.submit_guess(&holder), Ok(None));
        caps.push(session.rules().max_guesses());
    }

    // Never reached: the log always stays short of the cap.
    assert_eq!(caps, vec![3, 4, 5, 6, 7]);
    assert!(session.rules().guesses().len() < session.rules().max_guesses());
}

#[test]
fn test_timeout_ends_match_against_turn_holder() {
    let (mut session, env) = started(MatchConfig::new("stone"));
    let holder = turn_holder(&session);

    env.advance(Duration::from_secs(29));
    assert_eq!(session.advance(), None);

    env.advance(Duration::from_secs(1));
    assert_eq!(session.advance(), Some(GameOver::TimeLimit { player_id: holder }));
    assert!(session.deadlines().is_empty());
    assert_eq!(session.advance(), None);
}

#[test]
fn test_superseded_deadline_never_fires() {
    let (mut session, env) = started(MatchConfig::new("stone"));
    let first = turn_holder(&session);
    let second = other(&first);

    env.advance(Duration::from_secs(20));
    type_word(&mut session, &first, "crane");
    session.submit_guess(&first).expect("submit");

    // The first holder's original deadline has passed, the new one has not.
    env.advance(Duration::from_secs(15));
    assert_eq!(session.advance(), None);
    assert!(!session.is_game_over());

    env.advance(Duration::from_secs(15));
    assert_eq!(
        session.advance(),
        Some(GameOver::TimeLimit { player_id: second.to_string() })
    );
}

#[test]
fn test_untimed_match_never_expires() {
    let (mut session, env) =
        started(MatchConfig::new("stone").with_time_to_guess(TimeToGuess::Untimed));
    assert!(session.deadlines().is_empty());

    env.advance(Duration::from_secs(3600));
    assert_eq!(session.advance(), None);

    let view = session.project_for("a").expect("seated");
    assert_eq!(*view.guess_by_ms(), None);
}

#[test]
fn test_projection_hides_partner_buffer() {
    let (mut session, env) = started(MatchConfig::new("stone"));
    let holder = turn_holder(&session);
    type_word(&mut session, &holder, "cra");
    env.advance(Duration::from_secs(10));

    let own = session.project_for(&holder).expect("seated");
    assert_eq!(own.you().current_guess(), "cra");
    assert!(*own.you().is_current_turn());
    assert_eq!(*own.guess_by_ms(), Some(20_000));

    let theirs = session.project_for(other(&holder)).expect("seated");
    assert_eq!(theirs.others().len(), 1);
    assert_eq!(*theirs.others()[0].current_guess(), 3);
    assert!(*theirs.others()[0].is_current_turn());

    let json = serde_json::to_value(&theirs).expect("serialize");
    assert!(!json.to_string().contains("cra\""));
    assert_eq!(json["others"][0]["currentGuess"], 3);

    assert!(session.project_for("stranger").is_none());
}
