//! Live matches by mode and id.

use rand::Rng;
use rand::distr::Alphanumeric;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, instrument, warn};
use wordduel::{Cooperative, GameMode, GameSession, MatchConfig, Race, SystemEnv, TimeToGuess};

use crate::config::MatchDefaults;
use crate::dictionary::SolutionSource;
use crate::host::{self, HostServices, MatchHandle};
use crate::protocol::MatchId;

const MATCH_ID_LEN: usize = 6;

type MatchKey = (GameMode, MatchId);

/// Creates match hosts and finds them again by id.
///
/// The lock is only held for map lookups and inserts, never across an await.
#[derive(Debug, Clone)]
pub struct MatchRegistry {
    inner: Arc<RegistryInner>,
}

#[derive(Debug)]
struct RegistryInner {
    matches: Mutex<HashMap<MatchKey, MatchHandle>>,
    services: HostServices,
    solutions: Arc<SolutionSource>,
    defaults: MatchDefaults,
}

impl MatchRegistry {
    /// Creates an empty registry.
    #[instrument(skip_all)]
    pub fn new(services: HostServices, solutions: Arc<SolutionSource>, defaults: MatchDefaults) -> Self {
        info!(solutions = solutions.solutions().len(), "Creating match registry");
        Self {
            inner: Arc::new(RegistryInner {
                matches: Mutex::new(HashMap::new()),
                services,
                solutions,
                defaults,
            }),
        }
    }

    /// Creates a match under a fresh id with a random solution.
    ///
    /// Uses the mode's default time budget when `time_to_guess` is `None`.
    #[instrument(skip(self))]
    pub fn create(&self, mode: GameMode, time_to_guess: Option<TimeToGuess>) -> MatchHandle {
        let config = self.new_config(mode, time_to_guess);
        let mut matches = self.lock();
        let id = fresh_id(&matches, mode);
        self.spawn_into(&mut matches, id, mode, config)
    }

    /// Returns the live match at `id`, creating one with the default
    /// config when there is none.
    #[instrument(skip(self))]
    pub fn open(&self, mode: GameMode, id: &str) -> MatchHandle {
        let mut matches = self.lock();
        let key = (mode, id.to_string());
        if let Some(handle) = matches.get(&key).filter(|handle| !handle.is_closed()) {
            debug!("Found live match");
            return handle.clone();
        }
        let config = self.new_config(mode, None);
        self.spawn_into(&mut matches, id.to_string(), mode, config)
    }

    /// Starts a match under `id` with an explicit config.
    #[instrument(skip(self, config))]
    pub fn start(&self, id: &str, mode: GameMode, config: MatchConfig) -> MatchHandle {
        let mut matches = self.lock();
        self.spawn_into(&mut matches, id.to_string(), mode, config)
    }

    /// The live match at `id`, if any.
    pub fn get(&self, mode: GameMode, id: &str) -> Option<MatchHandle> {
        self.lock()
            .get(&(mode, id.to_string()))
            .filter(|handle| !handle.is_closed())
            .cloned()
    }

    /// Forgets the match at `id` once its host has stopped.
    ///
    /// A live match registered under the same id is left alone.
    #[instrument(skip(self))]
    pub fn remove(&self, mode: GameMode, id: &str) {
        let mut matches = self.lock();
        let key = (mode, id.to_string());
        if matches.get(&key).is_some_and(MatchHandle::is_closed) {
            matches.remove(&key);
            debug!("Match removed");
        }
    }

    /// Number of registered matches.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True when no match is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn new_config(&self, mode: GameMode, time_to_guess: Option<TimeToGuess>) -> MatchConfig {
        let solution = self.inner.solutions.random_solution();
        self.inner.defaults.config_for(mode, solution, time_to_guess)
    }

    fn spawn_into(
        &self,
        matches: &mut HashMap<MatchKey, MatchHandle>,
        id: MatchId,
        mode: GameMode,
        config: MatchConfig,
    ) -> MatchHandle {
        let services = self.inner.services.clone();
        let idle_timeout = *self.inner.defaults.idle_timeout();
        let handle = match mode {
            GameMode::Coop => host::spawn(
                id.clone(),
                GameSession::<Cooperative, _>::new(config, SystemEnv),
                services,
                self.clone(),
                idle_timeout,
            ),
            GameMode::Race => host::spawn(
                id.clone(),
                GameSession::<Race, _>::new(config, SystemEnv),
                services,
                self.clone(),
                idle_timeout,
            ),
        };
        if matches.insert((mode, id.clone()), handle.clone()).is_some() {
            warn!(match_id = %id, "Replaced a registered match");
        }
        info!(match_id = %id, %mode, "Match registered");
        handle
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<MatchKey, MatchHandle>> {
        match self.inner.matches.lock() {
            Ok(matches) => matches,
            Err(poisoned) => {
                warn!("Registry lock poisoned");
                poisoned.into_inner()
            }
        }
    }
}

fn fresh_id(matches: &HashMap<MatchKey, MatchHandle>, mode: GameMode) -> MatchId {
    loop {
        let id: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(MATCH_ID_LEN)
            .map(|b| char::from(b).to_ascii_lowercase())
            .collect();
        if !matches.contains_key(&(mode, id.clone())) {
            return id;
        }
    }
}
