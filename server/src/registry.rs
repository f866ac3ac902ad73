//! Process-wide table of sessions, waiting queues and running engines
//!
//! The registry is a plain data structure; [`crate::context::ServerContext`]
//! wraps it in a lock so the listener, the matchmaking task, the session tasks
//! and the engines all mutate it through the same single-writer path.
//!
//! Membership invariants kept here:
//! - a session sits in at most one waiting queue,
//! - a session is never queued and seated at the same time,
//! - a seat is released at most once per engine instance.

use crate::error::{Result, ServerError};
use crate::games::Seat;
use crate::queue::{GameKind, QueueKey};
use crate::session::{Outbound, Session};
use log::{debug, info};
use rand::Rng;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Where a session currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Membership {
    Idle,
    Queued(QueueKey),
    Playing { kind: GameKind, instance: u32 },
}

enum Slot {
    Idle,
    Queued(QueueKey),
    Playing {
        kind: GameKind,
        instance: u32,
        /// Lines typed by the client are forwarded here to the engine
        input: mpsc::UnboundedSender<String>,
    },
}

impl Slot {
    fn membership(&self) -> Membership {
        match self {
            Slot::Idle => Membership::Idle,
            Slot::Queued(key) => Membership::Queued(*key),
            Slot::Playing { kind, instance, .. } => Membership::Playing {
                kind: *kind,
                instance: *instance,
            },
        }
    }
}

struct Entry {
    session: Arc<Session>,
    slot: Slot,
}

/// Participants handed to a new engine by [`Registry::form_matches`].
pub struct Lineup {
    pub key: QueueKey,
    pub instance: u32,
    pub seats: Vec<Seat>,
}

pub struct Registry {
    sessions: BTreeMap<u64, Entry>,
    queues: BTreeMap<QueueKey, Vec<u64>>,
    /// Running engines and the ids seated at them
    running: BTreeMap<(GameKind, u32), Vec<u64>>,
    next_session_id: u64,
    instances: HashMap<GameKind, u32>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Creates an empty registry offering every queue from [`QueueKey::all`].
    pub fn new() -> Self {
        Self {
            sessions: BTreeMap::new(),
            queues: QueueKey::all().into_iter().map(|key| (key, Vec::new())).collect(),
            running: BTreeMap::new(),
            next_session_id: 1,
            instances: HashMap::new(),
        }
    }

    /// Allocates an id and records a new idle session.
    pub fn register(&mut self, outbound: mpsc::UnboundedSender<Outbound>) -> Arc<Session> {
        let id = self.next_session_id;
        self.next_session_id += 1;

        let session = Arc::new(Session::new(id, outbound));
        self.sessions.insert(
            id,
            Entry {
                session: Arc::clone(&session),
                slot: Slot::Idle,
            },
        );
        session
    }

    pub fn session(&self, id: u64) -> Option<Arc<Session>> {
        self.sessions.get(&id).map(|e| Arc::clone(&e.session))
    }

    pub fn membership(&self, id: u64) -> Option<Membership> {
        self.sessions.get(&id).map(|e| e.slot.membership())
    }

    /// Puts an idle session at the back of a queue.
    pub fn enqueue(&mut self, id: u64, key: QueueKey) -> Result<()> {
        let entry = self
            .sessions
            .get_mut(&id)
            .ok_or(ServerError::UnknownSession(id))?;

        match entry.slot {
            Slot::Queued(_) => return Err(ServerError::AlreadyQueued(id)),
            Slot::Playing { .. } => return Err(ServerError::AlreadyPlaying(id)),
            Slot::Idle => {}
        }
        if !entry.session.is_connected() {
            return Err(ServerError::NotConnected(id));
        }

        let queue = self
            .queues
            .get_mut(&key)
            .ok_or_else(|| ServerError::UnknownQueue(key.to_string()))?;
        queue.push(id);
        entry.slot = Slot::Queued(key);
        debug!("Client {} queued for {}", id, key);
        Ok(())
    }

    /// Takes a session out of its queue. Returns the queue it was in.
    pub fn leave_queue(&mut self, id: u64) -> Option<QueueKey> {
        let entry = self.sessions.get_mut(&id)?;
        let Slot::Queued(key) = entry.slot else {
            return None;
        };

        if let Some(queue) = self.queues.get_mut(&key) {
            queue.retain(|&queued| queued != id);
        }
        entry.slot = Slot::Idle;
        Some(key)
    }

    /// Channel to the engine a session is seated at, if any.
    pub fn game_input(&self, id: u64) -> Option<mpsc::UnboundedSender<String>> {
        match &self.sessions.get(&id)?.slot {
            Slot::Playing { input, .. } => Some(input.clone()),
            _ => None,
        }
    }

    /// Forgets a session. Its queue entry goes with it, and dropping its seat
    /// channel tells the engine it is gone.
    pub fn remove(&mut self, id: u64) -> Option<Arc<Session>> {
        self.leave_queue(id);
        let entry = self.sessions.remove(&id)?;
        Some(entry.session)
    }

    /// Removes every session whose transport has closed.
    pub fn sweep_disconnected(&mut self) -> Vec<Arc<Session>> {
        let ghosts: Vec<u64> = self
            .sessions
            .values()
            .filter(|e| !e.session.is_connected())
            .map(|e| e.session.id())
            .collect();

        ghosts.into_iter().filter_map(|id| self.remove(id)).collect()
    }

    /// Every queued session with its queue, in queue order.
    pub fn queued(&self) -> Vec<(QueueKey, Arc<Session>)> {
        self.queues
            .iter()
            .flat_map(|(key, ids)| {
                ids.iter()
                    .filter_map(|id| self.sessions.get(id))
                    .map(move |e| (*key, Arc::clone(&e.session)))
            })
            .collect()
    }

    pub fn queue_len(&self, key: &QueueKey) -> usize {
        self.queues.get(key).map_or(0, Vec::len)
    }

    /// Drains full tables out of every queue. Players are picked uniformly at
    /// random, so joining first gives no advantage.
    pub fn form_matches<R: Rng>(&mut self, rng: &mut R) -> Vec<Lineup> {
        let mut lineups = Vec::new();

        for (key, queue) in self.queues.iter_mut() {
            while queue.len() >= key.players() {
                let picked: Vec<u64> = (0..key.players())
                    .map(|_| queue.remove(rng.gen_range(0..queue.len())))
                    .collect();

                let counter = self.instances.entry(key.kind()).or_insert(0);
                *counter += 1;
                let instance = *counter;

                let mut seats = Vec::with_capacity(picked.len());
                for id in &picked {
                    let Some(entry) = self.sessions.get_mut(id) else {
                        continue;
                    };
                    let (input, rx) = mpsc::unbounded_channel();
                    entry.slot = Slot::Playing {
                        kind: key.kind(),
                        instance,
                        input,
                    };
                    seats.push(Seat::new(Arc::clone(&entry.session), rx));
                }

                info!(
                    "Starting {}{} with clients {:?}",
                    key.kind(),
                    instance,
                    picked
                );
                self.running.insert((key.kind(), instance), picked);
                lineups.push(Lineup {
                    key: *key,
                    instance,
                    seats,
                });
            }
        }

        lineups
    }

    /// Returns a seated session to idle. Only the first call for a given
    /// engine instance has an effect.
    pub fn release(&mut self, id: u64, kind: GameKind, instance: u32) -> bool {
        let Some(entry) = self.sessions.get_mut(&id) else {
            return false;
        };
        match entry.slot {
            Slot::Playing {
                kind: k,
                instance: i,
                ..
            } if k == kind && i == instance => {
                entry.slot = Slot::Idle;
                entry.session.set_turn(false);
                true
            }
            _ => false,
        }
    }

    pub fn game_finished(&mut self, kind: GameKind, instance: u32) {
        self.running.remove(&(kind, instance));
    }

    pub fn sessions(&self) -> Vec<Arc<Session>> {
        self.sessions.values().map(|e| Arc::clone(&e.session)).collect()
    }

    /// Queue names with the sessions waiting in each.
    pub fn queues(&self) -> Vec<(QueueKey, Vec<Arc<Session>>)> {
        self.queues
            .iter()
            .map(|(key, ids)| {
                let members = ids.iter().filter_map(|id| self.session(*id)).collect();
                (*key, members)
            })
            .collect()
    }

    /// Running engines as `(kind, instance, seated ids)`.
    pub fn running(&self) -> Vec<(GameKind, u32, Vec<u64>)> {
        self.running
            .iter()
            .map(|((kind, instance), ids)| (*kind, *instance, ids.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn register(registry: &mut Registry) -> (Arc<Session>, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (registry.register(tx), rx)
    }

    fn morpion() -> QueueKey {
        QueueKey::new(GameKind::TicTacToe, 2).unwrap()
    }

    fn blackjack(players: usize) -> QueueKey {
        QueueKey::new(GameKind::Blackjack, players).unwrap()
    }

    #[test]
    fn test_registry_creation() {
        let registry = Registry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.queues().len(), QueueKey::all().len());
    }

    #[test]
    fn test_ids_are_monotonic() {
        let mut registry = Registry::new();
        let (a, _ra) = register(&mut registry);
        let (b, _rb) = register(&mut registry);
        registry.remove(a.id());
        let (c, _rc) = register(&mut registry);

        assert_eq!(a.id(), 1);
        assert_eq!(b.id(), 2);
        assert_eq!(c.id(), 3);
    }

    #[test]
    fn test_enqueue_once() {
        let mut registry = Registry::new();
        let (s, _rx) = register(&mut registry);

        registry.enqueue(s.id(), morpion()).unwrap();
        assert_eq!(registry.membership(s.id()), Some(Membership::Queued(morpion())));

        let again = registry.enqueue(s.id(), blackjack(3));
        assert!(matches!(again, Err(ServerError::AlreadyQueued(_))));
        assert_eq!(registry.queue_len(&morpion()), 1);
        assert_eq!(registry.queue_len(&blackjack(3)), 0);
    }

    #[test]
    fn test_enqueue_unknown_or_disconnected() {
        let mut registry = Registry::new();
        assert!(matches!(
            registry.enqueue(42, morpion()),
            Err(ServerError::UnknownSession(42))
        ));

        let (s, _rx) = register(&mut registry);
        s.mark_disconnected();
        assert!(matches!(
            registry.enqueue(s.id(), morpion()),
            Err(ServerError::NotConnected(_))
        ));
    }

    #[test]
    fn test_leave_queue() {
        let mut registry = Registry::new();
        let (s, _rx) = register(&mut registry);

        assert_eq!(registry.leave_queue(s.id()), None);
        registry.enqueue(s.id(), blackjack(4)).unwrap();
        assert_eq!(registry.leave_queue(s.id()), Some(blackjack(4)));
        assert_eq!(registry.membership(s.id()), Some(Membership::Idle));
        assert_eq!(registry.queue_len(&blackjack(4)), 0);
    }

    #[test]
    fn test_form_matches_takes_exactly_one_table() {
        let mut registry = Registry::new();
        let sessions: Vec<_> = (0..3).map(|_| register(&mut registry)).collect();
        for (s, _) in &sessions {
            registry.enqueue(s.id(), morpion()).unwrap();
        }

        let mut rng = StdRng::seed_from_u64(1);
        let lineups = registry.form_matches(&mut rng);

        assert_eq!(lineups.len(), 1);
        let lineup = &lineups[0];
        assert_eq!(lineup.key, morpion());
        assert_eq!(lineup.instance, 1);
        assert_eq!(lineup.seats.len(), 2);

        let seated: HashSet<u64> = lineup.seats.iter().map(|s| s.session().id()).collect();
        assert_eq!(seated.len(), 2);
        assert_eq!(registry.queue_len(&morpion()), 1);

        for (s, _) in &sessions {
            let membership = registry.membership(s.id()).unwrap();
            if seated.contains(&s.id()) {
                assert_eq!(
                    membership,
                    Membership::Playing {
                        kind: GameKind::TicTacToe,
                        instance: 1
                    }
                );
                assert!(registry.game_input(s.id()).is_some());
            } else {
                assert_eq!(membership, Membership::Queued(morpion()));
            }
        }
        assert_eq!(registry.running().len(), 1);
    }

    #[test]
    fn test_form_matches_drains_several_tables() {
        let mut registry = Registry::new();
        let sessions: Vec<_> = (0..7).map(|_| register(&mut registry)).collect();
        for (s, _) in &sessions {
            registry.enqueue(s.id(), blackjack(3)).unwrap();
        }

        let mut rng = StdRng::seed_from_u64(9);
        let lineups = registry.form_matches(&mut rng);

        assert_eq!(lineups.len(), 2);
        assert_eq!(lineups[0].instance, 1);
        assert_eq!(lineups[1].instance, 2);
        assert_eq!(registry.queue_len(&blackjack(3)), 1);

        let seated: HashSet<u64> = lineups
            .iter()
            .flat_map(|l| l.seats.iter().map(|s| s.session().id()))
            .collect();
        assert_eq!(seated.len(), 6);
    }

    #[test]
    fn test_form_matches_below_required_count() {
        let mut registry = Registry::new();
        let (s, _rx) = register(&mut registry);
        registry.enqueue(s.id(), blackjack(2)).unwrap();

        let mut rng = StdRng::seed_from_u64(3);
        assert!(registry.form_matches(&mut rng).is_empty());
        assert_eq!(registry.membership(s.id()), Some(Membership::Queued(blackjack(2))));
    }

    #[test]
    fn test_selection_has_no_positional_bias() {
        // With 3 waiting and 2 seats, the last one to queue must sometimes play
        let mut rng = StdRng::seed_from_u64(11);
        let mut last_seated = 0;

        for _ in 0..200 {
            let mut registry = Registry::new();
            let sessions: Vec<_> = (0..3).map(|_| register(&mut registry)).collect();
            for (s, _) in &sessions {
                registry.enqueue(s.id(), morpion()).unwrap();
            }
            let lineups = registry.form_matches(&mut rng);
            if lineups[0].seats.iter().any(|seat| seat.session().id() == 3) {
                last_seated += 1;
            }
        }

        assert!(last_seated > 80 && last_seated < 190, "seated {} times", last_seated);
    }

    #[test]
    fn test_release_is_exactly_once() {
        let mut registry = Registry::new();
        let (a, _ra) = register(&mut registry);
        let (b, _rb) = register(&mut registry);
        registry.enqueue(a.id(), morpion()).unwrap();
        registry.enqueue(b.id(), morpion()).unwrap();

        let mut rng = StdRng::seed_from_u64(5);
        let lineups = registry.form_matches(&mut rng);
        let instance = lineups[0].instance;

        assert!(registry.release(a.id(), GameKind::TicTacToe, instance));
        assert!(!registry.release(a.id(), GameKind::TicTacToe, instance));
        assert_eq!(registry.membership(a.id()), Some(Membership::Idle));

        // A stale release from another engine does not touch the seat
        assert!(!registry.release(b.id(), GameKind::TicTacToe, instance + 1));
        assert!(!registry.release(b.id(), GameKind::Blackjack, instance));
        assert!(registry.release(b.id(), GameKind::TicTacToe, instance));
    }

    #[test]
    fn test_remove_drops_seat_channel() {
        let mut registry = Registry::new();
        let (a, _ra) = register(&mut registry);
        let (b, _rb) = register(&mut registry);
        registry.enqueue(a.id(), morpion()).unwrap();
        registry.enqueue(b.id(), morpion()).unwrap();

        let mut rng = StdRng::seed_from_u64(5);
        let mut lineups = registry.form_matches(&mut rng);
        let mut seats = std::mem::take(&mut lineups[0].seats);
        let position = seats.iter().position(|s| s.session().id() == a.id()).unwrap();
        let mut seat = seats.swap_remove(position);

        registry.remove(a.id());
        assert!(seat.try_next_line().is_err());
        assert_eq!(registry.membership(a.id()), None);
    }

    #[test]
    fn test_sweep_disconnected() {
        let mut registry = Registry::new();
        let (a, _ra) = register(&mut registry);
        let (b, _rb) = register(&mut registry);
        registry.enqueue(a.id(), blackjack(2)).unwrap();
        registry.enqueue(b.id(), blackjack(2)).unwrap();

        a.mark_disconnected();
        let swept = registry.sweep_disconnected();

        assert_eq!(swept.len(), 1);
        assert_eq!(swept[0].id(), a.id());
        assert_eq!(registry.queue_len(&blackjack(2)), 1);
        assert_eq!(registry.len(), 1);

        let mut rng = StdRng::seed_from_u64(2);
        assert!(registry.form_matches(&mut rng).is_empty());
    }

    #[test]
    fn test_queued_listing() {
        let mut registry = Registry::new();
        let (a, _ra) = register(&mut registry);
        let (b, _rb) = register(&mut registry);
        registry.enqueue(a.id(), blackjack(5)).unwrap();
        registry.enqueue(b.id(), morpion()).unwrap();

        let queued: Vec<(QueueKey, u64)> = registry
            .queued()
            .into_iter()
            .map(|(key, s)| (key, s.id()))
            .collect();
        assert!(queued.contains(&(blackjack(5), a.id())));
        assert!(queued.contains(&(morpion(), b.id())));
        assert_eq!(queued.len(), 2);
    }
}
