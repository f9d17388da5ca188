use std::cell::RefCell;

use serde::{Deserialize, Serialize};

use crate::config::{store_config, StoreConfig};
use crate::constants::{DEFAULT_GREETING, DEFAULT_USERNAME};
use crate::error::StoreError;
use crate::messages::Mutation;
use crate::update::update;

/// The state record every mutation operates on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreState {
    pub msg: String,
    pub username: String,
}

impl Default for StoreState {
    fn default() -> Self {
        Self {
            msg: DEFAULT_GREETING.to_string(),
            username: DEFAULT_USERNAME.to_string(),
        }
    }
}

/// Callback run after every commit with the mutation that was applied and
/// the resulting state.
pub type Subscriber = Box<dyn FnMut(&Mutation, &StoreState)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u32);

impl SubscriptionId {
    pub fn as_u32(self) -> u32 {
        self.0
    }

    pub fn from_u32(raw: u32) -> Self {
        Self(raw)
    }
}

/// Owns the state record and the subscribers watching it.
pub struct Store {
    state: StoreState,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    // Ids of subscribers handed out by `begin_notify` and still registered.
    detached: Vec<SubscriptionId>,
    notifying: bool,
    next_subscription: u32,
    committed: u64,
}

impl Default for Store {
    fn default() -> Self {
        Self::new(StoreState::default())
    }
}

impl Store {
    pub fn new(state: StoreState) -> Self {
        Self {
            state,
            subscribers: Vec::new(),
            detached: Vec::new(),
            notifying: false,
            next_subscription: 0,
            committed: 0,
        }
    }

    pub fn with_config(config: &StoreConfig) -> Self {
        Self::new(StoreState {
            msg: DEFAULT_GREETING.to_string(),
            username: config.initial_username.clone(),
        })
    }

    pub fn state(&self) -> &StoreState {
        &self.state
    }

    /// Number of mutations applied so far.
    pub fn committed(&self) -> u64 {
        self.committed
    }

    /// Apply one mutation, then notify subscribers in registration order.
    pub fn commit(&mut self, mutation: Mutation) {
        self.apply(mutation.clone());

        for (_, subscriber) in self.subscribers.iter_mut() {
            subscriber(&mutation, &self.state);
        }
    }

    /// Name-dispatched commit, the shape the JS host calls with.
    pub fn commit_named(&mut self, name: &str, payload: Option<String>) -> Result<(), StoreError> {
        let mutation = Mutation::from_name(name, payload)?;
        self.commit(mutation);
        Ok(())
    }

    fn apply(&mut self, mutation: Mutation) {
        crate::store_log!(debug, "commit {}", mutation.name());

        update(&mut self.state, mutation);
        self.committed += 1;
    }

    /// Ids are never reused while still registered, even after the counter
    /// wraps around.
    pub fn subscribe(&mut self, subscriber: Subscriber) -> SubscriptionId {
        let mut id = SubscriptionId(self.next_subscription);
        while self.is_registered(id) {
            id = SubscriptionId(id.0.wrapping_add(1));
        }
        self.next_subscription = id.0.wrapping_add(1);
        self.subscribers.push((id, subscriber));
        id
    }

    /// Returns `false` when the id was not (or no longer) registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub_id, _)| *sub_id != id);
        if self.subscribers.len() != before {
            return true;
        }
        match self.detached.iter().position(|sub_id| *sub_id == id) {
            Some(pos) => {
                self.detached.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn is_registered(&self, id: SubscriptionId) -> bool {
        self.detached.contains(&id) || self.subscribers.iter().any(|(sub_id, _)| *sub_id == id)
    }

    /// Swap in a whole new state record, e.g. when hydrating from storage.
    /// Subscribers are not notified and the commit counter is untouched.
    pub fn replace_state(&mut self, state: StoreState) {
        self.state = state;
    }

    // Hand the subscribers out so they can run without the store borrowed.
    // They stay registered (via `detached`) until `end_notify` takes them back.
    fn begin_notify(&mut self) -> Vec<(SubscriptionId, Subscriber)> {
        self.notifying = true;
        let subscribers = std::mem::take(&mut self.subscribers);
        self.detached = subscribers.iter().map(|(id, _)| *id).collect();
        subscribers
    }

    fn end_notify(&mut self, subscribers: Vec<(SubscriptionId, Subscriber)>) {
        // The store was replaced while notifying; the old subscribers go with it.
        if !self.notifying {
            return;
        }
        let added = std::mem::take(&mut self.subscribers);
        let detached = std::mem::take(&mut self.detached);
        self.subscribers = subscribers
            .into_iter()
            .filter(|(id, _)| detached.contains(id))
            .chain(added)
            .collect();
        self.notifying = false;
    }
}

// We use thread_local to store the global store
thread_local! {
    pub static STORE: RefCell<Store> = RefCell::new(Store::with_config(&store_config()));
}

/// Read access to the global store.
pub fn with_store<R>(f: impl FnOnce(&Store) -> R) -> Result<R, StoreError> {
    STORE.with(|store| {
        let store = store.try_borrow().map_err(|_| StoreError::Reentrant)?;
        Ok(f(&store))
    })
}

/// Write access to the global store.
pub fn with_store_mut<R>(f: impl FnOnce(&mut Store) -> R) -> Result<R, StoreError> {
    STORE.with(|store| {
        let mut store = store.try_borrow_mut().map_err(|_| StoreError::Reentrant)?;
        Ok(f(&mut store))
    })
}

/// Commit a mutation to the global store, save the result when persistence
/// is on, then notify subscribers.
///
/// Subscribers run with the store released, so they may read it, subscribe
/// or unsubscribe. Committing from inside a subscriber fails with
/// [`StoreError::Reentrant`].
pub fn dispatch_global_mutation(mutation: Mutation) -> Result<(), StoreError> {
    let (snapshot, mut subscribers) = with_store_mut(|store| {
        if store.notifying {
            return Err(StoreError::Reentrant);
        }
        store.apply(mutation.clone());
        Ok((store.state().clone(), store.begin_notify()))
    })??;

    let config = store_config();
    if config.persist {
        if let Err(e) = crate::storage::save_state(&snapshot, &config.storage_key) {
            crate::store_log!(warn, "Failed to save state: {}", e);
        }
    }

    for (id, subscriber) in subscribers.iter_mut() {
        // Skip anything unsubscribed by an earlier callback in this round.
        if matches!(with_store(|store| store.is_registered(*id)), Ok(true)) {
            subscriber(&mutation, &snapshot);
        }
    }

    with_store_mut(|store| store.end_notify(subscribers))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn default_state_starts_with_greeting() {
        let state = StoreState::default();
        assert_eq!(state.msg, "Hello ");
        assert_eq!(state.username, "");
    }

    #[test]
    fn with_config_seeds_username() {
        let config = StoreConfig {
            initial_username: "Alice".to_string(),
            ..StoreConfig::default()
        };
        let store = Store::with_config(&config);
        assert_eq!(store.state().username, "Alice");
        assert_eq!(store.state().msg, "Hello ");
    }

    #[test]
    fn commit_named_applies_and_counts() {
        let mut store = Store::default();
        store.commit_named("setUserName", Some("Alice".to_string())).unwrap();
        store.commit_named("setMsg", None).unwrap();

        assert_eq!(store.state().msg, "Hello Alice");
        assert_eq!(store.committed(), 2);
    }

    #[test]
    fn failed_parse_leaves_state_alone() {
        let mut store = Store::default();
        let err = store.commit_named("nope", None).unwrap_err();

        assert_eq!(err, StoreError::UnknownMutation("nope".to_string()));
        assert_eq!(store.state(), &StoreState::default());
        assert_eq!(store.committed(), 0);
    }

    #[test]
    fn subscribers_see_post_mutation_state_in_order() {
        let seen: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
        let mut store = Store::default();

        let first = seen.clone();
        store.subscribe(Box::new(move |m: &Mutation, s: &StoreState| {
            first.borrow_mut().push(format!("first:{}:{}", m.name(), s.username));
        }));
        let second = seen.clone();
        store.subscribe(Box::new(move |m: &Mutation, s: &StoreState| {
            second.borrow_mut().push(format!("second:{}:{}", m.name(), s.username));
        }));

        store.commit(Mutation::SetUserName("Bob".to_string()));

        assert_eq!(
            *seen.borrow(),
            vec!["first:setUserName:Bob".to_string(), "second:setUserName:Bob".to_string()]
        );
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let calls = Rc::new(RefCell::new(0u32));
        let mut store = Store::default();

        let counter = calls.clone();
        let id = store.subscribe(Box::new(move |_: &Mutation, _: &StoreState| *counter.borrow_mut() += 1));

        store.commit(Mutation::ResetMsg);
        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));
        store.commit(Mutation::ResetMsg);

        assert_eq!(*calls.borrow(), 1);
    }

    #[test]
    fn replace_state_is_silent() {
        let calls = Rc::new(RefCell::new(0u32));
        let mut store = Store::default();
        let counter = calls.clone();
        store.subscribe(Box::new(move |_: &Mutation, _: &StoreState| *counter.borrow_mut() += 1));

        let hydrated = StoreState {
            msg: "Hello Zoe".to_string(),
            username: "Zoe".to_string(),
        };
        store.replace_state(hydrated.clone());

        assert_eq!(store.state(), &hydrated);
        assert_eq!(store.committed(), 0);
        assert_eq!(*calls.borrow(), 0);
    }

    #[test]
    fn global_dispatch_and_reentrancy() {
        with_store_mut(|store| *store = Store::default()).unwrap();

        let nested: Rc<RefCell<Option<Result<(), StoreError>>>> = Rc::new(RefCell::new(None));
        let slot = nested.clone();
        with_store_mut(|store| {
            store.subscribe(Box::new(move |_: &Mutation, _: &StoreState| {
                *slot.borrow_mut() = Some(dispatch_global_mutation(Mutation::SetMsg));
            }))
        })
        .unwrap();

        dispatch_global_mutation(Mutation::SetUserName("Alice".to_string())).unwrap();

        assert_eq!(*nested.borrow(), Some(Err(StoreError::Reentrant)));
        let state = with_store(|store| store.state().clone()).unwrap();
        assert_eq!(state.username, "Alice");
        assert_eq!(state.msg, "Hello ");
    }
    #[test]
    fn subscriber_can_read_store_and_unsubscribe_itself() {
        use std::cell::Cell;

        with_store_mut(|store| *store = Store::default()).unwrap();

        let read: Rc<RefCell<Vec<Result<String, StoreError>>>> = Rc::new(RefCell::new(Vec::new()));
        let own_id: Rc<Cell<Option<SubscriptionId>>> = Rc::new(Cell::new(None));

        let reads = read.clone();
        let me = own_id.clone();
        let id = with_store_mut(|store| {
            store.subscribe(Box::new(move |_: &Mutation, _: &StoreState| {
                reads.borrow_mut().push(with_store(|s| s.state().msg.clone()));
                if let Some(id) = me.get() {
                    assert_eq!(with_store_mut(|s| s.unsubscribe(id)), Ok(true));
                }
            }))
        })
        .unwrap();
        own_id.set(Some(id));

        dispatch_global_mutation(Mutation::ResetMsg).unwrap();
        dispatch_global_mutation(Mutation::ResetMsg).unwrap();

        assert_eq!(*read.borrow(), vec![Ok("Hello ".to_string())]);
        assert_eq!(with_store(|s| s.is_registered(id)), Ok(false));
        assert_eq!(with_store(|s| s.committed()), Ok(2));
    }

    #[test]
    fn unsubscribed_mid_round_is_skipped_and_new_subscribers_are_kept() {
        with_store_mut(|store| *store = Store::default()).unwrap();

        let seen: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));
        let later: Rc<RefCell<Option<SubscriptionId>>> = Rc::new(RefCell::new(None));

        let first_seen = seen.clone();
        let victim = later.clone();
        let added_seen = seen.clone();
        with_store_mut(|store| {
            store.subscribe(Box::new(move |_: &Mutation, _: &StoreState| {
                first_seen.borrow_mut().push("first");
                if let Some(id) = victim.borrow_mut().take() {
                    with_store_mut(|s| s.unsubscribe(id)).unwrap();
                    let added_seen = added_seen.clone();
                    with_store_mut(|s| {
                        s.subscribe(Box::new(move |_: &Mutation, _: &StoreState| {
                            added_seen.borrow_mut().push("added");
                        }))
                    })
                    .unwrap();
                }
            }))
        })
        .unwrap();
        let second_seen = seen.clone();
        let second = with_store_mut(|store| {
            store.subscribe(Box::new(move |_: &Mutation, _: &StoreState| {
                second_seen.borrow_mut().push("second");
            }))
        })
        .unwrap();
        *later.borrow_mut() = Some(second);

        dispatch_global_mutation(Mutation::SetMsg).unwrap();
        assert_eq!(*seen.borrow(), vec!["first"]);

        dispatch_global_mutation(Mutation::SetMsg).unwrap();
        assert_eq!(*seen.borrow(), vec!["first", "first", "added"]);
    }

    #[test]
    fn subscription_ids_skip_live_ids_after_wrapping() {
        let mut store = Store::default();
        let zero = store.subscribe(Box::new(|_: &Mutation, _: &StoreState| {}));
        assert_eq!(zero.as_u32(), 0);

        store.next_subscription = u32::MAX;
        let max = store.subscribe(Box::new(|_: &Mutation, _: &StoreState| {}));
        let wrapped = store.subscribe(Box::new(|_: &Mutation, _: &StoreState| {}));

        assert_eq!(max.as_u32(), u32::MAX);
        assert_eq!(wrapped.as_u32(), 1);
        assert!(store.unsubscribe(zero));
        assert!(store.is_registered(wrapped));
    }
}
