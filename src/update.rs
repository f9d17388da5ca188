// src/update.rs
//
// The mutator table. Every mutation is a plain assignment on the state
// record; `update` is the single place that maps a `Mutation` onto one.
//
use crate::constants::DEFAULT_GREETING;
use crate::messages::Mutation;
use crate::state::StoreState;

pub fn update(state: &mut StoreState, mutation: Mutation) {
    match mutation {
        Mutation::SetMsg => set_msg(state),
        Mutation::ResetMsg => reset_msg(state),
        Mutation::SetUserName(name) => set_user_name(state, name),
    }
}

/// `msg := msg + username`. Not idempotent.
pub fn set_msg(state: &mut StoreState) {
    state.msg.push_str(&state.username);
}

/// `msg := "Hello "`.
pub fn reset_msg(state: &mut StoreState) {
    state.msg.clear();
    state.msg.push_str(DEFAULT_GREETING);
}

pub fn set_user_name(state: &mut StoreState, name: String) {
    state.username = name;
}
