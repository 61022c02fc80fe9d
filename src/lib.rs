//! City weather explorer
//!
//! Library half of the TUI: state, reducer, effects and components are
//! exposed here so they can be tested without a terminal.

pub mod accumulator;
pub mod action;
pub mod api;
pub mod components;
pub mod config;
pub mod effect;
pub mod prefs;
pub mod reducer;
pub mod route;
pub mod scroll;
pub mod search;
pub mod state;
pub mod store;
pub mod suggest;
pub mod view;
