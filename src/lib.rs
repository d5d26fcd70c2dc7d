//! Chatlink: session-lifecycle adapter between a messaging client and an
//! orchestration hub.
//!
//! Owns at most one client session per process, translates the client's
//! login lifecycle into `LOGIN_SCAN` / `LOGIN_DONE` / `LOGOUT_DONE` hub
//! events, and answers the hub's `login`, `logout`, `resendLoginStatus` and
//! `isAuthenticated` commands.
//!
//! See `DESIGN.md` for the architecture notes.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod logging;

pub mod client;
pub mod hub;
pub mod session;

pub mod actions;
