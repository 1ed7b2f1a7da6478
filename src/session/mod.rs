//! Session orchestration: the controller state machine and its event channel.

pub mod controller;
pub mod events;
