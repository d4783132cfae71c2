pub mod config;
pub mod credential;
pub mod decision;
pub mod error;
pub mod group;
pub mod identity;
pub mod launcher;
pub mod prompt;
pub mod session;
pub mod shadow;

pub use self::{
    decision::{Authority, Decision, Grant, Invocation},
    error::{Error, Result},
};
