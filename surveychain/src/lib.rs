#[macro_use]
extern crate serde;

#[macro_use]
extern crate log;

#[macro_use]
mod serde_hex;

mod address;
mod ciphertext;
mod client;
mod coprocessor;
mod directory;
mod error;
mod event;
mod fhe;
mod gateway;
mod ledger;
mod store;
mod survey;
mod util;

pub use address::*;
pub use ciphertext::*;
pub use client::*;
pub use coprocessor::*;
pub use directory::*;
pub use error::*;
pub use event::*;
pub use fhe::*;
pub use gateway::*;
pub use ledger::*;
pub use store::*;
pub use survey::*;
pub use util::*;

#[cfg(test)]
mod tests;
