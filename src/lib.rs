#![forbid(unsafe_code)]

//! Mirrors a portal's movie catalog to local storage.
//!
//! [`catalog`] discovers entry URLs, [`resolver`] turns each into a
//! [`resolver::MediaDescriptor`] via the video platform's API, [`naming`]
//! derives the on-disk name, and [`orchestrator`] runs everything with a fixed
//! number of workers, handing the actual writes to [`persistence`].

pub mod catalog;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod http;
pub mod naming;
pub mod orchestrator;
pub mod persistence;
pub mod resolver;

#[cfg(test)]
mod test_support;
