//! Client for radio-browser.info compatible station catalogs.
//!
//! Two paged queries cover everything the player needs: most-clicked
//! stations for browsing, and search by name. Results come back as
//! [`Station`] records whose optional fields degrade to display defaults
//! rather than errors.
//!
//! The [`StationDirectory`] trait is the seam consumers program against;
//! [`RadioBrowserClient`] is the HTTP implementation.

pub mod client;
pub mod error;
pub mod station;

pub use client::{
    ClientBuilder, RadioBrowserClient, StationDirectory, DEFAULT_BASE_URL,
    DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_USER_AGENT,
};
pub use error::{DirectoryError, Result};
pub use station::Station;
