#[macro_use]
extern crate rocket;

#[cfg(all(test, feature = "db-tests"))]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

use crate::bookclub::BookClubFairing;
use crate::config::{ConfigFairing, DatabaseFairing};
use crate::logging::LoggerFairing;

pub mod api;
pub mod bookclub;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;

pub use config::Config;

/// Build the server. Configuration, the database connection and the book
/// club engine are set up by fairings when the rocket ignites.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .mount("/bookclub", api::routes())
        .attach(LoggerFairing)
        .attach(ConfigFairing)
        .attach(DatabaseFairing)
        .attach(BookClubFairing)
}
