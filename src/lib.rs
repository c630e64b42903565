//! Workout logging on a map: the workout model, the session store, its
//! persistence, and the controller that ties user input to the map and list.

pub mod controller;
pub mod error;
pub mod geolocation;
pub mod models;
pub mod persistence;
pub mod settings;
pub mod storage;
pub mod store;
pub mod surface;
