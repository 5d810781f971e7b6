pub mod constants;
pub mod config;
pub mod error;
pub mod logging;
mod vary;
mod helpers;

pub mod geoconverter;
pub mod h3_utils;
pub mod planet;
pub mod plate;
pub mod sim;

pub mod store;
pub mod rock_store;

pub mod plate_generator;
pub mod platelet_manager;
pub mod neighbor_graph;
pub mod force_layout;
pub mod edge_erosion;
pub mod sim_manager;
