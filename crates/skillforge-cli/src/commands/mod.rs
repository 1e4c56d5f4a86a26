pub mod achievements;
pub mod config;
pub mod db;
pub mod journal;
pub mod skill;
pub mod stats;
pub mod task;
pub mod timer;
