#![allow(dead_code)]

pub mod fixtures;
pub mod mock_chain;
pub mod quotes;
pub mod recording_notifier;
pub mod temp_db;
