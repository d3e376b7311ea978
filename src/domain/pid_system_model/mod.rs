pub mod controller;
pub mod resource;
pub mod scheduler;
pub mod storage;
pub mod system;
pub mod utils;
pub mod workflow;
