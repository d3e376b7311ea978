pub mod pid_system_model;
