pub mod monitoring_api;

pub use monitoring_api::MonitoringApiSource;
