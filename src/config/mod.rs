mod data_config;

pub use data_config::DataConfig;
