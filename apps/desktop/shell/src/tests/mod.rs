mod config;
mod logger;
