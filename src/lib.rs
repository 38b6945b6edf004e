pub mod accounts;
pub mod app_config;
pub mod audit;
pub mod comments;
pub mod db;
pub mod error;
pub mod groups;
pub mod lookups;
pub mod middleware;
pub mod orm;
pub mod render;
pub mod session;
pub mod template;
pub mod tickets;
pub mod user;
pub mod web;
