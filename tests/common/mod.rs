#![allow(dead_code)]

pub mod database;
pub mod fixtures;
pub mod web;
