// src/lib.rs

//! Syllabus Crawler Library
//!
//! Crawls a university syllabus site, normalizes each course page into a
//! [`models::Lecture`] and reconciles it into a SQLite store.

pub mod error;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
