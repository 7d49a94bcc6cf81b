//! Batch annotation of text in images.
//!
//! A text detector reports boxes with recognised text; overlapping boxes are merged into regions
//! (see [`consolidate`]) and each image gets a LabelMe annotation file and a plain-text listing
//! (see [`annotation`] and [`pipeline`]).

pub mod annotation;
pub mod config;
pub mod consolidate;
pub mod detection;
pub mod geometry;
pub mod pipeline;
pub mod services;
