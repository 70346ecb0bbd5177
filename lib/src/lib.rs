#![doc = svgbobdoc::transform!(
//! A toolkit for writing front-end asset build pipelines.
//!
//! # Overview
//!
//! Sluice runs named **tasks** arranged in a [`Graph`](graph::Graph). Each
//! task lists the tasks that must complete before it and, usually, a unit of
//! work. A typical graph for a web application looks like this:
//!
//! ```svgbob
//!                        +---------+
//!                        | compile |
//!                        +----+----+
//!                             |
//!      +-------------+--------+--------+------------------+
//!      |             |                 |                  |
//! +----+-----+ +-----+--------+ +------+---------+ +------+-----------+
//! |compile-js| |compile-styles| | compile-assets | | index:production |
//! +----+-----+ +-----+--------+ +------+---------+ +------+-----------+
//!      |             |                 |                  |
//! +----+-----+ +-----+-------+  +------+-------------+    |
//! | build-js | | build-styles|  | copy-vendor-to-src |    |
//! +----+-----+ +-------------+  +--------------------+    |
//!      |                                                  |
//!      +-----------------> runs once <--------------------+
//! ```
//!
//! Within one run every task executes at most once, however many dependents
//! reach it. Prerequisites run in parallel and are joined before the
//! dependent's work begins.
//!
//! ## Work
//!
//! Task work is usually a [`Pipeline`](pipeline::Pipeline):
//!
//!   1. A [`FileSet`](fileset::FileSet) resolves glob patterns against the
//!      file system, in pattern order.
//!   2. The matched files are read into [`Asset`](asset::Asset)s and flow
//!      through [`Transform`](transform::Transform)s: linting, SCSS
//!      compilation, prefixing, concatenation with source maps, minification.
//!   3. The assets are written below one or more destinations.
//!
//! Problems with a single file are recorded as [`Failure`](report::Failure)s
//! in the task's [`Report`](report::Report) and never stop the run. Problems
//! that leave the output in an unknown state, such as failed writes, are
//! [`Error`](error::Error)s and fail the task and everything depending on it.
//!
//! Besides pipelines, the library provides load-order preserving vendor
//! copies ([`order`]), asset manifests for the entry page ([`manifest`],
//! [`templating`]), output cleanup ([`clean`]) and watch mode ([`watch`]).
)]

#[macro_use]
pub mod error;
pub mod util;
pub mod report;
pub mod asset;
pub mod fileset;
pub mod sourcemap;
pub mod transform;
pub mod pipeline;
pub mod order;
pub mod manifest;
pub mod templating;
pub mod clean;
pub mod format;
pub mod graph;
pub mod watch;

pub use error::{Error, Result};

pub use rayon;
