//! Integration test modules for vsthost
//!
//! - loading: descriptor validation, load errors, metadata collection
//! - lifecycle: transitions, editor, dispose, concurrent callers
//! - audio: exchange buffer fan-in and fan-out
//! - events: event block delivery
//! - state: programs, parameters, chunks, snapshots, cloning

pub mod audio;
