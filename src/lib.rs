//! Hand-gesture controlled photo globe.
//!
//! Webcam frames go through a hand detector on a background runtime. The
//! [`gesture::GestureInterpreter`] turns landmarks into rotation commands and a
//! zoom target in [`control::SharedControl`], and the
//! [`motion::MotionIntegrator`] integrates that state once per display frame
//! before handing it to the rendered globe.

pub mod app;
pub mod config;
pub mod control;
pub mod data;
pub mod detector;
pub mod error;
pub mod gallery;
pub mod gesture;
pub mod landmarks;
pub mod layout;
pub mod motion;
pub mod tracking;
pub mod ui;
pub mod video;
