//! IoT Stack Core
//!
//! Core library for declaring a graph of cloud resources as values and
//! synthesizing it into a template for an external provisioning engine.

pub mod differ;
pub mod effect;
pub mod interpreter;
pub mod plan;
pub mod provider;
pub mod resource;
pub mod schema;
pub mod stack;
pub mod template;
