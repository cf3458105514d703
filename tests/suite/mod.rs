//! Integration test modules

mod join;
mod pipeline;
mod producers;
mod settlement;
mod timing;
