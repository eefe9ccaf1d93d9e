#![deny(rust_2018_idioms)]
#![deny(clippy::correctness)]
#![deny(clippy::perf)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod builder;
pub mod config;
pub mod error;
pub mod gateway;
pub mod http;
pub mod plan;
pub mod registry;
pub mod result;
pub mod retry;
pub mod scenario;
pub mod seeder;
pub mod store;
