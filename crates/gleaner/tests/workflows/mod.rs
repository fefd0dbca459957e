//! Offline scraping workflows: synthetic pipeline scenarios and the built-in providers.

use super::*;

mod pipeline;
mod providers;
