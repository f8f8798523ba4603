pub mod coalescer;
pub mod currency;
pub mod detail_cache;
pub mod detail_generator;
pub mod image_lookup;
pub mod llm;
pub mod pending_state;
pub mod prompt_builder;
pub mod results;
pub mod search_session;
pub mod summary_generator;
pub mod ttl_cache;
