pub mod clustering;
pub mod correlation;
pub mod features;
pub mod filter;
pub mod importance;
pub mod output;
pub mod pipeline;
pub mod reduction;
pub mod selector;
pub mod stats;
pub mod summary;
