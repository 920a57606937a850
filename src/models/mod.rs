pub mod distilbert;
pub mod implementations;

pub use implementations::{SentimentDistilBertModel, SentimentModelSource};
