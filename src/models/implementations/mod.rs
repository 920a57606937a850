pub mod sentiment_distilbert;

pub use sentiment_distilbert::{SentimentDistilBertModel, SentimentModelSource};
