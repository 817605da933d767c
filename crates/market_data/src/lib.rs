use thiserror::Error;

pub mod remote;
pub mod traits;

pub use remote::BitgetClient;
pub use traits::MarketDataSource;

#[derive(Error, Debug)]
pub enum MarketDataError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("exchange error {code}: {message}")]
    Api { code: String, message: String },
    #[error("malformed candle payload: {0}")]
    MalformedCandle(String),
}
