use std::env;

pub mod bitget_client;
pub mod candles_response;
pub mod tickers_response;

pub use bitget_client::BitgetClient;

pub fn get_rest_base_url() -> String {
    env::var("BITGET_REST_URL").unwrap_or_else(|_| "https://api.bitget.com".to_string())
}
