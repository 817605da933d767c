use serde::Deserialize;

/// Envelope shared by the v2 mix-market endpoints. `code` is "00000" on
/// success, anything else carries an error message.
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    pub code: String,
    #[serde(default)]
    pub msg: Option<String>,
    pub data: Option<T>,
}

impl<T> ApiEnvelope<T> {
    pub fn is_ok(&self) -> bool {
        self.code == "00000"
    }
}

#[derive(Debug, Deserialize)]
pub struct TickerEntry {
    pub symbol: String,
}
