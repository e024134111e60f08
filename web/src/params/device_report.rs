use serde::Deserialize;
use utoipa::ToSchema;

/// A device report as delivered over HTTP: the codec ciphertext, hex encoded.
#[derive(Debug, Deserialize, ToSchema)]
pub struct DeviceReportParams {
    #[schema(example = "1dac645e3b11cdfed2ed7cd234283424")]
    pub payload: String,
}
