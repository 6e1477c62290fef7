use std::sync::Arc;

use poem::web::Data;
use poem_openapi::{OpenApi, payload::Json};

use super::ApiTags;
use crate::{
    AppState,
    core::error::{QrError, QrResult},
    schemas::decode::{DecodeForm, DecodeResponse, DecodeResult, DecodedSymbol},
};

pub struct ApiDecode;

#[OpenApi]
impl ApiDecode {
    /// Decode
    ///
    /// Decode every QR code found in an uploaded image. An image without any
    /// QR code yields an empty `results` list.
    ///
    /// # Example Response
    /// ```json
    /// {
    ///   "results": [{ "data": "HelloWorld", "type": "QRCODE" }]
    /// }
    /// ```
    #[oai(path = "/decode", method = "post", tag = "ApiTags::Decode")]
    async fn decode(&self, form: DecodeForm, state: Data<&Arc<AppState>>) -> DecodeResponse {
        let image = match read_upload(&state, form).await {
            Ok(image) => image,
            Err(e) => return DecodeResponse::error(&e),
        };

        tracing::info!("Decoding upload: {} bytes", image.len());

        match state.engine.decode(image).await {
            Ok(results) => {
                tracing::info!("Decode completed, found {} symbols", results.len());
                DecodeResponse::Ok(Json(DecodeResult {
                    results: results.into_iter().map(DecodedSymbol::from).collect(),
                }))
            }
            Err(e) => DecodeResponse::error(&e),
        }
    }
}

async fn read_upload(state: &AppState, form: DecodeForm) -> QrResult<Vec<u8>> {
    state.engine.check_upload("file", form.file.size())?;
    form.file.into_vec().await.map_err(QrError::internal)
}
