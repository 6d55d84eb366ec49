use std::io::Cursor;

use image::{ImageFormat, Luma};
use qrcode::QrCode;

use crate::error::Error as ServiceError;

#[derive(Debug, thiserror::Error)]
pub enum QrError {
    #[error(transparent)]
    Encode(#[from] qrcode::types::QrError),

    #[error(transparent)]
    Image(#[from] image::ImageError),
}

impl From<QrError> for ServiceError {
    fn from(err: QrError) -> Self {
        ServiceError::new().source(err)
    }
}

/// renders the provisioning uri as a scannable png, returned as in-memory
/// bytes
pub fn provisioning_png<U>(uri: U) -> Result<Vec<u8>, QrError>
where
    U: AsRef<str>
{
    let code = QrCode::new(uri.as_ref().as_bytes())?;
    let rendered = code.render::<Luma<u8>>().build();

    let mut out = Cursor::new(Vec::new());

    rendered.write_to(&mut out, ImageFormat::Png)?;

    Ok(out.into_inner())
}
