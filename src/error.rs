use tfa_api::{ApiError, ApiErrorKind, Detail};
use tfa_api::error::GeneralKind;

pub type BoxDynError = Box<dyn std::error::Error + Send + Sync>;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub struct Error {
    inner: ApiError,
    src: Option<BoxDynError>,
}

impl Error {
    pub fn new() -> Self {
        Error {
            inner: ApiError::from(GeneralKind::InternalFailure),
            src: None,
        }
    }

    pub fn api<T>(value: T) -> Self
    where
        T: Into<ApiError>
    {
        Error {
            inner: value.into(),
            src: None,
        }
    }

    pub fn kind<K>(mut self, kind: K) -> Self
    where
        K: Into<ApiErrorKind>
    {
        self.inner = self.inner.with_kind(kind);
        self
    }

    pub fn detail(mut self, detail: Detail) -> Self {
        self.inner = self.inner.with_detail(detail);
        self
    }

    pub fn message<M>(mut self, msg: M) -> Self
    where
        M: Into<String>
    {
        self.inner = self.inner.with_message(msg);
        self
    }

    pub fn source<S>(mut self, src: S) -> Self
    where
        S: Into<BoxDynError>
    {
        self.src = Some(src.into());
        self
    }

    pub fn inner(&self) -> &ApiError {
        &self.inner
    }

    pub fn into_inner(self) -> ApiError {
        self.inner
    }
}

impl Default for Error {
    fn default() -> Self {
        Error::new()
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.inner, f)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.src.as_deref().map(|v| v as &(dyn std::error::Error + 'static))
    }
}

impl From<ApiError> for Error {
    fn from(inner: ApiError) -> Self {
        Error {
            inner,
            src: None,
        }
    }
}

impl From<rand::Error> for Error {
    fn from(err: rand::Error) -> Self {
        Error::new().source(err)
    }
}
