use std::{fmt, io};
use std::panic::Location;
use std::convert::Infallible;
use std::error::Error as StdError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// An error with a chain of causes.
///
/// Each link carries one or more [`ErrorDetail`]s: a message plus optional
/// key/value context. The most recent (outermost) context is displayed
/// first, followed by increasingly indented causes.
#[derive(Debug)]
pub struct Error {
    detail: Vec<Box<dyn ErrorDetail>>,
    cause: Option<Box<Error>>,
    location: &'static Location<'static>,
}

pub trait ErrorDetail: fmt::Display + fmt::Debug + Send + Sync {
    fn context(&self) -> Vec<(Option<String>, String)> { vec![] }
}

impl Error {
    #[track_caller]
    pub fn from_std<E>(error: E) -> Self
        where E: StdError + Send + Sync + 'static
    {
        Error::from(Box::new(error) as Box<dyn StdError + Send + Sync>)
    }

    /// Makes `self` the innermost cause of `outer` and returns `outer`.
    pub fn chain(self, mut outer: Error) -> Self {
        fn innermost(error: Error, behind: &mut Error) {
            match behind.cause.as_mut() {
                Some(cause) => innermost(error, cause),
                None => behind.cause = Some(Box::new(error)),
            }
        }

        innermost(self, &mut outer);
        outer
    }

    /// The outermost message, without context or causes.
    pub fn message(&self) -> String {
        self.detail.first()
            .map(|detail| detail.to_string())
            .unwrap_or_default()
    }

    /// Iterates over `self` and then each of its causes.
    pub fn causes(&self) -> impl Iterator<Item = &Error> {
        let mut next = Some(self);
        std::iter::from_fn(move || {
            let current = next?;
            next = current.cause.as_deref();
            Some(current)
        })
    }
}

impl ErrorDetail for &(dyn StdError + Send + Sync) {
    fn context(&self) -> Vec<(Option<String>, String)> {
        let mut context = vec![];
        let mut source = self.source();
        while let Some(e) = source {
            context.push((None, e.to_string()));
            source = e.source();
        }

        context
    }
}

impl ErrorDetail for Box<dyn StdError + Send + Sync> {
    fn context(&self) -> Vec<(Option<String>, String)> {
        let error: &(dyn StdError + Send + Sync) = &**self;
        error.context()
    }
}

macro_rules! impl_error_detail_with_std_error {
    ($($T:ty),+ $(,)?) => {
        $(
            impl $crate::error::ErrorDetail for $T {
                fn context(&self) -> Vec<(Option<String>, String)> {
                    let error: &(dyn std::error::Error + Send + Sync) = self;
                    error.context()
                }
            }
        )+
    }
}

impl_error_detail_with_std_error! {
    io::Error,
    toml::de::Error,
    serde_json::Error,
    glob::PatternError,
    glob::GlobError,
    notify::Error,
    minijinja::Error,
}

impl ErrorDetail for String { }
impl ErrorDetail for &str { }

impl ErrorDetail for Infallible { }

impl Clone for Error {
    fn clone(&self) -> Self {
        Error {
            detail: self.detail.iter()
                .map(|detail| Box::new(Detail::from(&**detail)) as Box<dyn ErrorDetail>)
                .collect(),
            cause: self.cause.clone(),
            location: self.location,
        }
    }
}

impl<T: ErrorDetail + 'static> From<T> for Error {
    #[track_caller]
    fn from(detail: T) -> Self {
        Error {
            detail: vec![Box::new(detail)],
            cause: None,
            location: Location::caller(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show_location = std::env::var_os("RUST_BACKTRACE").is_some();
        for (depth, error) in self.causes().enumerate() {
            let indent = " ".repeat(depth * 4);
            let newline = format!("\n{indent}");
            for detail in &error.detail {
                writeln!(f, "{indent}{}", format!("{detail:#}").replace('\n', &newline))?;
                for (key, value) in detail.context() {
                    let value = value.replace('\n', &newline);
                    match key {
                        Some(key) => writeln!(f, "{indent}{key}: {value}")?,
                        None => writeln!(f, "{indent}{value}")?,
                    }
                }
            }

            if show_location {
                writeln!(f, "{indent}[{}]", error.location)?;
            }
        }

        Ok(())
    }
}

/// A message with context, either built by [`error!`] or captured from
/// another detail when an [`Error`] is cloned.
#[derive(Debug)]
pub struct Detail {
    pub message: String,
    pub parameters: Vec<(Option<String>, String)>,
}

impl From<&dyn ErrorDetail> for Detail {
    #[inline]
    fn from(detail: &dyn ErrorDetail) -> Self {
        Detail {
            message: detail.to_string(),
            parameters: detail.context()
        }
    }
}

impl fmt::Display for Detail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.message.fmt(f)
    }
}

impl ErrorDetail for Detail {
    fn context(&self) -> Vec<(Option<String>, String)> {
        self.parameters.clone()
    }
}

#[doc(hidden)]
#[macro_export]
macro_rules! err {
    ($($token:tt)*) => (Err($crate::error!($($token)*)));
}

/// Builds an [`Error`](crate::error::Error) from a message and parameters.
///
/// ```rust
/// let error = sluice::error!(
///     "failed to write asset",
///     "path" => "build/js/app.js",
///     "disk full",
/// );
///
/// assert_eq!(error.message(), "failed to write asset");
/// ```
#[doc(hidden)]
#[macro_export]
macro_rules! error {
    ($msg:expr, $($rest:tt)*) => (
        $crate::error::Error::from($crate::error::Detail {
            message: $msg.to_string(),
            parameters: {
                #[allow(unused_mut)]
                let mut v: Vec<(Option<String>, String)> = Vec::new();
                $crate::error!(@param v $($rest)*);
                v
            },
        })
    );

    ($msg:expr) => ( $crate::error!($msg,) );

    (@param $v:ident $key:expr => $value:expr, $($rest:tt)*) => {
        $crate::error!(@param $v $key => $value);
        $crate::error!(@param $v $($rest)*);
    };

    (@param $v:ident $key:expr => $value:expr) => {
        $v.push((Some($key.to_string()), $value.to_string()));
    };

    (@param $v:ident $value:expr, $($rest:tt)*) => {
        $crate::error!(@param $v $value);
        $crate::error!(@param $v $($rest)*);
    };

    (@param $v:ident $value:expr) => {
        $v.push((None, $value.to_string()));
    };

    (@param $v:ident $(,)?) => { };
}

pub trait Chainable<T> {
    fn chain(self, outer: impl Into<Error>) -> Result<T>;

    fn chain_with<F, E>(self, f: F) -> Result<T>
        where F: FnOnce() -> E, E: Into<Error>;
}

impl<T, E: Into<Error>> Chainable<T> for Result<T, E> {
    #[track_caller]
    fn chain(self, outer: impl Into<Error>) -> Result<T> {
        self.map_err(|e| e.into().chain(outer.into()))
    }

    fn chain_with<F, Outer>(self, f: F) -> Result<T>
        where F: FnOnce() -> Outer, Outer: Into<Error>,
    {
        self.map_err(|e| e.into().chain(f().into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chained_errors_display_outermost_first() {
        let inner: Result<()> = Err(io::Error::new(io::ErrorKind::NotFound, "gone").into());
        let error = inner
            .chain(error!("failed to copy asset", "path" => "a.js"))
            .unwrap_err();

        let rendered = error.to_string();
        let outer = rendered.find("failed to copy asset").unwrap();
        let cause = rendered.find("    gone").unwrap();
        assert!(outer < cause);
        assert!(rendered.contains("path: a.js"));
        assert_eq!(error.causes().count(), 2);
    }

    #[test]
    fn cloned_errors_keep_messages_and_context() {
        let error = error!("bad config", "key" => "dest.prod.js");
        let clone = error.clone();
        assert_eq!(clone.message(), "bad config");
        assert_eq!(clone.to_string(), error.to_string());
    }
}
