//! Request dispatch: transforms, header flattening, adapter call.

use std::fmt;
use std::sync::Arc;

use futures_util::FutureExt;

use crate::adapter::AdapterFuture;
use crate::transform::{self, Transform};
use crate::{Adapter, CancelToken, Error, HeaderConfig, RequestConfig, Response, Result};

/// Sends a merged config through its adapter.
///
/// Cancellation is checked before the adapter is called and again once it
/// has settled, so a pending cancellation always wins.
#[derive(Clone, Default)]
pub struct Dispatcher {
    default_adapter: Option<Arc<dyn Adapter>>,
}

impl Dispatcher {
    /// A dispatcher relying on per-request adapters only.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A dispatcher falling back to `adapter`.
    #[must_use]
    pub fn with_adapter(adapter: Arc<dyn Adapter>) -> Self {
        Self {
            default_adapter: Some(adapter),
        }
    }

    /// Returns `true` if a fallback adapter is configured.
    #[must_use]
    pub const fn has_default_adapter(&self) -> bool {
        self.default_adapter.is_some()
    }

    /// Dispatch `config`.
    ///
    /// The adapter is called at most once.
    pub fn dispatch(&self, mut config: RequestConfig) -> AdapterFuture {
        let default_adapter = self.default_adapter.clone();
        async move {
            let token = config.cancel_token.clone();
            check_cancelled(token.as_ref()).inspect_err(|_| {
                tracing::debug!("request cancelled before dispatch");
            })?;

            let transforms = config.transform_request.clone().unwrap_or_default();
            let data = config.data.take();
            config.data = transform::apply(data, &mut config.headers.request, &transforms)
                .inspect_err(|err| tracing::warn!(error = %err, "request transform failed"))?;

            config.headers = HeaderConfig::from(config.flat_headers());

            let adapter = match (config.adapter.clone(), default_adapter) {
                (Some(adapter), _) => {
                    tracing::debug!("using request adapter");
                    adapter
                }
                (None, Some(adapter)) => adapter,
                (None, None) => return Err(Error::adapter("no adapter configured")),
            };

            let response_transforms = config.transform_response.clone().unwrap_or_default();
            match adapter.dispatch(config).await {
                Ok(mut response) => {
                    check_cancelled(token.as_ref()).inspect_err(|_| {
                        tracing::debug!("request cancelled after adapter success, discarding response");
                    })?;
                    transform_response(&mut response, &response_transforms)?;
                    Ok(response)
                }
                Err(mut error) => {
                    if !error.is_cancel() {
                        check_cancelled(token.as_ref())?;
                        if let Some(response) = error.response_mut() {
                            transform_response(response, &response_transforms)?;
                        }
                    }
                    Err(error)
                }
            }
        }
        .boxed()
    }
}

fn check_cancelled(token: Option<&CancelToken>) -> Result<()> {
    token.map_or(Ok(()), CancelToken::check)
}

fn transform_response(response: &mut Response, transforms: &[Transform]) -> Result<()> {
    let data = response.take_data();
    let data = transform::apply(data, response.headers_mut(), transforms)
        .inspect_err(|err| tracing::warn!(error = %err, "response transform failed"))?;
    response.set_data(data);
    Ok(())
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("default_adapter", &self.has_default_adapter())
            .finish()
    }
}
