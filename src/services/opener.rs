use super::traits::UrlOpener;
use crate::error::{AppError, AppResult};

/// Opens URLs with the platform's default browser.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemUrlOpener;

impl UrlOpener for SystemUrlOpener {
    fn open_external_url(&self, url: &str) -> AppResult<()> {
        ensure_web_url(url)?;
        open::that(url).map_err(|source| {
            AppError::io_with_context(source, format!("failed to open {url} in the browser"))
        })?;
        tracing::debug!(%url, "opened external url");
        Ok(())
    }
}

fn ensure_web_url(url: &str) -> AppResult<()> {
    if url.starts_with("https://") || url.starts_with("http://") {
        return Ok(());
    }
    Err(AppError::invalid_argument(format!(
        "refusing to open non-http url: {url}"
    )))
}
