use crate::error::{Result, SdkError};
use crate::pipeline::HttpPipeline;
use fluentcloud_common::Page;
use futures_util::stream::{self, Stream};
use serde::de::DeserializeOwned;
use std::collections::VecDeque;
use std::marker::PhantomData;
use tracing::debug;

type MapItem<R, T> = std::sync::Arc<dyn Fn(R) -> Result<T> + Send + Sync>;

/// Lazily follows `nextLink` through a paged list endpoint.
///
/// `R` is the wire item type, `T` what callers receive (for example a resource handle).
pub struct PagedList<R, T = R> {
    pipeline: HttpPipeline,
    api_version: String,
    next_url: Option<String>,
    pages_read: u32,
    map: MapItem<R, T>,
    _wire: PhantomData<fn() -> R>,
}

impl<R: DeserializeOwned + 'static> PagedList<R, R> {
    pub fn new(pipeline: HttpPipeline, api_version: &str, first_url: String) -> Self {
        PagedList::with_map(pipeline, api_version, first_url, std::sync::Arc::new(Ok))
    }
}

impl<R: DeserializeOwned + 'static, T: 'static> PagedList<R, T> {
    pub(crate) fn with_map(
        pipeline: HttpPipeline,
        api_version: &str,
        first_url: String,
        map: MapItem<R, T>,
    ) -> Self {
        PagedList {
            pipeline,
            api_version: api_version.to_string(),
            next_url: Some(first_url),
            pages_read: 0,
            map,
            _wire: PhantomData,
        }
    }

    pub fn pages_read(&self) -> u32 {
        self.pages_read
    }

    pub fn has_more(&self) -> bool {
        self.next_url.is_some()
    }

    /// Fetches the next page, or `None` once `nextLink` runs out.
    pub async fn next_page(&mut self) -> Result<Option<Vec<T>>> {
        let Some(url) = self.next_url.take() else {
            return Ok(None);
        };
        let page: Page<R> = self.pipeline.get(&url, &self.api_version).await?;
        self.pages_read += 1;
        self.next_url = page.next_link.filter(|l| !l.trim().is_empty());
        debug!(
            "[pager] page {} with {} items (more={})",
            self.pages_read,
            page.value.len(),
            self.next_url.is_some()
        );
        let items = page
            .value
            .into_iter()
            .map(|r| (self.map)(r))
            .collect::<Result<Vec<T>>>()?;
        Ok(Some(items))
    }

    /// Drains every remaining page.
    pub async fn collect_all(mut self) -> Result<Vec<T>> {
        let mut out = Vec::new();
        while let Some(items) = self.next_page().await? {
            out.extend(items);
        }
        Ok(out)
    }

    /// Item-by-item stream; pages are fetched on demand.
    pub fn into_stream(self) -> impl Stream<Item = Result<T>> {
        stream::try_unfold(
            (self, VecDeque::<T>::new()),
            |(mut pager, mut buffer)| async move {
                loop {
                    if let Some(item) = buffer.pop_front() {
                        return Ok::<_, SdkError>(Some((item, (pager, buffer))));
                    }
                    match pager.next_page().await? {
                        Some(items) => buffer.extend(items),
                        None => return Ok(None),
                    }
                }
            },
        )
    }
}
