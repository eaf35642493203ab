//! Streaming rewrite of variant pages.
//!
//! The rewriter is driven inline by the response body: each upstream chunk is
//! written into a `Send` rewriter and whatever it has flushed so far is
//! yielded to the client. No task or thread is held per page, so a stalled
//! upstream only stalls its own response.

use std::mem;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};

use axum::body::{Body, Bytes};
use futures_util::{stream, Stream, StreamExt};
use lol_html::html_content::ContentType;
use lol_html::send::{HtmlRewriter, Settings};
use lol_html::{element, OutputSink};

use crate::config::CustomDataEntry;
use crate::error::RewriteError;

type Chunk = Result<Bytes, RewriteError>;

/// Content written into a variant page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageEdits {
    /// Inner text of `title`.
    pub title: String,
    /// Inner text of `h1#title`.
    pub heading: String,
    /// Inner text of `p#description`.
    pub description: String,
    /// Inner text of `a#url`.
    pub url_text: String,
    /// `href` of `a#url`.
    pub url_href: String,
}

impl PageEdits {
    pub fn new(title: &str, entry: &CustomDataEntry) -> Self {
        Self {
            title: title.to_string(),
            heading: entry.heading.clone(),
            description: entry.description.clone(),
            url_text: entry.url_text.clone(),
            url_href: entry.url_href.clone(),
        }
    }

    /// Rewrite an upstream body as it streams through.
    ///
    /// Elements that are missing from the page are left alone. An upstream
    /// or rewriter failure ends the returned body with an error.
    pub fn rewrite_body<S, E>(self, upstream: S) -> Body
    where
        S: Stream<Item = Result<Bytes, E>> + Send + 'static,
        E: std::fmt::Display + Send + 'static,
    {
        let output = PageSink::default();
        let rewrite = PageRewrite {
            upstream: Box::pin(upstream),
            rewriter: Some(self.into_rewriter(output.clone())),
            output,
        };

        Body::from_stream(stream::unfold(rewrite, PageRewrite::next_chunk))
    }

    fn into_rewriter(self, sink: PageSink) -> HtmlRewriter<'static, PageSink> {
        let PageEdits {
            title,
            heading,
            description,
            url_text,
            url_href,
        } = self;

        HtmlRewriter::new(
            Settings {
                element_content_handlers: vec![
                    element!("title", move |el| {
                        el.set_inner_content(&title, ContentType::Text);
                        Ok(())
                    }),
                    element!("h1#title", move |el| {
                        el.set_inner_content(&heading, ContentType::Text);
                        Ok(())
                    }),
                    element!("p#description", move |el| {
                        el.set_inner_content(&description, ContentType::Text);
                        Ok(())
                    }),
                    element!("a#url", move |el| {
                        el.set_attribute("href", &url_href)?;
                        el.set_inner_content(&url_text, ContentType::Text);
                        Ok(())
                    }),
                ],
                ..Settings::new_send()
            },
            sink,
        )
    }
}

/// Rewritten bytes not yet handed to the client.
#[derive(Clone, Default)]
struct PageSink(Arc<Mutex<Vec<u8>>>);

impl PageSink {
    fn drain(&self) -> Vec<u8> {
        let mut pending = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        mem::take(&mut *pending)
    }
}

impl OutputSink for PageSink {
    fn handle_chunk(&mut self, chunk: &[u8]) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(chunk);
    }
}

/// State of one page rewrite; `rewriter` is `None` once the page has ended.
struct PageRewrite<S> {
    upstream: Pin<Box<S>>,
    output: PageSink,
    rewriter: Option<HtmlRewriter<'static, PageSink>>,
}

impl<S, E> PageRewrite<S>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: std::fmt::Display,
{
    /// Pull upstream chunks until the rewriter has output to hand on.
    async fn next_chunk(mut self) -> Option<(Chunk, Self)> {
        loop {
            let rewriter = self.rewriter.as_mut()?;

            match self.upstream.next().await {
                Some(Ok(bytes)) => {
                    if let Err(e) = rewriter.write(&bytes) {
                        self.rewriter = None;
                        return Some((Err(aborted(RewriteError::Html(e.to_string()))), self));
                    }
                }
                Some(Err(e)) => {
                    self.rewriter = None;
                    return Some((Err(aborted(RewriteError::Upstream(e.to_string()))), self));
                }
                None => {
                    let rewriter = self.rewriter.take()?;
                    if let Err(e) = rewriter.end() {
                        return Some((Err(aborted(RewriteError::Html(e.to_string()))), self));
                    }
                }
            }

            let pending = self.output.drain();
            if !pending.is_empty() {
                return Some((Ok(Bytes::from(pending)), self));
            }
        }
    }
}

fn aborted(error: RewriteError) -> RewriteError {
    tracing::warn!(error = %error, "Variant page rewrite aborted");
    error
}
