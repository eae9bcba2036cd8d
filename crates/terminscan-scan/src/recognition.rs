// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Seam to the external text recognition engine.
//
// The engine is a black box behind `RecognitionEngine`. A live engine is only
// ever held by a `RecognitionSession`: acquired through an `EngineLoader` when a
// capture run starts and released when the session is dropped, on success and
// on every error path alike.

use std::time::Duration;

use async_trait::async_trait;
use image::DynamicImage;
use terminscan_core::error::{Result, TerminError};
use terminscan_core::{RecognitionOptions, RecognitionOutput};
use tracing::{debug, info, instrument, warn};

/// Converts a pixel image into text plus per-word metadata.
#[async_trait]
pub trait RecognitionEngine: Send + Sync {
    /// Recognise all text in `image`.
    async fn recognize(
        &self,
        image: &DynamicImage,
        options: &RecognitionOptions,
    ) -> Result<RecognitionOutput>;

    /// Engine name for logs.
    fn name(&self) -> &str {
        "recognition-engine"
    }
}

/// Acquires a live engine. Loading is usually the expensive step (model files).
pub trait EngineLoader {
    type Engine: RecognitionEngine;

    fn load(&self) -> Result<Self::Engine>;
}

/// An owned, scoped recognition engine for one capture run.
pub struct RecognitionSession<E: RecognitionEngine> {
    engine: E,
    options: RecognitionOptions,
    timeout: Option<Duration>,
    passes: usize,
}

impl<E: RecognitionEngine> RecognitionSession<E> {
    /// Load an engine and wrap it in a session.
    #[instrument(skip_all)]
    pub fn open<L>(loader: &L, options: RecognitionOptions, timeout: Option<Duration>) -> Result<Self>
    where
        L: EngineLoader<Engine = E>,
    {
        let engine = loader.load()?;
        info!(engine = engine.name(), ?timeout, "Recognition engine acquired");
        if timeout.is_none() {
            warn!("No recognition timeout configured; a stalled engine blocks the capture");
        }
        Ok(Self::with_engine(engine, options, timeout))
    }

    /// Wrap an engine that is already loaded.
    pub fn with_engine(engine: E, options: RecognitionOptions, timeout: Option<Duration>) -> Self {
        Self {
            engine,
            options,
            timeout,
            passes: 0,
        }
    }

    /// Number of recognition passes run so far.
    pub fn passes(&self) -> usize {
        self.passes
    }

    /// Run one recognition pass, bounded by the session timeout if any.
    #[instrument(skip_all, fields(pass = self.passes, width = image.width(), height = image.height()))]
    pub async fn recognize(&mut self, image: &DynamicImage) -> Result<RecognitionOutput> {
        self.passes += 1;
        let call = self.engine.recognize(image, &self.options);
        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| TerminError::RecognitionTimeout(limit))??,
            None => call.await?,
        };
        debug!(
            word_count = output.words.len(),
            confidence = output.confidence,
            "Recognition pass complete"
        );
        Ok(output)
    }
}

impl<E: RecognitionEngine> Drop for RecognitionSession<E> {
    fn drop(&mut self) {
        info!(engine = self.engine.name(), passes = self.passes, "Recognition engine released");
    }
}
