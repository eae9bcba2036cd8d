// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Capture pipeline — quality gate, enhancement, recognition, word
// reconciliation, normalization and parsing for a batch of captures.
//
// Captures are processed one after another. The recognition engine is loaded
// when the first capture passes the quality gate and is released when the
// batch finishes, whether it succeeded or not.

use std::path::Path;
use std::sync::Arc;

use image::DynamicImage;
use serde::Serialize;
use terminscan_core::error::Result;
use terminscan_core::{Appointment, CaptureId, PipelineConfig, QualityIssue, QualityReport};
use terminscan_scan::quality::decode_image;
use terminscan_scan::{
    EngineLoader, ImageEnhancer, QualityAssessor, QualityGate, RecognitionEngine,
    RecognitionSession,
};
use terminscan_text::{
    AppointmentParser, DictionaryMatcher, SkippedLine, TextNormalizer, WordClusterer,
};
use tracing::{info, instrument, warn};

/// One photographed page.
#[derive(Debug, Clone)]
pub struct Capture {
    pub id: CaptureId,
    pub image: DynamicImage,
    pub flash_used: bool,
}

impl Capture {
    pub fn new(image: DynamicImage, flash_used: bool) -> Self {
        Self {
            id: CaptureId::new(),
            image,
            flash_used,
        }
    }

    /// Decode an encoded PNG/JPEG capture.
    pub fn from_bytes(data: &[u8], flash_used: bool) -> Result<Self> {
        Ok(Self::new(decode_image(data)?, flash_used))
    }

    pub fn open(path: impl AsRef<Path>, flash_used: bool) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_bytes(&data, flash_used)
    }
}

/// Text-side results: what the parser made of the recognised text.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextExtraction {
    pub appointments: Vec<Appointment>,
    /// Normalized text the appointments were read from.
    pub text: String,
    pub general_info: Vec<String>,
    pub skipped: Vec<SkippedLine>,
}

/// Everything extracted from one accepted capture.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleExtraction {
    pub capture_id: CaptureId,
    pub quality: QualityReport,
    /// Enhancement failed and the raw photo was recognised instead.
    pub degraded: bool,
    pub recognition_passes: usize,
    #[serde(flatten)]
    pub text: TextExtraction,
}

/// Result for one capture.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase", tag = "outcome")]
pub enum CaptureOutcome {
    /// The photo failed the quality gate and never reached recognition.
    Rejected {
        capture_id: CaptureId,
        quality: QualityReport,
        issues: Vec<QualityIssue>,
    },
    Extracted(ScheduleExtraction),
}

impl CaptureOutcome {
    pub fn appointments(&self) -> &[Appointment] {
        match self {
            Self::Rejected { .. } => &[],
            Self::Extracted(extraction) => &extraction.text.appointments,
        }
    }
}

/// All stages, configured once per run.
pub struct Pipeline {
    config: PipelineConfig,
    assessor: QualityAssessor,
    gate: QualityGate,
    enhancer: ImageEnhancer,
    matcher: Arc<DictionaryMatcher>,
    normalizer: TextNormalizer,
    parser: AppointmentParser,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let matcher = Arc::new(DictionaryMatcher::from_config(config.dictionaries.clone()));
        Ok(Self {
            assessor: QualityAssessor::new(config.quality.clone()),
            gate: QualityGate::new(config.quality.clone()),
            enhancer: ImageEnhancer::new(config.enhancer.clone()),
            normalizer: TextNormalizer::new(&config.parser, Arc::clone(&matcher)),
            parser: AppointmentParser::new(&config.parser, Arc::clone(&matcher)),
            matcher,
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Assess and gate a capture without going further.
    pub fn assess(&self, capture: &Capture) -> Result<(QualityReport, Vec<QualityIssue>)> {
        let report = self.assessor.assess_dynamic(&capture.image)?;
        let issues = self.gate.issues(&report);
        Ok((report, issues))
    }

    /// Normalize and parse recognised text.
    pub fn extract_text(&self, raw: &str) -> TextExtraction {
        let normalized = self.normalizer.normalize(raw);
        let report = self.parser.parse(&normalized.lines);
        TextExtraction {
            appointments: report.appointments,
            general_info: normalized.general_info().into_iter().map(str::to_string).collect(),
            text: normalized.text(),
            skipped: report.skipped,
        }
    }

    /// Process captures in order with one engine session for the whole batch.
    #[instrument(skip_all, fields(captures = captures.len()))]
    pub async fn process<L: EngineLoader>(
        &self,
        loader: &L,
        captures: Vec<Capture>,
    ) -> Result<Vec<CaptureOutcome>> {
        let mut session: Option<RecognitionSession<L::Engine>> = None;
        let mut outcomes = Vec::with_capacity(captures.len());

        for capture in captures {
            let (quality, issues) = self.assess(&capture)?;
            if !issues.is_empty() {
                info!(capture = %capture.id, ?issues, "Capture rejected by quality gate");
                outcomes.push(CaptureOutcome::Rejected {
                    capture_id: capture.id,
                    quality,
                    issues,
                });
                continue;
            }

            let active = match session.as_mut() {
                Some(active) => active,
                None => session.insert(RecognitionSession::open(
                    loader,
                    self.config.recognition.options.clone(),
                    self.config.recognition.timeout(),
                )?),
            };
            let extraction = self.extract(active, &capture, quality).await?;
            outcomes.push(CaptureOutcome::Extracted(extraction));
        }
        Ok(outcomes)
    }

    /// Enhance, recognise and parse one capture that passed the gate.
    #[instrument(skip_all, fields(capture = %capture.id))]
    pub async fn extract<E: RecognitionEngine>(
        &self,
        session: &mut RecognitionSession<E>,
        capture: &Capture,
        quality: QualityReport,
    ) -> Result<ScheduleExtraction> {
        let enhanced = self
            .enhancer
            .enhance(&capture.image, quality.brightness_score, capture.flash_used);
        if enhanced.degraded {
            warn!("Recognising the unenhanced capture");
        }

        let mut pass_images = vec![enhanced.image];
        if self.config.recognition.recognize_variants {
            pass_images.extend(
                enhanced
                    .variants
                    .into_iter()
                    .map(|variant| DynamicImage::ImageLuma8(variant.image)),
            );
        }

        let mut clusterer = WordClusterer::new(self.config.clustering.clone(), Arc::clone(&self.matcher));
        let mut plain_text = String::new();
        for image in &pass_images {
            let output = session.recognize(image).await?;
            clusterer.add_pass(&output.words);
            if plain_text.is_empty() {
                plain_text = output.text;
            }
        }
        let passes = clusterer.pass_count();
        let merged = clusterer.finish();

        // Engines that report no word positions still return plain text.
        let raw = if merged.clusters.is_empty() { plain_text } else { merged.text };
        let text = self.extract_text(&raw);
        info!(
            passes,
            appointments = text.appointments.len(),
            skipped = text.skipped.len(),
            "Capture extracted"
        );

        Ok(ScheduleExtraction {
            capture_id: capture.id,
            quality,
            degraded: enhanced.degraded,
            recognition_passes: passes,
            text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::NaiveDate;
    use image::{Rgba, RgbaImage};
    use terminscan_core::error::TerminError;
    use terminscan_core::{OcrWord, RecognitionOptions, RecognitionOutput};

    /// Returns a scripted output per call; counts calls and reports release.
    struct ScriptedEngine {
        outputs: Vec<RecognitionOutput>,
        calls: Arc<AtomicUsize>,
        released: Arc<AtomicBool>,
        fail: bool,
    }

    impl Drop for ScriptedEngine {
        fn drop(&mut self) {
            self.released.store(true, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl RecognitionEngine for ScriptedEngine {
        async fn recognize(
            &self,
            _image: &DynamicImage,
            _options: &RecognitionOptions,
        ) -> Result<RecognitionOutput> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(TerminError::Recognition("engine crashed".into()));
            }
            Ok(self.outputs[call % self.outputs.len()].clone())
        }
    }

    struct ScriptedLoader {
        outputs: Vec<RecognitionOutput>,
        calls: Arc<AtomicUsize>,
        loads: AtomicUsize,
        released: Arc<AtomicBool>,
        fail: bool,
    }

    impl ScriptedLoader {
        fn new(outputs: Vec<RecognitionOutput>) -> Self {
            Self {
                outputs,
                calls: Arc::new(AtomicUsize::new(0)),
                loads: AtomicUsize::new(0),
                released: Arc::new(AtomicBool::new(false)),
                fail: false,
            }
        }
    }

    impl EngineLoader for ScriptedLoader {
        type Engine = ScriptedEngine;

        fn load(&self) -> Result<ScriptedEngine> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(ScriptedEngine {
                outputs: self.outputs.clone(),
                calls: Arc::clone(&self.calls),
                released: Arc::clone(&self.released),
                fail: self.fail,
            })
        }
    }

    fn words(rows: &[&[&str]], confidence: f32) -> RecognitionOutput {
        let mut words = Vec::new();
        for (row, tokens) in rows.iter().enumerate() {
            for (col, token) in tokens.iter().enumerate() {
                words.push(OcrWord::new(*token, confidence, col as f32 * 100.0, row as f32 * 40.0));
            }
        }
        RecognitionOutput {
            text: String::new(),
            words,
            confidence,
        }
    }

    /// Full-width dark rules on a light page; passes the default quality gate.
    fn sharp_page() -> Capture {
        Capture::new(
            DynamicImage::ImageRgba8(RgbaImage::from_fn(64, 64, |_, y| {
                let v = if y % 8 < 2 { 10 } else { 245 };
                Rgba([v, v, v, 255])
            })),
            false,
        )
    }

    fn dark_page() -> Capture {
        Capture::new(DynamicImage::ImageRgba8(RgbaImage::from_pixel(64, 64, Rgba([5, 5, 5, 255]))), false)
    }

    const SCHEDULE: &[&[&str]] = &[
        &["Mo.", "01.01.2024"],
        &["08:00", "09:00", "C.", "Jordi", "GR", "Matterhorn", "Termin"],
        &["10:15", "Forum"],
    ];

    #[test]
    fn sharp_page_passes_the_gate() {
        let pipeline = Pipeline::new(PipelineConfig::default()).expect("pipeline");
        let (_, issues) = pipeline.assess(&sharp_page()).expect("assess");
        assert!(issues.is_empty(), "unexpected issues: {issues:?}");
    }

    #[tokio::test]
    async fn rejected_capture_never_reaches_recognition() {
        let pipeline = Pipeline::new(PipelineConfig::default()).expect("pipeline");
        let loader = ScriptedLoader::new(vec![words(SCHEDULE, 90.0)]);

        let outcomes = pipeline.process(&loader, vec![dark_page()]).await.expect("process");
        assert!(matches!(
            &outcomes[0],
            CaptureOutcome::Rejected { issues, .. } if issues.contains(&QualityIssue::TooDark)
        ));
        assert_eq!(loader.loads.load(Ordering::SeqCst), 0);
        assert_eq!(loader.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn accepted_capture_yields_appointments() {
        let pipeline = Pipeline::new(PipelineConfig::default()).expect("pipeline");
        let loader = ScriptedLoader::new(vec![words(SCHEDULE, 90.0)]);

        let outcomes = pipeline
            .process(&loader, vec![sharp_page(), dark_page(), sharp_page()])
            .await
            .expect("process");
        assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
        assert_eq!(outcomes.len(), 3);
        assert!(matches!(outcomes[1], CaptureOutcome::Rejected { .. }));

        let appointments = outcomes[0].appointments();
        assert_eq!(appointments.len(), 2);
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(appointments[0].start, day.and_hms_opt(8, 0, 0).unwrap());
        assert_eq!(appointments[0].end, day.and_hms_opt(9, 0, 0).unwrap());
        assert_eq!(appointments[0].location.as_deref(), Some("GR Matterhorn"));
        assert_eq!(appointments[1].end, day.and_hms_opt(10, 45, 0).unwrap());
        assert!(loader.released.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn variant_passes_are_reconciled() {
        let mut config = PipelineConfig::default();
        config.recognition.recognize_variants = true;
        let pipeline = Pipeline::new(config).expect("pipeline");
        // Every other pass misreads the room.
        let misread: &[&[&str]] = &[
            &["Mo.", "01.01.2024"],
            &["08:00", "09:00", "C.", "Jordi", "GR", "Matterhorm", "Termin"],
            &["10:15", "Forum"],
        ];
        let loader = ScriptedLoader::new(vec![words(SCHEDULE, 90.0), words(misread, 90.0)]);

        let outcomes = pipeline.process(&loader, vec![sharp_page()]).await.expect("process");
        let CaptureOutcome::Extracted(extraction) = &outcomes[0] else {
            panic!("capture was rejected");
        };
        assert_eq!(extraction.recognition_passes, 6);
        assert_eq!(loader.calls.load(Ordering::SeqCst), 6);
        let first = &extraction.text.appointments[0];
        assert_eq!(first.location.as_deref(), Some("GR Matterhorn"));
        assert_eq!(first.description, "Termin");
        assert_eq!(extraction.text.appointments.len(), 2);
    }

    #[tokio::test]
    async fn plain_text_is_used_when_engine_reports_no_words() {
        let pipeline = Pipeline::new(PipelineConfig::default()).expect("pipeline");
        let loader = ScriptedLoader::new(vec![RecognitionOutput {
            text: "Mo. 01.01.2024\n8.15 Sporttherapie 45'".into(),
            words: Vec::new(),
            confidence: 80.0,
        }]);

        let outcomes = pipeline.process(&loader, vec![sharp_page()]).await.expect("process");
        let appointments = outcomes[0].appointments();
        assert_eq!(appointments.len(), 1);
        assert_eq!(appointments[0].duration(), chrono::Duration::minutes(45));
    }

    #[tokio::test]
    async fn session_is_released_after_recognition_failure() {
        let pipeline = Pipeline::new(PipelineConfig::default()).expect("pipeline");
        let mut loader = ScriptedLoader::new(vec![words(SCHEDULE, 90.0)]);
        loader.fail = true;

        let result = pipeline.process(&loader, vec![sharp_page()]).await;
        assert!(matches!(result, Err(TerminError::Recognition(_))));
        assert!(loader.released.load(Ordering::SeqCst));
    }

    #[test]
    fn extract_text_separates_general_info() {
        let pipeline = Pipeline::new(PipelineConfig::default()).expect("pipeline");
        let extraction = pipeline.extract_text("Mo. 01.01.2024\n08:00 Forum\nEssenszeiten\n12:00 Mittagessen");
        assert_eq!(extraction.appointments.len(), 1);
        assert_eq!(extraction.general_info, vec!["Essenszeiten", "12:00 Mittagessen"]);
    }
}
