//! Drives one document from its byte source to a finished mesh.
//!
//! Each chunk runs through the tokenizer and the extraction context to
//! completion before the next one is requested from the reader thread.

use std::path::Path;

use crate::citygml::event::{EventSink, ParseEvent};
use crate::citygml::extractor::{ExtractionContext, ExtractionStats};
use crate::citygml::stream::{DocumentStream, StreamMessage};
use crate::citygml::tokenizer::XmlTokenizer;
use crate::config::ViewerConfig;
use crate::error::Result;
use crate::geometry::{BoundingBox, MeshList};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    pub consumed: u64,
    pub total: u64,
}

impl Progress {
    /// Fraction of the document consumed, in `[0, 1]`.
    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            return if self.consumed > 0 { 1.0 } else { 0.0 };
        }
        (self.consumed as f64 / self.total as f64).clamp(0.0, 1.0) as f32
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadStatus {
    Loading(Progress),
    Finished,
    Failed(String),
}

impl LoadStatus {
    pub fn is_done(&self) -> bool {
        !matches!(self, LoadStatus::Loading(_))
    }
}

pub struct DocumentLoader {
    stream: DocumentStream,
    tokenizer: XmlTokenizer,
    context: ExtractionContext,
    progress: Progress,
    chunks: usize,
    requested: bool,
    outcome: Option<LoadStatus>,
}

impl DocumentLoader {
    pub fn open(path: &Path, config: &ViewerConfig) -> Result<Self> {
        let stream = DocumentStream::open(path, config.chunk_size)?;
        Ok(Self::from_stream(stream, config))
    }

    pub fn from_stream(stream: DocumentStream, config: &ViewerConfig) -> Self {
        let progress = Progress {
            consumed: 0,
            total: stream.total_size(),
        };
        Self {
            stream,
            tokenizer: XmlTokenizer::new(),
            context: ExtractionContext::new(config.numeric_policy),
            progress,
            chunks: 0,
            requested: false,
            outcome: None,
        }
    }

    pub fn progress(&self) -> Progress {
        self.progress
    }

    pub fn context(&self) -> &ExtractionContext {
        &self.context
    }

    pub fn stats(&self) -> &ExtractionStats {
        self.context.stats()
    }

    pub fn status(&self) -> LoadStatus {
        self.outcome
            .clone()
            .unwrap_or(LoadStatus::Loading(self.progress))
    }

    /// Processes at most one chunk without blocking.
    pub fn pump(&mut self) -> LoadStatus {
        self.step(false)
    }

    /// Processes the whole document on the calling thread.
    pub fn run_to_end(&mut self) -> LoadStatus {
        loop {
            let status = self.step(true);
            if status.is_done() {
                return status;
            }
        }
    }

    pub fn into_parts(self) -> (MeshList, BoundingBox) {
        self.context.into_parts()
    }

    fn step(&mut self, blocking: bool) -> LoadStatus {
        if let Some(outcome) = &self.outcome {
            return outcome.clone();
        }

        if !self.requested {
            self.stream.request_chunk();
            self.requested = true;
        }

        let message = if blocking {
            match self.stream.recv() {
                Some(message) => message,
                None => StreamMessage::Failed("document reader stopped".into()),
            }
        } else {
            match self.stream.try_recv() {
                Some(message) => message,
                None => return LoadStatus::Loading(self.progress),
            }
        };
        self.requested = false;

        match message {
            StreamMessage::Chunk(bytes) => {
                self.chunks += 1;
                self.progress.consumed += bytes.len() as u64;
                if let Err(e) = self.tokenizer.write(&bytes, &mut self.context) {
                    return self.finish(LoadStatus::Failed(e.to_string()));
                }
                log::debug!(
                    "Chunk {}: {:.1}% ({} polygons so far)",
                    self.chunks,
                    self.progress.fraction() * 100.0,
                    self.context.stats().polygons
                );

                // chunk fully consumed, the reader may fetch the next one
                self.stream.request_chunk();
                self.requested = true;
                LoadStatus::Loading(self.progress)
            }
            StreamMessage::Eof => match self.tokenizer.close(&mut self.context) {
                Ok(()) => self.finish(LoadStatus::Finished),
                Err(e) => self.finish(LoadStatus::Failed(e.to_string())),
            },
            StreamMessage::Failed(message) => {
                self.context.handle_event(ParseEvent::Error(message.clone()));
                self.finish(LoadStatus::Failed(message))
            }
        }
    }

    fn finish(&mut self, status: LoadStatus) -> LoadStatus {
        match &status {
            LoadStatus::Finished => log::info!(
                "Document loaded in {} chunk(s): {} meshes",
                self.chunks,
                self.context.meshes().len()
            ),
            LoadStatus::Failed(message) => log::error!(
                "Loading stopped after {} chunk(s): {}",
                self.chunks,
                message
            ),
            LoadStatus::Loading(_) => {}
        }
        self.outcome = Some(status.clone());
        status
    }
}

/// Extracts an in-memory document, split into `config.chunk_size` pieces.
///
/// A tokenizer failure stops extraction; the partial result and the error
/// stay available on the returned context.
pub fn load_str(text: &str, config: &ViewerConfig) -> ExtractionContext {
    let mut context = ExtractionContext::new(config.numeric_policy);
    let mut tokenizer = XmlTokenizer::new();

    for chunk in text.as_bytes().chunks(config.chunk_size.max(1)) {
        if tokenizer.write(chunk, &mut context).is_err() {
            return context;
        }
    }
    let _ = tokenizer.close(&mut context);
    context
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const BUILDING: &str = r#"<?xml version="1.0"?>
<core:CityModel xmlns:core="http://www.opengis.net/citygml/2.0" xmlns:gml="http://www.opengis.net/gml">
  <core:cityObjectMember>
    <bldg:Building>
      <bldg:boundedBy>
        <bldg:RoofSurface>
          <bldg:lod2MultiSurface>
            <gml:MultiSurface>
              <gml:surfaceMember>
                <gml:Polygon>
                  <gml:exterior>
                    <gml:LinearRing>
                      <gml:posList>0 0 10 8 0 10 8 6 10 0 6 10 0 0 10</gml:posList>
                    </gml:LinearRing>
                  </gml:exterior>
                </gml:Polygon>
              </gml:surfaceMember>
            </gml:MultiSurface>
          </bldg:lod2MultiSurface>
        </bldg:RoofSurface>
      </bldg:boundedBy>
    </bldg:Building>
  </core:cityObjectMember>
</core:CityModel>
"#;

    fn small_chunks() -> ViewerConfig {
        ViewerConfig {
            chunk_size: 7,
            ..ViewerConfig::default()
        }
    }

    #[test]
    fn test_progress_fraction() {
        assert_eq!(Progress { consumed: 0, total: 0 }.fraction(), 0.0);
        assert_eq!(Progress { consumed: 5, total: 10 }.fraction(), 0.5);
        assert_eq!(Progress { consumed: 12, total: 10 }.fraction(), 1.0);
    }

    #[test]
    fn test_load_str() {
        let context = load_str(BUILDING, &small_chunks());
        assert!(context.is_closed());
        assert!(context.error().is_none());
        assert_eq!(context.meshes().len(), 1);
        assert_eq!(context.stats().triangles, 2);
        assert_eq!(context.bounds().upper().x, 8.0);
    }

    #[test]
    fn test_pump_until_finished() {
        let config = small_chunks();
        let total = BUILDING.len() as u64;
        let stream =
            DocumentStream::from_reader(Cursor::new(BUILDING.as_bytes().to_vec()), total, 7);
        let mut loader = DocumentLoader::from_stream(stream, &config);

        let mut last_fraction = 0.0;
        let status = loop {
            match loader.pump() {
                LoadStatus::Loading(progress) => {
                    assert!(progress.fraction() >= last_fraction);
                    last_fraction = progress.fraction();
                    std::thread::yield_now();
                }
                done => break done,
            }
        };

        assert_eq!(status, LoadStatus::Finished);
        assert_eq!(loader.progress().consumed, total);
        assert_eq!(loader.pump(), LoadStatus::Finished);

        let (meshes, bounds) = loader.into_parts();
        assert_eq!(meshes.len(), 1);
        assert_eq!(bounds.center().z, 10.0);
    }

    #[test]
    fn test_truncated_document_keeps_partial_mesh() {
        let cut = BUILDING.find("</gml:surfaceMember>").unwrap_or(BUILDING.len());
        let text = &BUILDING[..cut];
        let stream = DocumentStream::from_reader(
            Cursor::new(text.as_bytes().to_vec()),
            text.len() as u64,
            64,
        );
        let mut loader = DocumentLoader::from_stream(stream, &ViewerConfig::default());

        let status = loader.run_to_end();
        assert!(matches!(status, LoadStatus::Failed(_)));
        assert_eq!(loader.context().meshes().len(), 1);
        assert!(loader.context().is_closed());
    }
}
