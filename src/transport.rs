//! Code transport
//!
//! Serializes one exported fragment to its minimal textual form, enforces
//! the visual code's capacity ceiling, and hands the rendered artifact off
//! through an ephemeral share area. The code rendering itself is an
//! external capability behind [`CodeEngine`]; this module owns everything
//! around it.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value as Json;
use tracing::debug;

use crate::error::{PortError, Result};

/// Byte capacity of the largest code the transport renders: version 40 at
/// medium error correction in byte mode. A document longer than this cannot
/// be encoded into a single code, and chunking is unsupported.
pub const CODE_CAPACITY: usize = 2331;

/// Name of the staged artifact inside the share area.
const ARTIFACT_NAME: &str = "qrcode.png";

/// Error-correction level of the rendered code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCorrection {
    Low,
    Medium,
    Quartile,
    High,
}

/// Rendering options handed to the [`CodeEngine`].
#[derive(Debug, Clone)]
pub struct CodeOptions {
    /// Logical size of the square code, in units.
    pub size: u32,
    /// Magnification applied when rasterizing.
    pub magnification: u32,
    pub error_correction: ErrorCorrection,
    /// Optional watermark image composited over the code. Cosmetic only;
    /// engines must keep the code decodable with it applied.
    pub watermark: Option<Vec<u8>>,
}

impl Default for CodeOptions {
    fn default() -> Self {
        CodeOptions {
            size: 512,
            magnification: 10,
            error_correction: ErrorCorrection::Medium,
            watermark: None,
        }
    }
}

/// A rendered code artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeImage {
    pub width: u32,
    pub height: u32,
    /// PNG-encoded pixels.
    pub png: Vec<u8>,
}

/// The code-rendering capability the transport consumes.
///
/// Implementations wrap whatever renderer and scanner the host application
/// has; the engine only promises `decode(encode(text)) == text` for text
/// within capacity.
pub trait CodeEngine {
    fn encode(&self, text: &str, options: &CodeOptions) -> Result<CodeImage>;

    fn decode(&self, image: &CodeImage) -> Result<String>;
}

/// Serialize a fragment to its minimal (non-pretty-printed) textual form.
pub fn compact_text(fragment: &Json) -> Result<String> {
    Ok(serde_json::to_string(fragment)?)
}

/// Render one fragment into a code image, failing without producing an
/// artifact when the text exceeds the code capacity.
pub fn encode_fragment<E: CodeEngine>(
    engine: &E,
    fragment: &Json,
    options: &CodeOptions,
) -> Result<CodeImage> {
    let text = compact_text(fragment)?;
    let size = text.len();
    if size > CODE_CAPACITY {
        return Err(PortError::CapacityExceeded {
            size,
            capacity: CODE_CAPACITY,
        });
    }
    debug!(bytes = size, "encoding fragment");
    engine.encode(&text, options)
}

/// Decode a scanned code image back into an interchange document fragment.
pub fn decode_image<E: CodeEngine>(engine: &E, image: &CodeImage) -> Result<Json> {
    let text = engine.decode(image)?;
    serde_json::from_str(&text).map_err(|e| PortError::DecodeFailed(e.to_string()))
}

/// Ephemeral staging directory for handing artifacts to a share sink.
///
/// Files staged here live until the caller clears the area, mirroring the
/// share-then-cleanup flow of the host application.
#[derive(Debug, Clone)]
pub struct ShareArea {
    root: PathBuf,
}

impl ShareArea {
    /// Share area under the system temporary directory.
    pub fn new() -> Self {
        ShareArea {
            root: std::env::temp_dir().join("graphport-share"),
        }
    }

    /// Share area rooted at an explicit path.
    pub fn at(root: impl Into<PathBuf>) -> Self {
        ShareArea { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write a rendered code into the area, returning the artifact path.
    pub fn stage(&self, image: &CodeImage) -> Result<PathBuf> {
        fs::create_dir_all(&self.root)?;
        let path = self.root.join(ARTIFACT_NAME);
        fs::write(&path, &image.png)?;
        Ok(path)
    }

    /// Remove every staged artifact.
    pub fn clear(&self) -> Result<()> {
        if !self.root.exists() {
            return Ok(());
        }
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.is_file() {
                fs::remove_file(path)?;
            }
        }
        Ok(())
    }
}

impl Default for ShareArea {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod test_engine {
    use super::*;

    /// Engine that stores the text verbatim in the image bytes. Exercises
    /// the transport contract without a real renderer.
    pub struct EchoEngine;

    impl CodeEngine for EchoEngine {
        fn encode(&self, text: &str, options: &CodeOptions) -> Result<CodeImage> {
            let side = options.size * options.magnification;
            Ok(CodeImage {
                width: side,
                height: side,
                png: text.as_bytes().to_vec(),
            })
        }

        fn decode(&self, image: &CodeImage) -> Result<String> {
            String::from_utf8(image.png.clone())
                .map_err(|_| PortError::DecodeFailed("not text".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_engine::EchoEngine;
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fragment_round_trips_through_engine() {
        let fragment = json!({"id": "abc", "name": "Iron Sword", "level": 3});
        let image = encode_fragment(&EchoEngine, &fragment, &CodeOptions::default()).unwrap();
        assert_eq!(image.width, 5120);
        assert_eq!(decode_image(&EchoEngine, &image).unwrap(), fragment);
    }

    #[test]
    fn test_compact_text_is_minimal() {
        let text = compact_text(&json!({"id": "abc", "level": 3})).unwrap();
        assert!(!text.contains('\n'));
        assert!(!text.contains(": "));
    }

    #[test]
    fn test_capacity_exceeded_produces_no_artifact() {
        let fragment = json!({"notes": "x".repeat(CODE_CAPACITY)});
        match encode_fragment(&EchoEngine, &fragment, &CodeOptions::default()) {
            Err(PortError::CapacityExceeded { size, capacity }) => {
                assert!(size > capacity);
                assert_eq!(capacity, CODE_CAPACITY);
            }
            other => panic!("expected CapacityExceeded, got {:?}", other.map(|i| i.png.len())),
        }
    }

    #[test]
    fn test_malformed_artifact_fails_decode() {
        let image = CodeImage {
            width: 512,
            height: 512,
            png: b"{not json".to_vec(),
        };
        assert!(matches!(
            decode_image(&EchoEngine, &image),
            Err(PortError::DecodeFailed(_))
        ));
    }

    #[test]
    fn test_share_area_stage_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let area = ShareArea::at(dir.path().join("share"));
        let image = CodeImage {
            width: 1,
            height: 1,
            png: vec![1, 2, 3],
        };

        let path = area.stage(&image).unwrap();
        assert_eq!(fs::read(&path).unwrap(), vec![1, 2, 3]);

        area.clear().unwrap();
        assert!(!path.exists());
        // Clearing an already-empty area is fine.
        area.clear().unwrap();
    }
}
