use std::fmt;
use std::path::{Path, PathBuf};

use super::ShaderError;

const UTF8_BOM: &str = "\u{feff}";

/// Pipeline stage a piece of source text is compiled for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub(crate) fn matches(self, stage: naga::ShaderStage) -> bool {
        matches!(
            (self, stage),
            (Self::Vertex, naga::ShaderStage::Vertex) | (Self::Fragment, naga::ShaderStage::Fragment)
        )
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vertex => f.write_str("vertex"),
            Self::Fragment => f.write_str("fragment"),
        }
    }
}

/// Remove a leading UTF-8 byte-order mark, if any
pub fn strip_bom(source: &str) -> &str {
    source.strip_prefix(UTF8_BOM).unwrap_or(source)
}

/// Vertex and fragment source text, as read from disk
#[derive(Debug, Clone)]
pub struct ShaderSources {
    pub vertex: String,
    pub fragment: String,
}

impl ShaderSources {
    pub fn read(vertex_path: &Path, fragment_path: &Path) -> Result<Self, ShaderError> {
        Ok(Self {
            vertex: read_stage(ShaderStage::Vertex, vertex_path)?,
            fragment: read_stage(ShaderStage::Fragment, fragment_path)?,
        })
    }
}

fn read_stage(stage: ShaderStage, path: &Path) -> Result<String, ShaderError> {
    std::fs::read_to_string(path).map_err(|source| ShaderError::Read {
        stage,
        path: PathBuf::from(path),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn bom_is_stripped_once_from_the_start() {
        assert_eq!(strip_bom("\u{feff}fn main() {}"), "fn main() {}");
        assert_eq!(strip_bom("fn main() {}"), "fn main() {}");
        assert_eq!(strip_bom("\u{feff}\u{feff}x"), "\u{feff}x");
        assert_eq!(strip_bom("a\u{feff}"), "a\u{feff}");
        assert_eq!(strip_bom(""), "");
    }

    #[test]
    fn bom_bytes_match_utf8_encoding() {
        assert_eq!(UTF8_BOM.as_bytes(), &[0xEF, 0xBB, 0xBF]);
    }

    #[test]
    fn read_reports_the_failing_stage() {
        let dir = tempfile::tempdir().unwrap();
        let vertex_path = dir.path().join("mesh.vert.wgsl");
        let mut file = std::fs::File::create(&vertex_path).unwrap();
        writeln!(file, "// vertex").unwrap();

        let missing = dir.path().join("missing.frag.wgsl");
        match ShaderSources::read(&vertex_path, &missing) {
            Err(ShaderError::Read { stage, path, .. }) => {
                assert_eq!(stage, ShaderStage::Fragment);
                assert_eq!(path, missing);
            }
            other => panic!("expected read error, got {other:?}"),
        }
    }

    #[test]
    fn read_keeps_text_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let vertex_path = dir.path().join("v.wgsl");
        let fragment_path = dir.path().join("f.wgsl");
        std::fs::write(&vertex_path, "\u{feff}// v").unwrap();
        std::fs::write(&fragment_path, "// f").unwrap();

        let sources = ShaderSources::read(&vertex_path, &fragment_path).unwrap();
        assert_eq!(sources.vertex, "\u{feff}// v");
        assert_eq!(sources.fragment, "// f");
    }
}
