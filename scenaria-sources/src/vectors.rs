use crate::error::{Result, SourceError};
use scenaria_core::SimilarityOracle;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind, Read};
use std::path::Path;
use tracing::{debug, info};

/// Components reserved ahead of reading, whatever the header claims.
const MAX_RESERVED_FLOATS: usize = 1 << 24;
/// Largest vector accepted, in bytes (a million f32 components).
const MAX_ROW_BYTES: usize = 4 << 20;

/// On-disk layout of a word2vec model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorFormat {
    /// `<count> <dim>\n` header, then `word ` followed by `dim` little-endian f32s.
    Binary,
    /// One `word v1 v2 ...` line per entry, with an optional `<count> <dim>` header.
    Text,
}

/// Pretrained word embeddings, unit-normalized at load time so that
/// similarity is a plain dot product.
#[derive(Debug, Clone)]
pub struct WordVectors {
    dim: usize,
    index: HashMap<String, usize>,
    data: Vec<f32>,
}

impl WordVectors {
    pub fn load(path: &Path, format: VectorFormat) -> Result<Self> {
        info!("Loading {:?} word vectors from {}", format, path.display());
        let reader = BufReader::new(File::open(path)?);
        let vectors = match format {
            VectorFormat::Binary => Self::read_binary(reader)?,
            VectorFormat::Text => Self::read_text(reader)?,
        };
        info!(
            "Loaded {} vectors of dimension {}",
            vectors.len(),
            vectors.dim()
        );
        Ok(vectors)
    }

    pub fn from_map(map: HashMap<String, Vec<f32>>) -> Result<Self> {
        let dim = map
            .values()
            .next()
            .map(Vec::len)
            .ok_or_else(|| SourceError::ModelFormat("no vectors given".to_string()))?;

        let mut vectors = Self::with_capacity(dim, map.len());
        for (word, vector) in map {
            vectors.push(word, vector)?;
        }
        Ok(vectors)
    }

    pub fn read_binary<R: BufRead>(mut reader: R) -> Result<Self> {
        let mut header = String::new();
        reader.read_line(&mut header)?;
        let (count, dim) = parse_header(&header)
            .ok_or_else(|| SourceError::ModelFormat(format!("bad header '{}'", header.trim())))?;

        let row_bytes = dim
            .checked_mul(std::mem::size_of::<f32>())
            .filter(|bytes| *bytes <= MAX_ROW_BYTES)
            .ok_or_else(|| SourceError::ModelFormat(format!("implausible dimension {}", dim)))?;
        count
            .checked_mul(dim)
            .ok_or_else(|| SourceError::ModelFormat(format!("{} x {} vectors overflow", count, dim)))?;

        let mut vectors = Self::with_capacity(dim, count);
        let mut raw = vec![0u8; row_bytes];
        for entry in 0..count {
            let word = read_word(&mut reader)?;
            reader.read_exact(&mut raw).map_err(|e| {
                SourceError::ModelFormat(format!("truncated vector {} ('{}'): {}", entry, word, e))
            })?;
            let vector = raw
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect();
            vectors.push(word, vector)?;
        }
        Ok(vectors)
    }

    pub fn read_text<R: BufRead>(reader: R) -> Result<Self> {
        let mut vectors: Option<Self> = None;

        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim_end();
            if line.is_empty() {
                continue;
            }
            if line_no == 0 && parse_header(line).is_some() {
                continue;
            }

            let mut fields = line.split_whitespace();
            let Some(word) = fields.next() else {
                continue;
            };
            let vector = fields
                .map(str::parse::<f32>)
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(|e| SourceError::ModelFormat(format!("line {}: {}", line_no + 1, e)))?;

            let vectors = vectors.get_or_insert_with(|| Self::with_capacity(vector.len(), 0));
            vectors.push(word.to_string(), vector)?;
        }

        vectors.ok_or_else(|| SourceError::ModelFormat("model contains no vectors".to_string()))
    }

    /// Reserves at most [`MAX_RESERVED_FLOATS`] components up front. Header
    /// counts are not trusted beyond that; storage grows as rows are read.
    fn with_capacity(dim: usize, count: usize) -> Self {
        let rows = count.min(MAX_RESERVED_FLOATS / dim.max(1));
        Self {
            dim,
            index: HashMap::with_capacity(rows),
            data: Vec::with_capacity(dim * rows),
        }
    }

    fn push(&mut self, word: String, mut vector: Vec<f32>) -> Result<()> {
        if vector.len() != self.dim || self.dim == 0 {
            return Err(SourceError::ModelFormat(format!(
                "'{}' has {} components, expected {}",
                word,
                vector.len(),
                self.dim
            )));
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }

        // later duplicates win, as in gensim
        match self.index.get(&word) {
            Some(&row) => {
                self.data[row * self.dim..(row + 1) * self.dim].copy_from_slice(&vector);
            }
            None => {
                self.index.insert(word, self.index.len());
                self.data.extend_from_slice(&vector);
            }
        }
        Ok(())
    }

    fn vector(&self, word: &str) -> Option<&[f32]> {
        let row = *self.index.get(word)?;
        Some(&self.data[row * self.dim..(row + 1) * self.dim])
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.dim
    }
}

impl SimilarityOracle for WordVectors {
    fn contains(&self, node: &str) -> bool {
        self.index.contains_key(node)
    }

    fn similarity(&self, a: &str, b: &str) -> Option<f64> {
        let (va, vb) = (self.vector(a)?, self.vector(b)?);
        let dot: f32 = va.iter().zip(vb).map(|(x, y)| x * y).sum();
        Some(f64::from(dot))
    }
}

fn parse_header(line: &str) -> Option<(usize, usize)> {
    let mut parts = line.split_whitespace();
    let count = parts.next()?.parse().ok()?;
    let dim = parts.next()?.parse().ok()?;
    parts.next().is_none().then_some((count, dim))
}

/// Reads bytes up to the next space, skipping the newlines some writers
/// place between entries.
fn read_word<R: BufRead>(reader: &mut R) -> Result<String> {
    let mut bytes = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        if let Err(e) = reader.read_exact(&mut byte) {
            return Err(match e.kind() {
                ErrorKind::UnexpectedEof => {
                    SourceError::ModelFormat("model ends before the declared count".to_string())
                }
                _ => e.into(),
            });
        }
        match byte[0] {
            b' ' => break,
            b'\n' if bytes.is_empty() => continue,
            b => bytes.push(b),
        }
    }
    String::from_utf8(bytes).map_err(|e| {
        debug!("Undecodable word bytes: {:?}", e.as_bytes());
        SourceError::ModelFormat(format!("word is not UTF-8: {}", e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use tempfile::NamedTempFile;

    fn binary_model(entries: &[(&str, &[f32])], trailing_newline: bool) -> Vec<u8> {
        let dim = entries[0].1.len();
        let mut buf = format!("{} {}\n", entries.len(), dim).into_bytes();
        for (word, vector) in entries {
            buf.extend_from_slice(word.as_bytes());
            buf.push(b' ');
            for v in *vector {
                buf.extend_from_slice(&v.to_le_bytes());
            }
            if trailing_newline {
                buf.push(b'\n');
            }
        }
        buf
    }

    fn assert_close(actual: Option<f64>, expected: f64) {
        let actual = actual.expect("similarity should be defined");
        assert!(
            (actual - expected).abs() < 1e-6,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    #[test]
    fn test_read_binary_model() {
        let bytes = binary_model(
            &[
                ("地球温暖化", &[1.0, 0.0, 0.0]),
                ("気候変動", &[1.0, 1.0, 0.0]),
                ("野球", &[0.0, 0.0, 2.0]),
            ],
            false,
        );
        let vectors = WordVectors::read_binary(Cursor::new(bytes)).unwrap();

        assert_eq!(vectors.len(), 3);
        assert_eq!(vectors.dim(), 3);
        assert!(vectors.contains("気候変動"));
        assert_close(
            vectors.similarity("地球温暖化", "気候変動"),
            std::f64::consts::FRAC_1_SQRT_2,
        );
        assert_close(vectors.similarity("地球温暖化", "野球"), 0.0);
    }

    #[test]
    fn test_binary_model_with_newline_separators() {
        let bytes = binary_model(&[("a", &[3.0, 4.0]), ("b", &[4.0, 3.0])], true);
        let vectors = WordVectors::read_binary(Cursor::new(bytes)).unwrap();

        assert!(vectors.contains("a"));
        assert!(vectors.contains("b"));
        assert_close(vectors.similarity("a", "b"), 0.96);
    }

    #[test]
    fn test_truncated_binary_model_is_rejected() {
        let mut bytes = binary_model(&[("a", &[1.0, 2.0])], false);
        bytes.truncate(bytes.len() - 3);

        let result = WordVectors::read_binary(Cursor::new(bytes));
        assert!(matches!(result, Err(SourceError::ModelFormat(_))));
    }

    #[test]
    fn test_huge_dimension_header_is_rejected() {
        let result = WordVectors::read_binary(Cursor::new(b"2 4611686018427387904\n".to_vec()));
        assert!(matches!(result, Err(SourceError::ModelFormat(_))));
    }

    #[test]
    fn test_huge_count_header_does_not_preallocate() {
        let result =
            WordVectors::read_binary(Cursor::new(b"4611686018427387904 300\nab".to_vec()));
        assert!(matches!(result, Err(SourceError::ModelFormat(_))));
    }

    #[test]
    fn test_overstated_count_reports_truncation() {
        let mut bytes = binary_model(&[("a", &[1.0, 2.0])], false);
        bytes.splice(0..1, b"9".iter().copied());

        let result = WordVectors::read_binary(Cursor::new(bytes));
        assert!(matches!(result, Err(SourceError::ModelFormat(_))));
    }

    #[test]
    fn test_bad_header_is_rejected() {
        let result = WordVectors::read_binary(Cursor::new(b"not a header\n".to_vec()));
        assert!(matches!(result, Err(SourceError::ModelFormat(_))));
    }

    #[test]
    fn test_load_text_model_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "3 2").unwrap();
        writeln!(file, "犬 1.0 0.0").unwrap();
        writeln!(file, "猫 0.8 0.6").unwrap();
        writeln!(file, "車 0.0 -1.0").unwrap();
        file.flush().unwrap();

        let vectors = WordVectors::load(file.path(), VectorFormat::Text).unwrap();

        assert_eq!(vectors.len(), 3);
        assert_close(vectors.similarity("犬", "猫"), 0.8);
        assert_close(vectors.similarity("犬", "車"), 0.0);
        assert_close(vectors.similarity("猫", "猫"), 1.0);
    }

    #[test]
    fn test_text_model_without_header() {
        let text = "x 1 0\ny 0 1\n";
        let vectors = WordVectors::read_text(Cursor::new(text)).unwrap();

        assert_eq!(vectors.len(), 2);
        assert_close(vectors.similarity("x", "y"), 0.0);
    }

    #[test]
    fn test_text_model_dimension_mismatch() {
        let text = "x 1 0\ny 0 1 0\n";
        let result = WordVectors::read_text(Cursor::new(text));
        assert!(matches!(result, Err(SourceError::ModelFormat(_))));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = WordVectors::load(Path::new("/nonexistent/model.bin"), VectorFormat::Binary);
        assert!(matches!(result, Err(SourceError::IoError(_))));
    }

    #[test]
    fn test_unknown_words_have_no_similarity() {
        let vectors =
            WordVectors::from_map(HashMap::from([("known".to_string(), vec![1.0, 0.0])])).unwrap();

        assert!(!vectors.contains("unknown"));
        assert_eq!(vectors.similarity("known", "unknown"), None);
        assert_eq!(vectors.similarity("unknown", "known"), None);
    }

    #[test]
    fn test_from_map_rejects_ragged_vectors() {
        let result = WordVectors::from_map(HashMap::from([
            ("a".to_string(), vec![1.0, 0.0]),
            ("b".to_string(), vec![1.0]),
        ]));
        assert!(matches!(result, Err(SourceError::ModelFormat(_))));
    }

    #[test]
    fn test_zero_vector_is_orthogonal_to_everything() {
        let vectors = WordVectors::from_map(HashMap::from([
            ("zero".to_string(), vec![0.0, 0.0]),
            ("one".to_string(), vec![0.0, 1.0]),
        ]))
        .unwrap();

        assert_close(vectors.similarity("zero", "one"), 0.0);
    }
}
