//! Lossless integer codecs for state valuations.
//!
//! Valuations produced by models are arrays of small integers, usually with long runs of
//! equal values. Both codecs below trade some CPU time for a smaller footprint in the
//! state pools and in the shared map.

/// How valuations are encoded before being stored.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Compression {
    /// Store the valuation verbatim (fixed-size slots).
    #[default]
    None,
    /// Store `(value, count)` pairs for runs of equal values.
    RunLength,
    /// Pack four values into one word when every value fits into a byte.
    BytePacked,
}

/// Header of a [`Compression::BytePacked`] encoding whose values did not fit into bytes.
const RAW: i32 = 0;
/// Header of a [`Compression::BytePacked`] encoding with packed values.
const PACKED: i32 = 1;

impl Compression {
    /// Whether the encoded size depends on the valuation.
    pub fn is_variable_size(self) -> bool {
        !matches!(self, Compression::None)
    }

    /// Append the encoding of `values` to `out`.
    pub fn encode(self, values: &[i32], out: &mut Vec<i32>) {
        match self {
            Compression::None => out.extend_from_slice(values),
            Compression::RunLength => encode_runs(values, out),
            Compression::BytePacked => encode_bytes(values, out),
        }
    }

    /// Decode `words` into `out`, which must have the length of the original valuation.
    ///
    /// # Panics
    ///
    /// Panics if `words` is not a valid encoding of a valuation of `out.len()` values.
    pub fn decode(self, words: &[i32], out: &mut [i32]) {
        match self {
            Compression::None => out.copy_from_slice(words),
            Compression::RunLength => decode_runs(words, out),
            Compression::BytePacked => decode_bytes(words, out),
        }
    }
}

fn encode_runs(values: &[i32], out: &mut Vec<i32>) {
    let mut iter = values.iter().copied().peekable();
    while let Some(value) = iter.next() {
        let mut count = 1i32;
        while iter.next_if_eq(&value).is_some() {
            count += 1;
        }
        out.push(value);
        out.push(count);
    }
}

fn decode_runs(words: &[i32], out: &mut [i32]) {
    assert_eq!(words.len() % 2, 0, "Run-length encoding has odd length.");
    let mut position = 0usize;
    for run in words.chunks_exact(2) {
        let count = usize::try_from(run[1]).unwrap_or(0);
        out[position..position + count].fill(run[0]);
        position += count;
    }
    assert_eq!(position, out.len(), "Run-length encoding has wrong length.");
}

fn encode_bytes(values: &[i32], out: &mut Vec<i32>) {
    if values.iter().any(|v| i8::try_from(*v).is_err()) {
        out.push(RAW);
        out.extend_from_slice(values);
        return;
    }
    out.push(PACKED);
    for chunk in values.chunks(4) {
        let mut bytes = [0u8; 4];
        for (byte, value) in bytes.iter_mut().zip(chunk) {
            *byte = (*value as i8) as u8;
        }
        out.push(i32::from_le_bytes(bytes));
    }
}

fn decode_bytes(words: &[i32], out: &mut [i32]) {
    match words.first() {
        Some(&RAW) => out.copy_from_slice(&words[1..]),
        Some(&PACKED) => {
            let packed = &words[1..];
            assert_eq!(packed.len(), out.len().div_ceil(4));
            for (chunk, word) in out.chunks_mut(4).zip(packed) {
                let bytes = word.to_le_bytes();
                for (value, byte) in chunk.iter_mut().zip(bytes) {
                    *value = i32::from(byte as i8);
                }
            }
        }
        _ => panic!("Invalid byte-packed encoding header."),
    }
}

#[cfg(test)]
mod tests {
    use super::Compression;

    fn encoded(compression: Compression, values: &[i32]) -> Vec<i32> {
        let mut out = Vec::new();
        compression.encode(values, &mut out);
        let mut decoded = vec![0; values.len()];
        compression.decode(&out, &mut decoded);
        assert_eq!(decoded, values);
        out
    }

    #[test]
    fn run_length_merges_runs() {
        let values = [0, 0, 0, 0, 5, 5, -1, 0, 0];
        let out = encoded(Compression::RunLength, &values);
        assert_eq!(out, vec![0, 4, 5, 2, -1, 1, 0, 2]);
        assert!(encoded(Compression::RunLength, &[]).is_empty());
    }

    #[test]
    fn byte_packing_falls_back_to_raw_words() {
        let small = [1, -2, 3, 127, -128, 0];
        let out = encoded(Compression::BytePacked, &small);
        // Header plus two packed words.
        assert_eq!(out.len(), 3);

        let large = [1, 1000, 3];
        let out = encoded(Compression::BytePacked, &large);
        assert_eq!(out, vec![0, 1, 1000, 3]);
    }

    #[test]
    fn only_plain_encoding_has_fixed_size() {
        assert!(!Compression::None.is_variable_size());
        assert!(Compression::RunLength.is_variable_size());
        assert!(Compression::BytePacked.is_variable_size());
        assert_eq!(encoded(Compression::None, &[4, 2]), vec![4, 2]);
    }
}
