//! Block padding schemes.
//!
//! Unpadding inspects every byte of the final block regardless of where the
//! padding starts, and every failure collapses into the single
//! `Error::InvalidPadding`, so neither timing nor the error value reveals the
//! position of the first bad byte.

use std::fmt;
use std::str::FromStr;

use rand::RngCore;
use serde::{Deserialize, Serialize};
use subtle::{Choice, ConditionallySelectable, ConstantTimeEq, ConstantTimeGreater};

use streamcrypt_common::{Error, Result};

/// Supported padding schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PaddingScheme {
    /// No padding; input must be block aligned.
    #[default]
    None,
    /// PKCS#7: every pad byte holds the pad length.
    Pkcs7,
    /// ISO/IEC 7816-4: a 0x80 marker followed by zeros.
    Iso7816,
    /// ISO 10126: random filler, last byte holds the pad length.
    Iso10126,
    /// ANSI X9.23: zero filler, last byte holds the pad length.
    X923,
}

impl PaddingScheme {
    pub const ALL: [PaddingScheme; 5] = [
        PaddingScheme::None,
        PaddingScheme::Pkcs7,
        PaddingScheme::Iso7816,
        PaddingScheme::Iso10126,
        PaddingScheme::X923,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PaddingScheme::None => "None",
            PaddingScheme::Pkcs7 => "PKCS7",
            PaddingScheme::Iso7816 => "ISO7816",
            PaddingScheme::Iso10126 => "ISO10126",
            PaddingScheme::X923 => "X923",
        }
    }

    /// Complete the final partial block.
    ///
    /// # Preconditions
    /// - `partial.len() < block_size`
    /// - `block_size` is between 1 and 255
    ///
    /// # Postconditions
    /// - Returns `partial` followed by padding; the result is exactly one
    ///   block, or empty for `None` with empty input
    ///
    /// # Errors
    /// - `InvalidBlockAlignment` for `None` with a non-empty remainder
    /// - `InvalidInput` if the preconditions are violated
    pub fn pad(&self, partial: &[u8], block_size: usize) -> Result<Vec<u8>> {
        check_block_size(block_size)?;
        if partial.len() >= block_size {
            return Err(Error::InvalidInput(format!(
                "Padding remainder of {} bytes is not shorter than the {}-byte block",
                partial.len(),
                block_size
            )));
        }

        let pad_len = block_size - partial.len();
        let mut block = Vec::with_capacity(block_size);
        block.extend_from_slice(partial);

        match self {
            PaddingScheme::None => {
                if !partial.is_empty() {
                    return Err(Error::InvalidBlockAlignment {
                        operation: "pad".to_string(),
                        block_size,
                    });
                }
            }
            PaddingScheme::Pkcs7 => block.resize(block_size, pad_len as u8),
            PaddingScheme::Iso7816 => {
                block.push(0x80);
                block.resize(block_size, 0);
            }
            PaddingScheme::Iso10126 => {
                let mut filler = vec![0u8; pad_len - 1];
                rand::thread_rng().fill_bytes(&mut filler);
                block.extend_from_slice(&filler);
                block.push(pad_len as u8);
            }
            PaddingScheme::X923 => {
                block.resize(block_size - 1, 0);
                block.push(pad_len as u8);
            }
        }

        Ok(block)
    }

    /// Strip padding from the final decrypted block.
    ///
    /// # Preconditions
    /// - `block.len() == block_size` for every scheme except `None`
    ///
    /// # Postconditions
    /// - Returns the data bytes that preceded the padding
    ///
    /// # Errors
    /// - `InvalidPadding` for any malformed padding, or for `None` when the
    ///   block is not empty
    ///
    /// # Security
    /// - Runs in time independent of the pad length and of which byte is bad
    pub fn unpad(&self, block: &[u8], block_size: usize) -> Result<Vec<u8>> {
        check_block_size(block_size)?;

        if *self == PaddingScheme::None {
            return if block.is_empty() {
                Ok(Vec::new())
            } else {
                Err(Error::InvalidPadding)
            };
        }
        if block.len() != block_size {
            return Err(Error::InvalidPadding);
        }

        let (valid, data_len) = match self {
            PaddingScheme::None => (Choice::from(0), 0),
            PaddingScheme::Pkcs7 => check_counted(block, Filler::Repeat),
            PaddingScheme::X923 => check_counted(block, Filler::Zero),
            PaddingScheme::Iso10126 => check_counted(block, Filler::Any),
            PaddingScheme::Iso7816 => check_marker(block),
        };

        if bool::from(valid) {
            Ok(block[..data_len].to_vec())
        } else {
            Err(Error::InvalidPadding)
        }
    }
}

impl fmt::Display for PaddingScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PaddingScheme {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_uppercase())
            .collect();
        match wanted.as_str() {
            "NONE" | "NOPADDING" => Ok(PaddingScheme::None),
            "PKCS7" | "PKCS5" => Ok(PaddingScheme::Pkcs7),
            "ISO7816" | "ISO78164" => Ok(PaddingScheme::Iso7816),
            "ISO10126" => Ok(PaddingScheme::Iso10126),
            "X923" | "ANSIX923" => Ok(PaddingScheme::X923),
            _ => Err(Error::UnknownAlgorithm(s.to_string())),
        }
    }
}

fn check_block_size(block_size: usize) -> Result<()> {
    if block_size == 0 || block_size > u8::MAX as usize {
        return Err(Error::InvalidInput(format!(
            "Block size {} cannot be padded",
            block_size
        )));
    }
    Ok(())
}

/// What the non-final pad bytes of a length-counted scheme must hold.
#[derive(Clone, Copy)]
enum Filler {
    Repeat,
    Zero,
    Any,
}

/// Validate a scheme whose last byte is the pad length.
///
/// Returns the validity bit and the data length; the length is only
/// meaningful when the bit is set.
fn check_counted(block: &[u8], filler: Filler) -> (Choice, usize) {
    let block_size = block.len();
    let last = block_size - 1;
    let pad_len = block[last];

    let mut valid = !pad_len.ct_eq(&0) & !pad_len.ct_gt(&(block_size as u8));

    for (i, &byte) in block.iter().enumerate().take(last) {
        let distance = (block_size - i) as u8;
        let in_padding = !distance.ct_gt(&pad_len);
        let byte_ok = match filler {
            Filler::Repeat => byte.ct_eq(&pad_len),
            Filler::Zero => byte.ct_eq(&0),
            Filler::Any => Choice::from(1),
        };
        valid &= !in_padding | byte_ok;
    }

    let data_len = block_size.saturating_sub(pad_len as usize);
    (valid, data_len)
}

/// Validate ISO/IEC 7816-4 padding: trailing zeros preceded by 0x80.
fn check_marker(block: &[u8]) -> (Choice, usize) {
    let mut found = Choice::from(0);
    let mut bad = Choice::from(0);
    let mut marker_at = 0u8;

    for (i, &byte) in block.iter().enumerate().rev() {
        let is_marker = byte.ct_eq(&0x80);
        let is_zero = byte.ct_eq(&0);
        marker_at.conditional_assign(&(i as u8), !found & is_marker);
        bad |= !found & !is_marker & !is_zero;
        found |= is_marker;
    }

    (found & !bad, marker_at as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BS: usize = 16;

    #[test]
    fn test_pkcs7_full_block_when_aligned() {
        let padded = PaddingScheme::Pkcs7.pad(&[], BS).unwrap();
        assert_eq!(padded, vec![16u8; 16]);
        assert!(PaddingScheme::Pkcs7.unpad(&padded, BS).unwrap().is_empty());
    }

    #[test]
    fn test_every_scheme_round_trips_every_remainder() {
        for scheme in [
            PaddingScheme::Pkcs7,
            PaddingScheme::Iso7816,
            PaddingScheme::Iso10126,
            PaddingScheme::X923,
        ] {
            for len in 0..BS {
                let data: Vec<u8> = (0..len as u8).map(|b| b.wrapping_mul(37)).collect();
                let padded = scheme.pad(&data, BS).unwrap();
                assert_eq!(padded.len(), BS, "{} len {}", scheme, len);
                assert_eq!(scheme.unpad(&padded, BS).unwrap(), data, "{} len {}", scheme, len);
            }
        }
    }

    #[test]
    fn test_pad_layouts() {
        let data = [0xAAu8; 13];
        let x923 = PaddingScheme::X923.pad(&data, BS).unwrap();
        assert_eq!(&x923[13..], &[0, 0, 3]);

        let iso = PaddingScheme::Iso7816.pad(&data, BS).unwrap();
        assert_eq!(&iso[13..], &[0x80, 0, 0]);

        let iso10126 = PaddingScheme::Iso10126.pad(&data, BS).unwrap();
        assert_eq!(iso10126[15], 3);
    }

    #[test]
    fn test_pkcs7_rejects_malformed() {
        let mut block = [0x41u8; BS];
        block[15] = 0;
        assert!(matches!(PaddingScheme::Pkcs7.unpad(&block, BS), Err(Error::InvalidPadding)));

        block[15] = 17;
        assert!(matches!(PaddingScheme::Pkcs7.unpad(&block, BS), Err(Error::InvalidPadding)));

        block[15] = 3;
        block[14] = 3;
        block[13] = 2;
        assert!(matches!(PaddingScheme::Pkcs7.unpad(&block, BS), Err(Error::InvalidPadding)));

        block[13] = 3;
        assert_eq!(PaddingScheme::Pkcs7.unpad(&block, BS).unwrap(), vec![0x41u8; 13]);
    }

    #[test]
    fn test_x923_rejects_nonzero_filler() {
        let mut block = PaddingScheme::X923.pad(&[1, 2, 3], BS).unwrap();
        block[5] = 9;
        assert!(matches!(PaddingScheme::X923.unpad(&block, BS), Err(Error::InvalidPadding)));
    }

    #[test]
    fn test_iso7816_rejects_missing_marker() {
        assert!(matches!(
            PaddingScheme::Iso7816.unpad(&[0u8; BS], BS),
            Err(Error::InvalidPadding)
        ));
        let mut block = [0u8; BS];
        block[3] = 0x80;
        block[9] = 0x01;
        assert!(matches!(PaddingScheme::Iso7816.unpad(&block, BS), Err(Error::InvalidPadding)));

        // Data may itself contain 0x80 before the real marker.
        let mut block = [0u8; BS];
        block[2] = 0x80;
        block[7] = 0x80;
        assert_eq!(PaddingScheme::Iso7816.unpad(&block, BS).unwrap(), block[..7].to_vec());
    }

    #[test]
    fn test_none_scheme() {
        assert!(PaddingScheme::None.pad(&[], BS).unwrap().is_empty());
        assert!(matches!(
            PaddingScheme::None.pad(&[1, 2], BS),
            Err(Error::InvalidBlockAlignment { block_size: 16, .. })
        ));
        assert!(PaddingScheme::None.unpad(&[], BS).unwrap().is_empty());
        assert!(matches!(PaddingScheme::None.unpad(&[0u8; BS], BS), Err(Error::InvalidPadding)));
    }

    #[test]
    fn test_wrong_block_length_is_invalid_padding() {
        assert!(matches!(PaddingScheme::Pkcs7.unpad(&[1u8; 8], BS), Err(Error::InvalidPadding)));
        assert!(PaddingScheme::Pkcs7.pad(&[0u8; BS], BS).is_err());
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("pkcs7".parse::<PaddingScheme>().unwrap(), PaddingScheme::Pkcs7);
        assert_eq!("ISO-7816-4".parse::<PaddingScheme>().unwrap(), PaddingScheme::Iso7816);
        assert_eq!("x9.23".parse::<PaddingScheme>().unwrap(), PaddingScheme::X923);
        assert!("zero".parse::<PaddingScheme>().is_err());
    }
}
