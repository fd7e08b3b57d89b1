//! Length-delimited record framing for the features artifact's streaming
//! layout (spec sections 4.4, 6, 9 "Framing limit").
//!
//! Each record is a bincode-encoded [`crate::codec::entity::WireFeatureBlockArray`]
//! prefixed by its byte length as an unsigned varint. This is the escape
//! hatch around the single-message size ceiling of the tagged record codec;
//! it must never be used to raise that ceiling, only to go around it.

use std::io::{BufRead, Read, Write};

use varint_rs::{VarintReader, VarintWriter};

use crate::codec::entity::WireFeatureBlockArray;
use crate::error::MapError;

/// Writes one length-prefixed record.
pub fn write_record<W: Write>(writer: &mut W, array: &WireFeatureBlockArray) -> Result<(), MapError> {
    let bytes = bincode::serialize(array)?;
    writer.write_u64_varint(bytes.len() as u64).map_err(|e| MapError::Framing(e.to_string()))?;
    writer.write_all(&bytes).map_err(|e| MapError::io("<features stream>", e))?;
    Ok(())
}

/// Writes every array in sequence, each framed with its own length prefix.
pub fn write_stream<W: Write>(writer: &mut W, arrays: &[WireFeatureBlockArray]) -> Result<(), MapError> {
    for array in arrays {
        write_record(writer, array)?;
    }
    Ok(())
}

/// Reads length-delimited records until the stream is exhausted.
///
/// A failed varint read at a record boundary is treated as a clean
/// end-of-stream (spec section 7); a failure partway through a record body,
/// or a length claiming more bytes than remain, is a genuine framing error.
pub fn read_stream<R: Read>(reader: &mut R) -> Result<Vec<WireFeatureBlockArray>, MapError> {
    let mut reader = std::io::BufReader::new(reader);
    let mut arrays = Vec::new();
    loop {
        let at_eof = reader.fill_buf().map_err(|e| MapError::io("<features stream>", e))?.is_empty();
        if at_eof {
            break;
        }
        let len = match reader.read_u64_varint() {
            Ok(len) => len,
            Err(_) => break,
        };
        let mut buf = vec![0u8; len as usize];
        reader
            .read_exact(&mut buf)
            .map_err(|_| MapError::Framing(format!("record claimed {len} bytes but stream ended first")))?;
        let array: WireFeatureBlockArray = bincode::deserialize(&buf)?;
        arrays.push(array);
    }
    Ok(arrays)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::entity::WireFeatureBlock;

    fn sample_array(keyframe_id: u32) -> WireFeatureBlockArray {
        WireFeatureBlockArray { blocks: vec![WireFeatureBlock { keyframe_id, features: Vec::new() }] }
    }

    #[test]
    fn round_trips_multiple_records() {
        let arrays = vec![sample_array(0), sample_array(1), sample_array(2)];
        let mut buf = Vec::new();
        write_stream(&mut buf, &arrays).unwrap();
        let decoded = read_stream(&mut std::io::Cursor::new(buf)).unwrap();
        assert_eq!(decoded.len(), 3);
        assert_eq!(decoded[1].blocks[0].keyframe_id, 1);
    }

    #[test]
    fn empty_stream_decodes_to_empty_vec() {
        let decoded = read_stream(&mut std::io::Cursor::new(Vec::<u8>::new())).unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn truncated_record_body_is_a_framing_error() {
        let mut buf = Vec::new();
        write_stream(&mut buf, &[sample_array(0)]).unwrap();
        buf.truncate(buf.len() - 1);
        let err = read_stream(&mut std::io::Cursor::new(buf)).unwrap_err();
        assert!(matches!(err, MapError::Framing(_)));
    }
}
