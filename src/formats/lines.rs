//! Line-per-block text encoding.
//!
//! Each record is `{dx}~{dy}~{dz}~{type_id}` where the offsets are relative
//! to the anchor chosen at save time.

use serde::{Deserialize, Serialize};

use crate::block_type::{BlockType, TYPE_DELIMITER};
use crate::error::{Result, SchematicError};
use crate::position::BlockPosition;

/// One block of a schematic: where it sits relative to the anchor and what it is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockRecord {
    pub offset: BlockPosition,
    pub block: BlockType,
}

impl BlockRecord {
    pub fn new(offset: impl Into<BlockPosition>, block: impl Into<BlockType>) -> Self {
        Self {
            offset: offset.into(),
            block: block.into(),
        }
    }

    /// Record for a block at absolute `pos`, saved relative to `anchor`.
    pub fn relative_to(
        pos: BlockPosition,
        anchor: BlockPosition,
        block: impl Into<BlockType>,
    ) -> Result<Self> {
        let offset = pos
            .checked_sub(anchor)
            .ok_or(SchematicError::CoordinateOverflow {
                base: pos,
                offset: anchor,
            })?;
        Ok(Self::new(offset, block))
    }

    /// Absolute position of this record when placed at `anchor`.
    pub fn target(&self, anchor: BlockPosition) -> Result<BlockPosition> {
        anchor
            .checked_add(self.offset)
            .ok_or(SchematicError::CoordinateOverflow {
                base: anchor,
                offset: self.offset,
            })
    }

    pub fn to_line(&self) -> Result<String> {
        self.block.validate()?;
        Ok(format!(
            "{}{d}{}{d}{}{d}{}",
            self.offset.x,
            self.offset.y,
            self.offset.z,
            self.block,
            d = TYPE_DELIMITER
        ))
    }

    /// Parse one line. `line_number` is 1-based and only used for errors.
    pub fn from_line(line: &str, line_number: usize) -> Result<Self> {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let malformed = || SchematicError::MalformedLine {
            line_number,
            line: line.to_string(),
        };

        let fields: Vec<&str> = line.split(TYPE_DELIMITER).collect();
        if fields.len() != 4 {
            return Err(malformed());
        }
        let parse = |s: &str| s.parse::<i32>().map_err(|_| malformed());
        let offset = BlockPosition::new(parse(fields[0])?, parse(fields[1])?, parse(fields[2])?);
        if fields[3].is_empty() {
            return Err(malformed());
        }
        Ok(Self::new(offset, fields[3]))
    }
}

/// Encode absolute blocks relative to `anchor`, keeping their order.
pub fn encode<'a, I>(blocks: I, anchor: BlockPosition) -> Result<Vec<String>>
where
    I: IntoIterator<Item = (BlockPosition, &'a BlockType)>,
{
    blocks
        .into_iter()
        .map(|(pos, block)| BlockRecord::relative_to(pos, anchor, block.clone())?.to_line())
        .collect()
}

/// Decode records in file order. Fails on the first malformed line.
pub fn decode<I, S>(lines: I) -> Result<Vec<BlockRecord>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    lines
        .into_iter()
        .enumerate()
        .map(|(index, line)| BlockRecord::from_line(line.as_ref(), index + 1))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_relative_to_anchor() {
        let stone = BlockType::new("Stone");
        let lines = encode(
            [(BlockPosition::new(11, 65, 9), &stone)],
            BlockPosition::new(10, 64, 10),
        )
        .unwrap();
        assert_eq!(lines, vec!["1~1~-1~Stone".to_string()]);
    }

    #[test]
    fn test_decode_line() {
        let records = decode(["1~1~-1~Stone"]).unwrap();
        assert_eq!(records, vec![BlockRecord::new((1, 1, -1), "Stone")]);
        assert_eq!(
            records[0].target(BlockPosition::new(10, 64, 10)).unwrap(),
            BlockPosition::new(11, 65, 9)
        );
    }

    #[test]
    fn test_decode_accepts_crlf() {
        let lf = decode(["0~0~0~Air", "2~-3~4~Wood"]).unwrap();
        let crlf = decode(["0~0~0~Air\r", "2~-3~4~Wood\r"]).unwrap();
        assert_eq!(lf, crlf);
    }

    #[test]
    fn test_encode_rejects_delimiter_in_type() {
        let bad = BlockType::new("Oak~Log");
        let result = encode([(BlockPosition::ORIGIN, &bad)], BlockPosition::ORIGIN);
        assert!(matches!(result, Err(SchematicError::InvalidTypeId(id)) if id == "Oak~Log"));
    }

    #[test]
    fn test_offsets_outside_i32_are_errors() {
        let records = decode(["2147483647~0~0~Stone"]).unwrap();
        assert!(matches!(
            records[0].target(BlockPosition::new(1, 64, 0)),
            Err(SchematicError::CoordinateOverflow { .. })
        ));
        assert_eq!(
            records[0].target(BlockPosition::new(-1, 64, 0)).unwrap(),
            BlockPosition::new(i32::MAX - 1, 64, 0)
        );

        let stone = BlockType::new("Stone");
        let result = encode(
            [(BlockPosition::new(i32::MIN, 0, 0), &stone)],
            BlockPosition::new(1, 0, 0),
        );
        assert!(matches!(result, Err(SchematicError::CoordinateOverflow { .. })));
    }

    #[test]
    fn test_decode_reports_line_number() {
        let cases = [
            vec!["0~0~0~Air", "1~2~Stone"],
            vec!["0~0~0~Air", "1~2~3~Stone~Extra"],
            vec!["0~0~0~Air", "x~2~3~Stone"],
            vec!["0~0~0~Air", "1~2~3~"],
            vec!["0~0~0~Air", ""],
        ];
        for lines in cases {
            match decode(&lines) {
                Err(SchematicError::MalformedLine { line_number, .. }) => {
                    assert_eq!(line_number, 2, "{:?}", lines)
                }
                other => panic!("expected MalformedLine for {:?}, got {:?}", lines, other),
            }
        }
    }

    #[test]
    fn test_round_trip_preserves_positions() {
        let wood = BlockType::new("Wood");
        let air = BlockType::air();
        let anchor = BlockPosition::new(-7, 70, 1_000_000);
        let blocks = vec![
            (BlockPosition::new(-8, 69, 999_999), &air),
            (BlockPosition::new(0, 0, 0), &wood),
            (BlockPosition::new(-7, 70, 1_000_000), &wood),
        ];

        let records = decode(encode(blocks.iter().cloned(), anchor).unwrap()).unwrap();
        let restored: Vec<_> = records
            .iter()
            .map(|r| (r.target(anchor).unwrap(), r.block.clone()))
            .collect();
        let expected: Vec<_> = blocks.into_iter().map(|(p, b)| (p, b.clone())).collect();
        assert_eq!(restored, expected);
    }
}
