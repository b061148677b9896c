use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::{RecordError, RecordResult};
use crate::file::SlotId;

/// Block index within the block store
pub type BlockId = usize;

/// Physical location of a record (block + slot)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordLocation {
    pub block_id: BlockId,
    pub slot_id: SlotId,
}

impl RecordLocation {
    pub fn new(block_id: BlockId, slot_id: SlotId) -> Self {
        Self { block_id, slot_id }
    }
}

impl fmt::Display for RecordLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.block_id, self.slot_id)
    }
}

/// One home-team game line
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub game_date_est: String,
    pub team_id_home: i32,
    pub pts_home: i32,
    pub fg_pct_home: f32,
    pub ft_pct_home: f32,
    pub fg3_pct_home: f32,
    pub ast_home: i32,
    pub reb_home: i32,
    pub home_team_wins: bool,
}

impl GameRecord {
    /// Serialized size in bytes
    pub const SIZE: usize = 44;

    /// Maximum date length; the date field is one byte wider to keep a NUL terminator
    pub const DATE_LEN: usize = 10;

    const DATE_FIELD: usize = Self::DATE_LEN + 1;

    /// The indexed key
    pub fn key(&self) -> f32 {
        self.fg_pct_home
    }

    /// Serialize to the fixed little-endian layout
    ///
    /// Format: [date: 11][reserved: 1][team_id][pts][fg_pct][ft_pct][fg3_pct][ast][reb][wins]
    pub fn serialize(&self) -> RecordResult<[u8; Self::SIZE]> {
        let date = self.game_date_est.as_bytes();
        if date.len() > Self::DATE_LEN {
            return Err(RecordError::InvalidRecord(format!(
                "date '{}' longer than {} bytes",
                self.game_date_est,
                Self::DATE_LEN
            )));
        }

        let mut buf = [0u8; Self::SIZE];
        buf[..date.len()].copy_from_slice(date);

        let mut offset = Self::DATE_FIELD + 1;
        for word in [
            self.team_id_home.to_le_bytes(),
            self.pts_home.to_le_bytes(),
            self.fg_pct_home.to_le_bytes(),
            self.ft_pct_home.to_le_bytes(),
            self.fg3_pct_home.to_le_bytes(),
            self.ast_home.to_le_bytes(),
            self.reb_home.to_le_bytes(),
            (self.home_team_wins as u32).to_le_bytes(),
        ] {
            buf[offset..offset + 4].copy_from_slice(&word);
            offset += 4;
        }

        Ok(buf)
    }

    /// Deserialize from exactly `SIZE` bytes
    pub fn deserialize(data: &[u8]) -> RecordResult<Self> {
        if data.len() != Self::SIZE {
            return Err(RecordError::Deserialization(format!(
                "Expected {} bytes, got {}",
                Self::SIZE,
                data.len()
            )));
        }

        let date_bytes = &data[..Self::DATE_FIELD];
        let date_end = date_bytes
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(Self::DATE_FIELD);
        let game_date_est = std::str::from_utf8(&date_bytes[..date_end])
            .map_err(|e| RecordError::Deserialization(format!("date is not UTF-8: {}", e)))?
            .to_string();

        let word = |i: usize| -> [u8; 4] {
            let start = Self::DATE_FIELD + 1 + i * 4;
            [data[start], data[start + 1], data[start + 2], data[start + 3]]
        };

        let home_team_wins = match u32::from_le_bytes(word(7)) {
            0 => false,
            1 => true,
            other => {
                return Err(RecordError::Deserialization(format!(
                    "home_team_wins must be 0 or 1, got {}",
                    other
                )));
            }
        };

        Ok(Self {
            game_date_est,
            team_id_home: i32::from_le_bytes(word(0)),
            pts_home: i32::from_le_bytes(word(1)),
            fg_pct_home: f32::from_le_bytes(word(2)),
            ft_pct_home: f32::from_le_bytes(word(3)),
            fg3_pct_home: f32::from_le_bytes(word(4)),
            ast_home: i32::from_le_bytes(word(5)),
            reb_home: i32::from_le_bytes(word(6)),
            home_team_wins,
        })
    }
}

impl fmt::Display for GameRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "GAME_DATE_EST: {}", self.game_date_est)?;
        writeln!(f, "TEAM_ID_home: {}", self.team_id_home)?;
        writeln!(f, "PTS_home: {}", self.pts_home)?;
        writeln!(f, "FG_PCT_home: {:.2}", self.fg_pct_home)?;
        writeln!(f, "FT_PCT_home: {:.2}", self.ft_pct_home)?;
        writeln!(f, "FG3_PCT_home: {:.2}", self.fg3_pct_home)?;
        writeln!(f, "AST_home: {}", self.ast_home)?;
        writeln!(f, "REB_home: {}", self.reb_home)?;
        write!(f, "HOME_TEAM_WINS: {}", self.home_team_wins as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> GameRecord {
        GameRecord {
            game_date_est: "22/12/2022".to_string(),
            team_id_home: 1610612740,
            pts_home: 126,
            fg_pct_home: 0.484,
            ft_pct_home: 0.926,
            fg3_pct_home: 0.382,
            ast_home: 25,
            reb_home: 46,
            home_team_wins: true,
        }
    }

    #[test]
    fn test_record_serialization() {
        let record = sample();
        let bytes = record.serialize().unwrap();
        assert_eq!(bytes.len(), GameRecord::SIZE);

        // Date is NUL padded, reserved byte is zero
        assert_eq!(&bytes[..10], b"22/12/2022");
        assert_eq!(bytes[10], 0);
        assert_eq!(bytes[11], 0);
        assert_eq!(&bytes[12..16], &1610612740i32.to_le_bytes());
        assert_eq!(&bytes[40..44], &1u32.to_le_bytes());

        let restored = GameRecord::deserialize(&bytes).unwrap();
        assert_eq!(record, restored);
    }

    #[test]
    fn test_short_date() {
        let record = GameRecord {
            game_date_est: "1/1/2020".to_string(),
            ..sample()
        };
        let bytes = record.serialize().unwrap();
        let restored = GameRecord::deserialize(&bytes).unwrap();
        assert_eq!(restored.game_date_est, "1/1/2020");
    }

    #[test]
    fn test_zero_bytes_decode_to_default() {
        let restored = GameRecord::deserialize(&[0u8; GameRecord::SIZE]).unwrap();
        assert_eq!(restored, GameRecord::default());
    }

    #[test]
    fn test_date_too_long() {
        let record = GameRecord {
            game_date_est: "2022-12-22T00".to_string(),
            ..sample()
        };
        assert!(matches!(
            record.serialize(),
            Err(RecordError::InvalidRecord(_))
        ));
    }

    #[test]
    fn test_wrong_length_rejected() {
        let result = GameRecord::deserialize(&[0u8; GameRecord::SIZE - 1]);
        assert!(matches!(result, Err(RecordError::Deserialization(_))));
    }

    #[test]
    fn test_invalid_wins_flag_rejected() {
        let mut bytes = sample().serialize().unwrap();
        bytes[40] = 7;
        let result = GameRecord::deserialize(&bytes);
        assert!(matches!(result, Err(RecordError::Deserialization(_))));
    }
}
