use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, ReadRangeExt, Write};

use super::{
    read_string, string_encode_size, write_string, CONFIDENCE_SCALE_BPS, MAX_ITEM_NAME_LENGTH,
    MAX_SCAN_HISTORY,
};

/// Classification tag recorded per scan.
///
/// A single variant today; encoded as a tagged enum so new material classes
/// can be added without a storage migration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ScanCategory {
    #[default]
    Recyclable,
}

impl ScanCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Recyclable => "Recyclable",
        }
    }
}

impl Write for ScanCategory {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::Recyclable => 0u8.write(writer),
        }
    }
}

impl Read for ScanCategory {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        match u8::read(reader)? {
            0 => Ok(Self::Recyclable),
            i => Err(Error::InvalidEnum(i)),
        }
    }
}

impl EncodeSize for ScanCategory {
    fn encode_size(&self) -> usize {
        u8::SIZE
    }
}

/// One ranked classifier guess.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Guess {
    pub label: String,
    /// Confidence in basis points (0..=10_000).
    pub confidence_bps: u16,
}

/// Ranked classifier output for one captured frame.
///
/// Guesses are ordered best-first; a successful classification always has at
/// least one guess.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Classification {
    pub guesses: Vec<Guess>,
}

impl Classification {
    pub fn new(guesses: Vec<Guess>) -> Self {
        Self { guesses }
    }

    /// The top-ranked guess, if any.
    pub fn top(&self) -> Option<&Guess> {
        self.guesses.first()
    }

    pub fn is_empty(&self) -> bool {
        self.guesses.is_empty()
    }
}

/// Convert a [0, 1] probability to basis points, clamped to the scale.
pub fn confidence_to_bps(confidence: f32) -> u16 {
    let scaled = (confidence.clamp(0.0, 1.0) * CONFIDENCE_SCALE_BPS as f32).round();
    (scaled as u32).min(CONFIDENCE_SCALE_BPS as u32) as u16
}

/// Immutable record of one confirmed scan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScanRecord {
    /// Monotonic per-account sequence number.
    pub id: u64,
    /// Top classifier label at confirmation time.
    pub item_name: String,
    pub category: ScanCategory,
    /// Top-label confidence in basis points.
    pub confidence_bps: u16,
    /// Server-assigned, strictly monotonic per account. Ordering/display
    /// only, not a global clock.
    pub timestamp_ms: u64,
    /// Points credited for this record, kept per-record for auditability.
    pub points_awarded: u64,
}

impl Write for ScanRecord {
    fn write(&self, writer: &mut impl BufMut) {
        self.id.write(writer);
        write_string(&self.item_name, writer);
        self.category.write(writer);
        self.confidence_bps.write(writer);
        self.timestamp_ms.write(writer);
        self.points_awarded.write(writer);
    }
}

impl Read for ScanRecord {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            id: u64::read(reader)?,
            item_name: read_string(reader, MAX_ITEM_NAME_LENGTH)?,
            category: ScanCategory::read(reader)?,
            confidence_bps: u16::read(reader)?,
            timestamp_ms: u64::read(reader)?,
            points_awarded: u64::read(reader)?,
        })
    }
}

impl EncodeSize for ScanRecord {
    fn encode_size(&self) -> usize {
        self.id.encode_size()
            + string_encode_size(&self.item_name)
            + self.category.encode_size()
            + self.confidence_bps.encode_size()
            + self.timestamp_ms.encode_size()
            + self.points_awarded.encode_size()
    }
}

/// Append-only scan history for one account.
///
/// Records are created exactly once and never updated or deleted; the log
/// owns id assignment and the per-account timestamp watermark.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct ScanLog {
    pub next_id: u64,
    pub last_timestamp_ms: u64,
    pub records: Vec<ScanRecord>,
}

impl ScanLog {
    /// Append a new record, assigning its id and a timestamp that is
    /// strictly greater than every prior record's (`max(now, last + 1)`).
    pub fn append(
        &mut self,
        item_name: String,
        category: ScanCategory,
        confidence_bps: u16,
        points_awarded: u64,
        now_ms: u64,
    ) -> ScanRecord {
        let timestamp_ms = now_ms.max(self.last_timestamp_ms.saturating_add(1));
        let record = ScanRecord {
            id: self.next_id,
            item_name,
            category,
            confidence_bps,
            timestamp_ms,
            points_awarded,
        };
        self.next_id = self.next_id.saturating_add(1);
        self.last_timestamp_ms = timestamp_ms;
        self.records.push(record.clone());
        record
    }

    /// The most recent `limit` records, timestamp descending. Ties (which
    /// cannot occur for records stamped by `append`) preserve insertion
    /// order. An empty log yields an empty vec.
    pub fn recent(&self, limit: usize) -> Vec<ScanRecord> {
        let mut records = self.records.clone();
        records.sort_by(|a, b| b.timestamp_ms.cmp(&a.timestamp_ms));
        records.truncate(limit);
        records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Write for ScanLog {
    fn write(&self, writer: &mut impl BufMut) {
        self.next_id.write(writer);
        self.last_timestamp_ms.write(writer);
        self.records.write(writer);
    }
}

impl Read for ScanLog {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            next_id: u64::read(reader)?,
            last_timestamp_ms: u64::read(reader)?,
            records: Vec::<ScanRecord>::read_range(reader, 0..=MAX_SCAN_HISTORY)?,
        })
    }
}

impl EncodeSize for ScanLog {
    fn encode_size(&self) -> usize {
        self.next_id.encode_size()
            + self.last_timestamp_ms.encode_size()
            + self.records.encode_size()
    }
}
