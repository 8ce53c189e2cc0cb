use crate::encoding::{
    primitives::{decode_ctx_unsigned, encode_ctx_unsigned},
    reader::Reader,
    writer::Writer,
};
use crate::{DecodeError, EncodeError};

pub const SERVICE_WHO_IS: u8 = 0x08;

/// Who-Is parameters: either global (no parameters) or a closed
/// instance range `[low, high]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WhoIsRequest {
    pub range: Option<(u32, u32)>,
}

impl WhoIsRequest {
    /// A Who-Is addressed to every device.
    pub const fn global() -> Self {
        Self { range: None }
    }

    /// A Who-Is limited to instances in `low..=high`.
    ///
    /// # Panics
    ///
    /// Panics when `low > high`; an inverted range is a caller bug, not
    /// a runtime condition.
    pub fn ranged(low: u32, high: u32) -> Self {
        assert!(low <= high, "who-is range is inverted: {low} > {high}");
        Self {
            range: Some((low, high)),
        }
    }

    /// Whether a device with `instance` must answer this Who-Is.
    pub fn matches(&self, instance: u32) -> bool {
        match self.range {
            None => true,
            Some((low, high)) => (low..=high).contains(&instance),
        }
    }

    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        if let Some((low, high)) = self.range {
            encode_ctx_unsigned(w, 0, low)?;
            encode_ctx_unsigned(w, 1, high)?;
        }
        Ok(())
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        if r.is_empty() {
            return Ok(Self::global());
        }
        let low = decode_ctx_unsigned(r, 0)?;
        let high = decode_ctx_unsigned(r, 1)?;
        Ok(Self {
            range: Some((low, high)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::WhoIsRequest;
    use crate::encoding::{reader::Reader, writer::Writer};

    #[test]
    fn global_who_is_has_no_parameters() {
        let mut buf = [0u8; 4];
        let mut w = Writer::new(&mut buf);
        WhoIsRequest::global().encode(&mut w).unwrap();
        assert!(w.as_written().is_empty());
    }

    #[test]
    fn ranged_parameters_match_fixture() {
        let mut buf = [0u8; 8];
        let mut w = Writer::new(&mut buf);
        WhoIsRequest::ranged(100, 200).encode(&mut w).unwrap();
        assert_eq!(w.as_written(), &[0x09, 0x64, 0x19, 0xC8]);

        let decoded = WhoIsRequest::decode(&mut Reader::new(w.as_written())).unwrap();
        assert_eq!(decoded.range, Some((100, 200)));
    }

    #[test]
    fn matching_is_inclusive_and_handles_degenerate_ranges() {
        let ranged = WhoIsRequest::ranged(100, 200);
        assert!(ranged.matches(100));
        assert!(ranged.matches(200));
        assert!(!ranged.matches(201));

        let point = WhoIsRequest::ranged(7, 7);
        assert!(point.matches(7));
        assert!(!point.matches(8));

        assert!(WhoIsRequest::global().matches(u32::MAX));
    }

    #[test]
    #[should_panic(expected = "inverted")]
    fn inverted_range_panics() {
        let _ = WhoIsRequest::ranged(10, 9);
    }
}
