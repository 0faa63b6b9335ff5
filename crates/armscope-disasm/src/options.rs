//! Stream configuration.

/// How value immediates are written.
///
/// Bit positions, widths, shift amounts and other counts are always decimal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ImmediateFormat {
    /// `#0x10`, `#-0x10`
    #[default]
    Hex,
    /// `#16`, `#-16`
    Decimal,
}

impl From<bool> for ImmediateFormat {
    /// `true` selects decimal.
    fn from(decimal: bool) -> Self {
        if decimal {
            Self::Decimal
        } else {
            Self::Hex
        }
    }
}

/// Options for [`disassemble`](crate::disassemble).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Options {
    /// Address of the first word. 0 leaves every address at 0.
    pub base_address: u64,
    pub immediate_format: ImmediateFormat,
}

impl Options {
    pub fn new(base_address: u64, immediate_format: ImmediateFormat) -> Self {
        Self {
            base_address,
            immediate_format,
        }
    }

    pub fn with_base_address(mut self, base_address: u64) -> Self {
        self.base_address = base_address;
        self
    }

    pub fn with_immediate_format(mut self, immediate_format: ImmediateFormat) -> Self {
        self.immediate_format = immediate_format;
        self
    }

    /// Address of the word `offset` bytes past the start of the stream.
    pub fn address_for(&self, offset: u64) -> u64 {
        address_for(self.base_address, offset)
    }
}

pub(crate) fn address_for(base_address: u64, offset: u64) -> u64 {
    if base_address == 0 {
        0
    } else {
        base_address.wrapping_add(offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = Options::default();
        assert_eq!(options.base_address, 0);
        assert_eq!(options.immediate_format, ImmediateFormat::Hex);
    }

    #[test]
    fn test_from_bool() {
        assert_eq!(ImmediateFormat::from(true), ImmediateFormat::Decimal);
        assert_eq!(ImmediateFormat::from(false), ImmediateFormat::Hex);
    }

    #[test]
    fn test_address_offsetting() {
        assert_eq!(Options::default().address_for(0x40), 0);
        let options = Options::default().with_base_address(0x1000);
        assert_eq!(options.address_for(0), 0x1000);
        assert_eq!(options.address_for(8), 0x1008);
        let wrapping = Options::new(u64::MAX - 3, ImmediateFormat::Decimal);
        assert_eq!(wrapping.address_for(4), 0);
    }
}
