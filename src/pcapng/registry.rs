//! Handlers for block types and options not natively supported
//!
//! The registry is filled before any capture is opened, then passed by reference to the
//! readers and writers. Registering a handler after [`Registry::finalize`] is refused.

use std::collections::HashMap;

use tracing::debug;

use crate::PcapError;

use super::*;

/// Block decoded by an extension handler
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtensionRecord {
    /// Block type
    pub block_type: u32,
    /// Block content, in the format chosen by the handler
    pub data: Vec<u8>,
}

/// Read and write callbacks for a block type
#[derive(Clone, Copy)]
pub struct BlockHandler {
    /// Decode the block body (without header and trailer). The second argument is true if the
    /// section is big-endian.
    pub read: fn(u32, &[u8], bool) -> Result<ExtensionRecord, PcapError<&'static [u8]>>,
    /// Encode the block body (without header, padding and trailer), little-endian
    pub write: Option<fn(&ExtensionRecord) -> Result<Vec<u8>, PcapError<&'static [u8]>>>,
}

/// Parse, size and write callbacks for an option code
#[derive(Clone, Copy)]
pub struct OptionHandler {
    /// Decode the option value. The second argument is true if the value is big-endian.
    pub parse: fn(&[u8], bool) -> Result<OptionValue, PcapError<&'static [u8]>>,
    /// Size of the encoded value, without padding. Zero means the option is not written.
    pub size: fn(&OptionValue) -> u32,
    /// Encode the value, little-endian, without padding
    pub write: fn(&OptionValue, &mut Vec<u8>),
}

/// Table of extension handlers
#[derive(Default)]
pub struct Registry {
    blocks: HashMap<u32, BlockHandler>,
    options: HashMap<(BlockKind, OptionCode), OptionHandler>,
    finalized: bool,
}

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    /// Block types that may be handled by an extension
    ///
    /// Only types reserved for extensions (IRIG timestamp, ARINC 429) and local types
    /// are accepted, built-in types cannot be overridden.
    pub fn is_extensible_block_type(block_type: u32) -> bool {
        block_type == IRIG_TS_MAGIC
            || block_type == ARINC_429_MAGIC
            || block_type & LOCAL_BLOCK_TYPE_MASK != 0
    }

    /// Register the handler for a block type
    pub fn register_block(
        &mut self,
        block_type: u32,
        handler: BlockHandler,
    ) -> Result<(), PcapError<&'static [u8]>> {
        self.check_open()?;
        if !Self::is_extensible_block_type(block_type) {
            return Err(PcapError::Unsupported(format!(
                "block type 0x{:08x} cannot be handled by an extension",
                block_type
            )));
        }
        debug!(block_type, "registered block handler");
        self.blocks.insert(block_type, handler);
        Ok(())
    }

    /// Register the handler for an option code of a block kind
    pub fn register_option(
        &mut self,
        kind: BlockKind,
        code: OptionCode,
        handler: OptionHandler,
    ) -> Result<(), PcapError<&'static [u8]>> {
        self.check_open()?;
        if kind.is_builtin_option(code) {
            return Err(PcapError::Unsupported(format!(
                "option {} of {:?} cannot be handled by an extension",
                code.0, kind
            )));
        }
        debug!(?kind, code = code.0, "registered option handler");
        self.options.insert((kind, code), handler);
        Ok(())
    }

    /// Freeze the registry. Later registrations fail.
    pub fn finalize(&mut self) {
        self.finalized = true;
    }

    #[inline]
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn block_handler(&self, block_type: u32) -> Option<&BlockHandler> {
        self.blocks.get(&block_type)
    }

    pub fn option_handler(&self, kind: BlockKind, code: OptionCode) -> Option<&OptionHandler> {
        self.options.get(&(kind, code))
    }

    fn check_open(&self) -> Result<(), PcapError<&'static [u8]>> {
        if self.finalized {
            Err(PcapError::Internal(
                "extension registry is finalized".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_raw(
        block_type: u32,
        data: &[u8],
        _big_endian: bool,
    ) -> Result<ExtensionRecord, PcapError<&'static [u8]>> {
        Ok(ExtensionRecord {
            block_type,
            data: data.to_vec(),
        })
    }

    fn parse_u8(value: &[u8], _big_endian: bool) -> Result<OptionValue, PcapError<&'static [u8]>> {
        Ok(OptionValue::U8(value.first().copied().unwrap_or_default()))
    }

    fn size_u8(_value: &OptionValue) -> u32 {
        1
    }

    fn write_u8(value: &OptionValue, out: &mut Vec<u8>) {
        out.push(value.as_u8().unwrap_or_default());
    }

    const U8_HANDLER: OptionHandler = OptionHandler {
        parse: parse_u8,
        size: size_u8,
        write: write_u8,
    };

    #[test]
    fn block_types_reserved_for_extensions() {
        let mut registry = Registry::new();
        let handler = BlockHandler {
            read: read_raw,
            write: None,
        };
        assert!(registry.register_block(IRIG_TS_MAGIC, handler).is_ok());
        assert!(registry.register_block(0x8000_1234, handler).is_ok());
        assert!(matches!(
            registry.register_block(EPB_MAGIC, handler),
            Err(PcapError::Unsupported(_))
        ));
        assert!(registry.block_handler(0x8000_1234).is_some());
        assert!(registry.block_handler(ARINC_429_MAGIC).is_none());
    }

    #[test]
    fn builtin_options_are_refused() {
        let mut registry = Registry::new();
        assert!(registry
            .register_option(BlockKind::Packet, OptionCode::EpbFlags, U8_HANDLER)
            .is_err());
        assert!(registry
            .register_option(BlockKind::Packet, OptionCode(32), U8_HANDLER)
            .is_ok());
    }

    #[test]
    fn no_registration_after_finalize() {
        let mut registry = Registry::new();
        registry.finalize();
        assert!(registry.is_finalized());
        assert!(matches!(
            registry.register_option(BlockKind::SectionHeader, OptionCode(40), U8_HANDLER),
            Err(PcapError::Internal(_))
        ));
    }

    #[test]
    fn option_handler_used_by_decoder() {
        let mut registry = Registry::new();
        registry
            .register_option(BlockKind::InterfaceStatistics, OptionCode(42), U8_HANDLER)
            .expect("register");
        registry.finalize();
        let ctx = OptionContext::new(BlockKind::InterfaceStatistics, false, &registry);
        let raw = vec![PcapNGOption::new_owned(OptionCode(42), vec![7])];
        let options = decode_options(&raw, &ctx).expect("decode");
        assert_eq!(options.get_u8(OptionCode(42)), Some(7));
    }
}
