use nom::bytes::streaming::take;
use nom::{Err, IResult};
use rusticata_macros::{align32, newtype_enum};

use crate::endianness::{PcapBE, PcapEndianness, PcapLE};
use crate::{opt_parse_options, PcapError, PcapNGOption, DSB_MAGIC};

use super::*;

#[derive(Clone, Copy, Eq, PartialEq)]
pub struct SecretsType(pub u32);

newtype_enum! {
    impl debug SecretsType {
        TlsKeyLog = 0x544c_534b, // TLSK
        WireguardKeyLog = 0x5747_4b4c,
    }
}

#[derive(Debug)]
pub struct DecryptionSecretsBlock<'a> {
    pub block_type: u32,
    pub block_len1: u32,
    pub secrets_type: SecretsType,
    pub secrets_len: u32,
    /// Secrets, with padding
    pub data: &'a [u8],
    pub options: Vec<PcapNGOption<'a>>,
    pub block_len2: u32,
}

impl<'a> DecryptionSecretsBlock<'a> {
    /// Secrets, without padding
    pub fn secrets(&self) -> &[u8] {
        let len = self.secrets_len as usize;
        if len < self.data.len() {
            &self.data[..len]
        } else {
            self.data
        }
    }
}

impl<'a, En: PcapEndianness> PcapNGBlockParser<'a, En, DecryptionSecretsBlock<'a>>
    for DecryptionSecretsBlock<'a>
{
    const HDR_SZ: usize = MIN_DSB_SIZE as usize;
    const MAGIC: u32 = DSB_MAGIC;

    fn inner_parse(
        block_type: u32,
        block_len1: u32,
        i: &'a [u8],
        block_len2: u32,
    ) -> IResult<&'a [u8], DecryptionSecretsBlock<'a>, PcapError<&'a [u8]>> {
        // caller function already tested header type(magic) and length
        // read end of header
        let (i, secrets_type) = En::parse_u32(i)?;
        let (i, secrets_len) = En::parse_u32(i)?;
        if secrets_len > MAX_SECRETS_SIZE {
            return Err(Err::Error(PcapError::BadFile(format!(
                "DSB: secrets length {} is larger than the maximum {}",
                secrets_len, MAX_SECRETS_SIZE
            ))));
        }
        let padded_length = align32!(secrets_len);
        let (i, data) = take(padded_length)(i)?;
        // read options
        let (i, options) = opt_parse_options::<En>(i)?;
        let block = DecryptionSecretsBlock {
            block_type,
            block_len1,
            secrets_type: SecretsType(secrets_type),
            secrets_len,
            data,
            options,
            block_len2,
        };
        Ok((i, block))
    }
}

/// Parse a DecryptionSecrets Block (little-endian)
#[inline]
pub fn parse_decryptionsecretsblock_le(
    i: &[u8],
) -> IResult<&[u8], DecryptionSecretsBlock, PcapError<&[u8]>> {
    ng_block_parser::<DecryptionSecretsBlock, PcapLE, _>()(i)
}

/// Parse a DecryptionSecrets Block (big-endian)
#[inline]
pub fn parse_decryptionsecretsblock_be(
    i: &[u8],
) -> IResult<&[u8], DecryptionSecretsBlock, PcapError<&[u8]>> {
    ng_block_parser::<DecryptionSecretsBlock, PcapBE, _>()(i)
}

/// Decryption secrets, as kept by the capture reader
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecryptionSecrets {
    pub secrets_type: SecretsType,
    pub data: Vec<u8>,
}

impl<'a> From<&DecryptionSecretsBlock<'a>> for DecryptionSecrets {
    fn from(dsb: &DecryptionSecretsBlock<'a>) -> Self {
        DecryptionSecrets {
            secrets_type: dsb.secrets_type,
            data: dsb.secrets().to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    #[test]
    fn dsb_tls_keylog() {
        const DSB: &[u8] = &hex!(
            "
0A 00 00 00 20 00 00 00 4B 53 4C 54 05 00 00 00
6B 65 79 73 0A 00 00 00 00 00 00 00 20 00 00 00"
        );
        let (rem, dsb) = parse_decryptionsecretsblock_le(DSB).expect("could not parse DSB");
        assert!(rem.is_empty());
        let secrets = DecryptionSecrets::from(&dsb);
        assert_eq!(secrets.secrets_type, SecretsType::TlsKeyLog);
        assert_eq!(secrets.data, b"keys\n");
    }

    #[test]
    fn dsb_secrets_too_large() {
        const DSB: &[u8] = &hex!(
            "
0A 00 00 00 18 00 00 00 4B 53 4C 54 01 00 00 40
00 00 00 00 18 00 00 00"
        );
        let res = parse_decryptionsecretsblock_le(DSB);
        assert!(matches!(res, Err(Err::Error(PcapError::BadFile(_)))));
    }
}
